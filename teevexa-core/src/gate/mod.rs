//! Access gate
//!
//! Decides whether a protected area may be rendered for the current session.
//!
//! The decision itself ([`decide`]) is a pure function of the session, the
//! resolved role and the area. [`AccessGate`] wraps it in a per-mount task that
//! listens to session changes and role lookups and publishes a [`GateState`].
//!
//! # State machine
//!
//! ```text
//! Initializing ──► Unauthenticated            (terminal, redirect to login)
//!              ├─► AuthenticatedClientOk      (render portal)
//!              ├─► AuthenticatedStaffOk       (render admin)
//!              └─► AuthenticatedStaffDenied   (terminal, redirect to portal)
//! ```

mod runner;

pub use runner::{AccessGate, GateHandle};

use crate::roles::{Role, RoleResolution};
use crate::session::{Identity, Session};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which protected area is being entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    /// Client portal: any authenticated identity
    Client,
    /// Staff back-office: staff roles only
    Staff,
}

impl fmt::Display for AreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaKind::Client => f.write_str("client"),
            AreaKind::Staff => f.write_str("staff"),
        }
    }
}

impl FromStr for AreaKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" | "portal" => Ok(AreaKind::Client),
            "staff" | "admin" => Ok(AreaKind::Staff),
            other => Err(crate::Error::Config(format!("unknown area '{}'", other))),
        }
    }
}

/// Outcome of a single gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Render the client portal
    RenderPortal,
    /// Render the staff area for this role
    RenderAdmin(Role),
    /// No session: go to the sign-in page
    RedirectToLogin,
    /// Session without a staff role: go to the client portal
    RedirectToPortal,
}

impl AccessDecision {
    /// Whether rendering is permitted
    pub fn is_permit(&self) -> bool {
        matches!(self, AccessDecision::RenderPortal | AccessDecision::RenderAdmin(_))
    }

    /// Where to send the user, if anywhere
    pub fn redirect_path<'a>(&self, paths: &'a GatePaths) -> Option<&'a str> {
        match self {
            AccessDecision::RedirectToLogin => Some(&paths.login),
            AccessDecision::RedirectToPortal => Some(&paths.portal),
            _ => None,
        }
    }
}

/// Decide access for one evaluation
///
/// - no session: sign-in page, whatever the role or area
/// - client area: render once a session exists, the role is not consulted
/// - staff area: render for staff roles, otherwise the client portal
pub fn decide(session: Option<&Session>, role: &RoleResolution, area: AreaKind) -> AccessDecision {
    if session.is_none() {
        return AccessDecision::RedirectToLogin;
    }

    match area {
        AreaKind::Client => AccessDecision::RenderPortal,
        AreaKind::Staff => match role {
            RoleResolution::Assigned(role) if role.is_staff() => AccessDecision::RenderAdmin(*role),
            _ => AccessDecision::RedirectToPortal,
        },
    }
}

/// Why a session was kept out of the staff area
///
/// All three produce the same redirect; the tag exists so logs can tell a
/// legitimate client from a missing row or an unreachable directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DenialReason {
    /// The directory has no row for this identity
    NoRoleRow,
    /// The identity is a client
    ClientTier,
    /// The lookup failed
    LookupFailed(String),
}

impl DenialReason {
    /// Denial reason for a resolution that does not grant staff access
    pub fn for_resolution(resolution: &RoleResolution) -> Option<Self> {
        match resolution {
            RoleResolution::Assigned(role) if role.is_staff() => None,
            RoleResolution::Assigned(_) => Some(DenialReason::ClientTier),
            RoleResolution::Missing => Some(DenialReason::NoRoleRow),
            RoleResolution::Failed(e) => Some(DenialReason::LookupFailed(e.to_string())),
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NoRoleRow => f.write_str("no role row"),
            DenialReason::ClientTier => f.write_str("client tier"),
            DenialReason::LookupFailed(e) => write!(f, "lookup failed: {}", e),
        }
    }
}

/// Per-mount gate state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// Nothing resolved yet; render a loading indicator, never redirect
    Initializing,
    /// No session
    Unauthenticated,
    /// Session present, client area
    AuthenticatedClientOk { identity: Identity },
    /// Session present with a staff role, staff area
    AuthenticatedStaffOk { identity: Identity, role: Role },
    /// Session present without a staff role, staff area
    AuthenticatedStaffDenied { identity: Identity, reason: DenialReason },
}

impl GateState {
    /// Evaluate the gate and build the resulting state
    pub fn evaluate(session: Option<&Session>, role: &RoleResolution, area: AreaKind) -> Self {
        let decision = decide(session, role, area);
        let Some(session) = session else {
            return GateState::Unauthenticated;
        };
        let identity = session.identity.clone();

        match decision {
            AccessDecision::RenderPortal => GateState::AuthenticatedClientOk { identity },
            AccessDecision::RenderAdmin(role) => GateState::AuthenticatedStaffOk { identity, role },
            AccessDecision::RedirectToPortal => {
                let reason = DenialReason::for_resolution(role).unwrap_or(DenialReason::ClientTier);
                match reason {
                    DenialReason::ClientTier => {
                        log::info!("Staff area denied for {}: {}", identity.user_id, reason)
                    }
                    DenialReason::NoRoleRow => {
                        log::warn!("Staff area denied for {}: {}", identity.user_id, reason)
                    }
                    DenialReason::LookupFailed(_) => {
                        log::error!("Staff area denied for {}: {}", identity.user_id, reason)
                    }
                }
                GateState::AuthenticatedStaffDenied { identity, reason }
            }
            AccessDecision::RedirectToLogin => GateState::Unauthenticated,
        }
    }

    /// Whether the mount is over once this state is reached
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Unauthenticated | GateState::AuthenticatedStaffDenied { .. })
    }

    /// Whether the gate is still waiting for its first answer
    pub fn is_initializing(&self) -> bool {
        matches!(self, GateState::Initializing)
    }

    /// Where to send the user, if anywhere
    pub fn redirect_path<'a>(&self, paths: &'a GatePaths) -> Option<&'a str> {
        match self {
            GateState::Unauthenticated => Some(&paths.login),
            GateState::AuthenticatedStaffDenied { .. } => Some(&paths.portal),
            _ => None,
        }
    }

    /// Identity behind the state, if a session exists
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            GateState::AuthenticatedClientOk { identity }
            | GateState::AuthenticatedStaffOk { identity, .. }
            | GateState::AuthenticatedStaffDenied { identity, .. } => Some(identity),
            GateState::Initializing | GateState::Unauthenticated => None,
        }
    }

    /// Staff role granted by the state
    pub fn role(&self) -> Option<Role> {
        match self {
            GateState::AuthenticatedStaffOk { role, .. } => Some(*role),
            _ => None,
        }
    }
}

/// Paths the gate redirects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePaths {
    /// Sign-in page
    pub login: String,
    /// Client portal root
    pub portal: String,
    /// Staff area root
    pub admin: String,
    /// Public home page (target after sign-out)
    pub home: String,
}

impl GatePaths {
    fn under_login(&self, leaf: &str) -> String {
        format!("{}/{}", self.login.trim_end_matches('/'), leaf)
    }

    /// Form target of the sign-in page
    pub fn sign_in_action(&self) -> String {
        self.under_login("login")
    }

    /// Form target of the sign-out button
    pub fn sign_out_action(&self) -> String {
        self.under_login("logout")
    }

    /// Form target for creating an account
    pub fn sign_up_action(&self) -> String {
        self.under_login("signup")
    }

    /// Page (and form target) asking for a reset e-mail
    pub fn forgot_password(&self) -> String {
        self.under_login("forgot-password")
    }

    /// Page (and form target) setting a new password; reset links land here
    pub fn reset_password(&self) -> String {
        self.under_login("reset-password")
    }
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            login: "/auth".to_string(),
            portal: "/client-portal".to_string(),
            admin: "/admin".to_string(),
            home: "/".to_string(),
        }
    }
}
