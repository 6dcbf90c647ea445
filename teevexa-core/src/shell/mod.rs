//! Layout shells
//!
//! A shell turns the gate's state into what the user sees: a loading
//! indicator, a redirect, or the layout (brand, navigation, outlet).
//!
//! ```no_run
//! use std::sync::Arc;
//! use teevexa_core::roles::MemoryRoleDirectory;
//! use teevexa_core::session::{MemoryAuthBackend, SessionContext};
//! use teevexa_core::shell::{Shell, ShellOutcome};
//!
//! # async fn example() {
//! let context = Arc::new(SessionContext::new(Arc::new(MemoryAuthBackend::new())));
//! let directory = Arc::new(MemoryRoleDirectory::new());
//!
//! let shell = Shell::admin();
//! let mut gate = shell.mount(context, directory);
//! match shell.outcome(&gate.settled().await, "/admin/leads") {
//!     ShellOutcome::Render(view) => println!("{}", view.to_html()),
//!     ShellOutcome::Redirect(path) => println!("-> {}", path),
//!     ShellOutcome::Loading => {}
//! }
//! # }
//! ```

mod render;

pub use render::{escape_html, loading_html};

use crate::gate::{AccessGate, AreaKind, GateHandle, GatePaths, GateState};
use crate::nav::{self, NavItem, NavSection};
use crate::roles::{Role, RoleDirectory};
use crate::session::SessionContext;
use serde::Serialize;
use std::sync::Arc;

/// Which layout a shell draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    Portal,
    Admin,
}

impl ShellKind {
    pub fn brand(&self) -> &'static str {
        match self {
            ShellKind::Portal => "TEEVEXA",
            ShellKind::Admin => "TEEVEXA ADMIN",
        }
    }

    pub fn area(&self) -> AreaKind {
        match self {
            ShellKind::Portal => AreaKind::Client,
            ShellKind::Admin => AreaKind::Staff,
        }
    }
}

/// What the shell shows for a gate state
#[derive(Debug, Clone, PartialEq)]
pub enum ShellOutcome {
    /// Gate still resolving
    Loading,
    /// Navigate away
    Redirect(String),
    /// Draw the layout
    Render(ShellView),
}

impl ShellOutcome {
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            ShellOutcome::Redirect(path) => Some(path),
            _ => None,
        }
    }
}

/// Navigation as drawn by a shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", content = "entries", rename_all = "snake_case")]
pub enum Navigation {
    /// Portal: one list
    Flat(Vec<NavItem>),
    /// Admin: labelled sections
    Sectioned(Vec<NavSection>),
}

impl Navigation {
    /// Section labels (the portal has none)
    pub fn section_labels(&self) -> Vec<&'static str> {
        match self {
            Navigation::Flat(_) => Vec::new(),
            Navigation::Sectioned(sections) => sections.iter().map(|s| s.label).collect(),
        }
    }

    /// The item matching the current path
    pub fn active(&self) -> Option<&NavItem> {
        match self {
            Navigation::Flat(items) => items.iter().find(|i| i.active),
            Navigation::Sectioned(sections) => {
                sections.iter().flat_map(|s| s.items.iter()).find(|i| i.active)
            }
        }
    }
}

/// Rendered layout of a permitted shell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellView {
    pub kind: ShellKind,
    pub brand: &'static str,
    pub email: Option<String>,
    /// Staff role the view was rendered for
    pub role: Option<Role>,
    pub navigation: Navigation,
    /// Path of the nested view hosted by the shell
    pub outlet: String,
    /// Form target of the sign-out button
    pub sign_out_action: String,
}

impl ShellView {
    /// Minimal HTML skeleton of the layout
    pub fn to_html(&self) -> String {
        render::shell_html(self)
    }
}

/// Portal or admin shell
#[derive(Debug, Clone)]
pub struct Shell {
    kind: ShellKind,
    paths: GatePaths,
}

impl Shell {
    pub fn portal() -> Self {
        Self { kind: ShellKind::Portal, paths: GatePaths::default() }
    }

    pub fn admin() -> Self {
        Self { kind: ShellKind::Admin, paths: GatePaths::default() }
    }

    /// Use configured redirect paths
    pub fn with_paths(mut self, paths: GatePaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    pub fn area(&self) -> AreaKind {
        self.kind.area()
    }

    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    /// Mount the gate guarding this shell
    pub fn mount(&self, context: Arc<SessionContext>, directory: Arc<dyn RoleDirectory>) -> GateHandle {
        AccessGate::new(context, directory, self.area()).mount()
    }

    /// Decide what to show for a gate state at `current_path`
    pub fn outcome(&self, state: &GateState, current_path: &str) -> ShellOutcome {
        if let Some(path) = state.redirect_path(&self.paths) {
            return ShellOutcome::Redirect(path.to_string());
        }

        let (identity, role) = match (self.kind, state) {
            (_, GateState::Initializing) => return ShellOutcome::Loading,
            (ShellKind::Admin, GateState::AuthenticatedStaffOk { identity, role }) => (identity, Some(*role)),
            // A client-area state never carries a role check.
            (ShellKind::Admin, _) => return ShellOutcome::Redirect(self.paths.portal.clone()),
            (ShellKind::Portal, state) => match state.identity() {
                Some(identity) => (identity, None),
                None => return ShellOutcome::Redirect(self.paths.login.clone()),
            },
        };

        let navigation = match self.kind {
            ShellKind::Portal => {
                let mut items = nav::portal_items();
                nav::mark_active(&mut items, current_path);
                Navigation::Flat(items)
            }
            ShellKind::Admin => {
                let mut sections = nav::filter_sections(&nav::admin_sections(), role);
                nav::mark_active_sections(&mut sections, current_path);
                Navigation::Sectioned(sections)
            }
        };

        ShellOutcome::Render(ShellView {
            kind: self.kind,
            brand: self.kind.brand(),
            email: identity.email.clone(),
            role,
            navigation,
            outlet: current_path.to_string(),
            sign_out_action: self.paths.sign_out_action(),
        })
    }

    /// Sign out and return where to go next
    ///
    /// Always lands on the home page; a failing backend only gets logged.
    pub async fn sign_out(&self, context: &SessionContext) -> ShellOutcome {
        if let Err(e) = context.sign_out().await {
            log::debug!("Sign-out from {:?} shell completed locally only: {}", self.kind, e);
        }
        ShellOutcome::Redirect(self.paths.home.clone())
    }
}
