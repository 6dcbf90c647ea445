//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use teevexa_core::prelude::*;
//! ```

// === Session ===
pub use crate::session::{
    AuthBackend, Identity, MemoryAuthBackend, PasswordChange, Session, SessionContext, SessionEvent,
    SessionEventKind, SessionSubscription, SessionUpdate, SignUpForm,
};

// === Roles ===
pub use crate::roles::{resolve_role, DirectoryError, MemoryRoleDirectory, Role, RoleDirectory, RoleResolution};

// === Gate ===
pub use crate::gate::{
    decide, AccessDecision, AccessGate, AreaKind, DenialReason, GateHandle, GatePaths, GateState,
};

// === Shells and navigation ===
pub use crate::nav::{admin_sections, filter_sections, portal_items, NavItem, NavSection};
pub use crate::shell::{Navigation, Shell, ShellKind, ShellOutcome, ShellView};

// === Backend, server, configuration ===
pub use crate::backend::{BackendError, SupabaseClient};
pub use crate::config::TeevexaConfig;
pub use crate::logging::init_logging;
pub use crate::server::PortalServer;
