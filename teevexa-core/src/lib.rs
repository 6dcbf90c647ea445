//! Teevexa Portal Gate - Core
//!
//! Session and role gating for the Teevexa client portal and admin back-office.
//!
//! # Overview
//!
//! All persistent state (users, roles, projects, invoices...) lives in an
//! external backend platform. This crate owns the one piece of local logic
//! worth having: deciding whether a given session may see the client portal
//! or the staff area, and what the staff navigation looks like for its role.
//!
//! # Architecture
//!
//! - [`session`] - Injected session context with subscribe/unsubscribe
//! - [`roles`] - Closed role set and the role directory seam
//! - [`gate`] - Pure access decision and the per-mount gate task
//! - [`nav`] - Static navigation and role-based section filtering
//! - [`shell`] - Portal and admin layout shells
//! - [`backend`] - HTTP client for the hosted auth and table APIs
//! - [`server`] - hyper server serving both areas behind the gate
//! - [`config`] / [`logging`] - Ambient configuration and log setup
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use teevexa_core::prelude::*;
//!
//! let context = Arc::new(SessionContext::new(backend));
//! let gate = AccessGate::new(context, directory, AreaKind::Staff).mount();
//! match Shell::admin().outcome(&gate.settled().await, "/admin") {
//!     ShellOutcome::Render(view) => println!("{}", view.to_html()),
//!     ShellOutcome::Redirect(path) => println!("-> {}", path),
//!     ShellOutcome::Loading => {}
//! }
//! ```

pub mod backend;
pub mod config;
pub mod gate;
pub mod logging;
pub mod nav;
pub mod roles;
pub mod server;
pub mod session;
pub mod shell;

pub mod prelude;

pub use backend::{BackendError, SupabaseClient};
pub use config::TeevexaConfig;
pub use gate::{AccessDecision, AccessGate, AreaKind, GateHandle, GateState};
pub use logging::init_logging;
pub use roles::{Role, RoleDirectory, RoleResolution};
pub use server::PortalServer;
pub use session::{Session, SessionContext};
pub use shell::{Shell, ShellOutcome, ShellView};

/// Main result type for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The backend platform rejected or failed a call
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Role directory lookup failed
    #[error("Directory error: {0}")]
    Directory(#[from] roles::DirectoryError),

    /// Sign-in was refused (bad credentials, unknown user)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Submitted account details were refused (weak password, duplicate account...)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}
