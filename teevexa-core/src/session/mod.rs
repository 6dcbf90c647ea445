//! Session management
//!
//! This module provides everything the gate needs to know about "who is
//! signed in":
//! - An injected [`SessionContext`] with explicit subscribe/unsubscribe
//! - A trait-based auth backend (hosted platform, in-memory)
//! - Account forms: registration, password reset and change
//! - Session cookie handling for the HTTP server
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use teevexa_core::session::{MemoryAuthBackend, SessionContext};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = Arc::new(MemoryAuthBackend::new());
//! backend.add_user("ada@example.com", "s3cret-pass");
//!
//! let context = SessionContext::new(backend);
//! let mut subscription = context.subscribe();
//! context.sign_in_with_password("ada@example.com", "s3cret-pass").await?;
//! let _update = subscription.next().await;
//! # Ok(())
//! # }
//! ```

mod account;
mod context;
mod cookie;
mod memory;
mod store;

pub use account::{validate_email, validate_password, PasswordChange, SignUpForm, MIN_PASSWORD_LEN};
pub use context::{SessionContext, SessionSubscription, SessionUpdate};
pub use cookie::{CookieConfig, SessionCookie};
pub use memory::MemoryAuthBackend;
pub use store::{AuthBackend, Identity, Session, SessionEvent, SessionEventKind};

use std::str::FromStr;

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    /// Strict - cookie only sent to same site
    Strict,

    /// Lax - cookie sent on top-level navigation
    Lax,

    /// None - cookie sent on all requests (requires Secure)
    None,
}

impl SameSitePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSitePolicy::Strict => "Strict",
            SameSitePolicy::Lax => "Lax",
            SameSitePolicy::None => "None",
        }
    }
}

impl FromStr for SameSitePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Strict" => Ok(SameSitePolicy::Strict),
            "Lax" => Ok(SameSitePolicy::Lax),
            "None" => Ok(SameSitePolicy::None),
            other => Err(crate::Error::Config(format!(
                "Invalid SameSite policy '{}': must be Strict, Lax, or None",
                other
            ))),
        }
    }
}
