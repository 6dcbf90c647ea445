//! Role directory trait and lookup resolution

use super::Role;
use crate::session::Session;
use std::fmt;

/// Why a directory lookup could not produce an answer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be reached
    #[error("role directory unreachable: {0}")]
    Unreachable(String),

    /// The directory answered with a non-success status
    #[error("role directory returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The stored role is not one of the known roles
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// More than one row for a single identity
    #[error("{0} role rows for one identity")]
    MultipleRows(usize),

    /// The response could not be decoded
    #[error("malformed role directory response: {0}")]
    Decode(String),
}

/// Role lookup trait
///
/// Implement this trait to provide a role source (hosted table, in-memory, ...).
#[async_trait::async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Look up the single role of the session's identity
    ///
    /// The lookup is made on behalf of the signed-in user, so directories
    /// that enforce row ownership see that user's credentials.
    /// `Ok(None)` means the identity has no role row.
    async fn role_for(&self, session: &Session) -> Result<Option<Role>, DirectoryError>;
}

#[async_trait::async_trait]
impl<D: RoleDirectory + ?Sized> RoleDirectory for std::sync::Arc<D> {
    async fn role_for(&self, session: &Session) -> Result<Option<Role>, DirectoryError> {
        (**self).role_for(session).await
    }
}

/// Outcome of a role lookup, with failure kept distinct from absence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleResolution {
    /// The identity has this role
    Assigned(Role),
    /// No row for this identity
    Missing,
    /// The lookup itself failed
    Failed(DirectoryError),
}

impl RoleResolution {
    /// The assigned role, if any
    pub fn role(&self) -> Option<Role> {
        match self {
            RoleResolution::Assigned(role) => Some(*role),
            _ => None,
        }
    }
}

impl From<Role> for RoleResolution {
    fn from(role: Role) -> Self {
        RoleResolution::Assigned(role)
    }
}

impl From<Option<Role>> for RoleResolution {
    fn from(role: Option<Role>) -> Self {
        role.map_or(RoleResolution::Missing, RoleResolution::Assigned)
    }
}

impl fmt::Display for RoleResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleResolution::Assigned(role) => write!(f, "{}", role),
            RoleResolution::Missing => f.write_str("no role"),
            RoleResolution::Failed(e) => write!(f, "lookup failed ({})", e),
        }
    }
}

/// Resolve the role of an identity, logging each outcome distinctly
pub async fn resolve_role(directory: &dyn RoleDirectory, session: &Session) -> RoleResolution {
    let user_id = session.user_id();
    match directory.role_for(session).await {
        Ok(Some(role)) => {
            log::debug!("Role for {}: {}", user_id, role);
            RoleResolution::Assigned(role)
        }
        Ok(None) => {
            log::warn!("No role row for {} (directory misconfiguration?)", user_id);
            RoleResolution::Missing
        }
        Err(e) => {
            log::error!("Role lookup for {} failed: {}", user_id, e);
            RoleResolution::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::MemoryRoleDirectory;
    use crate::session::Identity;
    use chrono::{Duration, Utc};

    fn session(user_id: &str) -> Session {
        Session::new(Identity::new(user_id, None), format!("token-{}", user_id), Utc::now() + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_resolution_keeps_failure_distinct() {
        let directory = MemoryRoleDirectory::new();
        directory.assign("dev-1", Role::Developer);

        assert_eq!(resolve_role(&directory, &session("dev-1")).await, RoleResolution::Assigned(Role::Developer));
        assert_eq!(resolve_role(&directory, &session("nobody")).await, RoleResolution::Missing);

        directory.fail_with(DirectoryError::Unreachable("connection refused".into()));
        let resolution = resolve_role(&directory, &session("dev-1")).await;
        assert!(matches!(resolution, RoleResolution::Failed(DirectoryError::Unreachable(_))));
        assert_eq!(resolution.role(), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(RoleResolution::from(Some(Role::Admin)), RoleResolution::Assigned(Role::Admin));
        assert_eq!(RoleResolution::from(None), RoleResolution::Missing);
    }

    #[test]
    fn test_display() {
        assert_eq!(RoleResolution::Assigned(Role::SuperAdmin).to_string(), "super_admin");
        assert_eq!(RoleResolution::Missing.to_string(), "no role");
        assert_eq!(
            RoleResolution::Failed(DirectoryError::MultipleRows(2)).to_string(),
            "lookup failed (2 role rows for one identity)"
        );
    }
}
