//! In-memory role directory
//!
//! Used for development and tests. Can be told to fail or to answer slowly,
//! which is how the gate's failure and race handling is exercised.

use super::{DirectoryError, Role, RoleDirectory};
use crate::session::Session;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// In-memory role directory
#[derive(Default)]
pub struct MemoryRoleDirectory {
    roles: RwLock<HashMap<String, Role>>,
    failure: RwLock<Option<DirectoryError>>,
    delay: RwLock<Option<Duration>>,
    lookups: AtomicUsize,
}

impl MemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give an identity a role (replacing any previous one)
    pub fn assign(&self, user_id: &str, role: Role) {
        self.roles.write().unwrap_or_else(PoisonError::into_inner).insert(user_id.to_string(), role);
    }

    /// Remove the role row of an identity
    pub fn revoke(&self, user_id: &str) {
        self.roles.write().unwrap_or_else(PoisonError::into_inner).remove(user_id);
    }

    /// Make every lookup fail with this error until cleared
    pub fn fail_with(&self, error: DirectoryError) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Delay every lookup by this much
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap_or_else(PoisonError::into_inner) = Some(delay);
        self
    }

    /// Number of lookups served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn role_for(&self, session: &Session) -> Result<Option<Role>, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.read().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(error);
        }

        Ok(self.roles.read().unwrap_or_else(PoisonError::into_inner).get(session.user_id()).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;
    use chrono::Utc;

    fn session(user_id: &str) -> Session {
        Session::new(Identity::new(user_id, None), "token", Utc::now() + chrono::Duration::minutes(5))
    }

    #[tokio::test]
    async fn test_assign_and_revoke() {
        let directory = MemoryRoleDirectory::new();
        let user = session("user-1");
        directory.assign("user-1", Role::Client);
        directory.assign("user-1", Role::Admin);

        assert_eq!(directory.role_for(&user).await.unwrap(), Some(Role::Admin));

        directory.revoke("user-1");
        assert_eq!(directory.role_for(&user).await.unwrap(), None);
        assert_eq!(directory.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_toggle() {
        let directory = MemoryRoleDirectory::new();
        let user = session("user-1");
        directory.assign("user-1", Role::Developer);

        directory.fail_with(DirectoryError::Rejected { status: 503, body: "down".into() });
        assert!(directory.role_for(&user).await.is_err());

        directory.clear_failure();
        assert_eq!(directory.role_for(&user).await.unwrap(), Some(Role::Developer));
    }
}
