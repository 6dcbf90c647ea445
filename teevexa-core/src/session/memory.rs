//! In-memory auth backend
//!
//! Users and issued tokens live in a thread-safe HashMap.
//! Suitable for development and tests; production uses the hosted platform.

use super::store::{AuthBackend, Identity, Session};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct MemoryUser {
    user_id: String,
    email: String,
    password: String,
    full_name: Option<String>,
    confirmed: bool,
}

/// In-memory auth backend
///
/// # Example
///
/// ```
/// use teevexa_core::session::MemoryAuthBackend;
///
/// let backend = MemoryAuthBackend::new();
/// let user_id = backend.add_user("ada@example.com", "s3cret-pass");
/// ```
pub struct MemoryAuthBackend {
    users: RwLock<HashMap<String, MemoryUser>>,
    sessions: RwLock<HashMap<String, Session>>,
    session_lifetime: Duration,
    /// Sign-ups wait for `confirm_email` before they can sign in
    confirm_sign_ups: bool,
    /// Reset e-mails "sent", with their redirect target
    reset_requests: RwLock<Vec<(String, Option<String>)>>,
}

impl MemoryAuthBackend {
    /// Create a backend issuing one-hour sessions
    pub fn new() -> Self {
        Self::with_session_lifetime(Duration::hours(1))
    }

    /// Create a backend with a custom session lifetime
    pub fn with_session_lifetime(session_lifetime: Duration) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            session_lifetime,
            confirm_sign_ups: false,
            reset_requests: RwLock::new(Vec::new()),
        }
    }

    /// Hold new accounts until their e-mail is confirmed
    pub fn with_email_confirmation(mut self) -> Self {
        self.confirm_sign_ups = true;
        self
    }

    /// Register a user with a generated id, returning the id
    pub fn add_user(&self, email: &str, password: &str) -> String {
        let user_id = uuid::Uuid::new_v4().to_string();
        self.add_user_with_id(&user_id, email, password);
        user_id
    }

    /// Register a user with a known id
    pub fn add_user_with_id(&self, user_id: &str, email: &str, password: &str) {
        let user = MemoryUser {
            user_id: user_id.to_string(),
            email: email.to_lowercase(),
            password: password.to_string(),
            full_name: None,
            confirmed: true,
        };
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.email.clone(), user);
    }

    /// Mark a pending sign-up as confirmed; `false` for unknown addresses
    pub fn confirm_email(&self, email: &str) -> bool {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.get_mut(&email.trim().to_lowercase()) {
            Some(user) => {
                user.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Name given at registration
    pub fn full_name(&self, email: &str) -> Option<String> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&email.trim().to_lowercase())
            .and_then(|user| user.full_name.clone())
    }

    /// Reset e-mails sent so far, as (address, redirect target)
    pub fn reset_requests(&self) -> Vec<(String, Option<String>)> {
        self.reset_requests.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Issue a session for a registered user without checking a password
    pub fn issue_session(&self, user_id: &str) -> Option<Session> {
        let user = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|u| u.user_id == user_id)
            .cloned()?;
        Some(self.open_session(&user))
    }

    /// Number of live (issued, not revoked) sessions
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn open_session(&self, user: &MemoryUser) -> Session {
        let session = Session::new(
            Identity::new(user.user_id.clone(), Some(user.email.clone())),
            uuid::Uuid::new_v4().simple().to_string(),
            Utc::now() + self.session_lifetime,
        )
        .with_refresh_token(uuid::Uuid::new_v4().simple().to_string());

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.access_token.clone(), session.clone());
        session
    }
}

impl Default for MemoryAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthBackend for MemoryAuthBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> crate::Result<Session> {
        let user = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&email.trim().to_lowercase())
            .filter(|u| u.password == password)
            .cloned();

        match user {
            Some(user) if !user.confirmed => Err(crate::Error::Authentication("Email not confirmed".to_string())),
            Some(user) => Ok(self.open_session(&user)),
            None => Err(crate::Error::Authentication("Invalid login credentials".to_string())),
        }
    }

    async fn get_session(&self, access_token: &str) -> crate::Result<Option<Session>> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.get(access_token).is_some_and(Session::is_expired) {
            sessions.remove(access_token);
            return Ok(None);
        }
        Ok(sessions.get(access_token).cloned())
    }

    async fn sign_out(&self, access_token: &str) -> crate::Result<()> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).remove(access_token);
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> crate::Result<Option<Session>> {
        let user = {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            let email = email.trim().to_lowercase();
            if users.contains_key(&email) {
                return Err(crate::Error::Validation("User already registered".to_string()));
            }
            let user = MemoryUser {
                user_id: uuid::Uuid::new_v4().to_string(),
                email: email.clone(),
                password: password.to_string(),
                full_name: Some(full_name.to_string()),
                confirmed: !self.confirm_sign_ups,
            };
            users.insert(email, user.clone());
            user
        };

        if user.confirmed {
            Ok(Some(self.open_session(&user)))
        } else {
            Ok(None)
        }
    }

    async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>) -> crate::Result<()> {
        let email = email.trim().to_lowercase();
        if self.users.read().unwrap_or_else(PoisonError::into_inner).contains_key(&email) {
            self.reset_requests
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push((email, redirect_to.map(str::to_string)));
        }
        Ok(())
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> crate::Result<()> {
        let Some(session) = self.get_session(access_token).await? else {
            return Err(crate::Error::Authentication("Session expired".to_string()));
        };

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let user = users
            .values_mut()
            .find(|u| u.user_id == session.user_id())
            .ok_or_else(|| crate::Error::Authentication("User not found".to_string()))?;
        if user.password == new_password {
            return Err(crate::Error::Validation(
                "New password should be different from the old password".to_string(),
            ));
        }
        user.password = new_password.to_string();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
