//! Session types and the auth backend trait

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to an authenticated end user, issued by the auth platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Platform user id (the key of the role directory)
    pub user_id: String,

    /// Sign-in e-mail, when the platform exposes it
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self { user_id: user_id.into(), email }
    }
}

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Who this session belongs to
    pub identity: Identity,

    /// Bearer token presented to the platform
    pub access_token: String,

    /// Refresh token, if the platform issued one
    pub refresh_token: Option<String>,

    /// Session expiration time
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(identity: Identity, access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { identity, access_token: access_token.into(), refresh_token: None, expires_at }
    }

    /// Attach a refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Check if the session is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Platform user id of the session owner
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// E-mail of the session owner, if known
    pub fn email(&self) -> Option<&str> {
        self.identity.email.as_deref()
    }

    /// Seconds until expiry (never negative)
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// What happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    /// A session carried over from an earlier page load or request was restored
    InitialSession,
    /// Successful sign-in
    SignedIn,
    /// Explicit sign-out
    SignedOut,
    /// Tokens were rotated for the same identity
    TokenRefreshed,
    /// The account behind the session changed (new password)
    UserUpdated,
    /// The session ran past its expiry and was dropped
    Expired,
}

/// Session change notification
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,

    /// Session after the change (`None` once signed out or expired)
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

/// Auth platform trait
///
/// Implement this trait to plug in an identity provider. The session context
/// only ever reads sessions and requests mutations through it.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange e-mail and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> crate::Result<Session>;

    /// Resolve an access token to its session
    ///
    /// Returns `Ok(None)` when the platform does not recognise the token.
    async fn get_session(&self, access_token: &str) -> crate::Result<Option<Session>>;

    /// Revoke the session behind an access token
    async fn sign_out(&self, access_token: &str) -> crate::Result<()>;

    /// Register a new account
    ///
    /// Returns the new session when the platform signs the user in at once,
    /// `Ok(None)` when it sent a confirmation e-mail instead.
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> crate::Result<Option<Session>>;

    /// Ask the platform to e-mail a password-reset link
    ///
    /// Succeeds for unknown addresses too; the answer never reveals whether
    /// an account exists.
    async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>) -> crate::Result<()>;

    /// Set a new password for the account behind an access token
    async fn update_password(&self, access_token: &str, new_password: &str) -> crate::Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

// Implement AuthBackend for Arc<B> to allow sharing a backend directly
#[async_trait::async_trait]
impl<B: AuthBackend + ?Sized> AuthBackend for std::sync::Arc<B> {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> crate::Result<Session> {
        (**self).sign_in_with_password(email, password).await
    }

    async fn get_session(&self, access_token: &str) -> crate::Result<Option<Session>> {
        (**self).get_session(access_token).await
    }

    async fn sign_out(&self, access_token: &str) -> crate::Result<()> {
        (**self).sign_out(access_token).await
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> crate::Result<Option<Session>> {
        (**self).sign_up(email, password, full_name).await
    }

    async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>) -> crate::Result<()> {
        (**self).request_password_reset(email, redirect_to).await
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> crate::Result<()> {
        (**self).update_password(access_token, new_password).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity() -> Identity {
        Identity::new("user-1", Some("ada@example.com".to_string()))
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new(identity(), "token-1", Utc::now() + Duration::hours(1));

        assert_eq!(session.user_id(), "user-1");
        assert_eq!(session.email(), Some("ada@example.com"));
        assert!(session.refresh_token.is_none());
        assert!(!session.is_expired());
        assert!(session.expires_in() > 3500);
    }

    #[test]
    fn test_session_expiration() {
        let session = Session::new(identity(), "token-1", Utc::now() - Duration::seconds(1));

        assert!(session.is_expired());
        assert_eq!(session.expires_in(), 0);
    }

    #[test]
    fn test_event_kind_wire_names() {
        let json = serde_json::to_string(&SessionEventKind::SignedIn).unwrap();
        assert_eq!(json, "\"SIGNED_IN\"");

        let kind: SessionEventKind = serde_json::from_str("\"TOKEN_REFRESHED\"").unwrap();
        assert_eq!(kind, SessionEventKind::TokenRefreshed);
        assert_eq!(serde_json::to_string(&SessionEventKind::UserUpdated).unwrap(), "\"USER_UPDATED\"");
    }
}
