//! Wire types of the hosted auth and table APIs

use super::BackendError;
use crate::roles::{DirectoryError, Role};
use crate::session::{Identity, Session};
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Body of the password grant
#[derive(Debug, Serialize)]
pub(super) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of an account registration
#[derive(Debug, Serialize)]
pub(super) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    /// Stored as user metadata by the platform
    pub data: UserMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct UserMetadata<'a> {
    pub full_name: &'a str,
}

/// Body of a password-reset request
#[derive(Debug, Serialize)]
pub(super) struct RecoverRequest<'a> {
    pub email: &'a str,
}

/// Body of a password change for the bearer's own account
#[derive(Debug, Serialize)]
pub(super) struct PasswordUpdate<'a> {
    pub password: &'a str,
}

/// User object as returned by the auth API
#[derive(Debug, Deserialize)]
pub(super) struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserPayload> for Identity {
    fn from(user: UserPayload) -> Self {
        Identity::new(user.id, user.email.filter(|e| !e.is_empty()))
    }
}

/// Token grant response
#[derive(Debug, Deserialize)]
pub(super) struct TokenPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserPayload,
}

impl TokenPayload {
    /// Convert to a session, rejecting lifetimes that do not fit a timestamp
    pub fn into_session(self) -> Result<Session, BackendError> {
        let expires_at = match self.expires_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
            Some(at) => at,
            None => Duration::try_seconds(self.expires_in)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .ok_or_else(|| BackendError::Decode(format!("token lifetime out of range: {}s", self.expires_in)))?,
        };

        let session = Session::new(self.user.into(), self.access_token, expires_at);
        Ok(match self.refresh_token {
            Some(refresh) => session.with_refresh_token(refresh),
            None => session,
        })
    }
}

/// Registration response: a session when the platform confirms at once,
/// otherwise the pending user
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum SignUpPayload {
    Session(TokenPayload),
    Pending(UserPayload),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

/// Human-readable message of an auth API error body
pub(super) fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .filter(|message| !message.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

/// Fold a role table response into at most one role
pub(super) fn parse_role_rows(body: &[u8]) -> Result<Option<Role>, DirectoryError> {
    let rows: Vec<RoleRow> =
        serde_json::from_slice(body).map_err(|e| DirectoryError::Decode(e.to_string()))?;

    match rows.as_slice() {
        [] => Ok(None),
        [row] => row.role.parse().map(Some),
        rows => Err(DirectoryError::MultipleRows(rows.len())),
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
}

/// Expiry encoded in a JWT access token, if it is one
pub(super) fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claims.exp, 0).single()
}
