//! Hosted backend platform client
//!
//! [`SupabaseClient`] talks to a Supabase-style platform: the GoTrue auth API
//! for sessions and the PostgREST table API for the role directory. It
//! implements both [`AuthBackend`] and [`RoleDirectory`], so one client serves
//! the whole gate.
//!
//! Every request carries the `apikey` header; calls made on behalf of a user
//! carry that user's bearer token.

mod wire;

use crate::config::BackendConfig;
use crate::roles::{DirectoryError, Role, RoleDirectory};
use crate::session::{AuthBackend, Session};
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use std::time::Duration as StdDuration;
use wire::{
    PasswordGrant, PasswordUpdate, RecoverRequest, SignUpPayload, SignUpRequest, TokenPayload, UserMetadata,
    UserPayload,
};

/// Lifetime assumed for a restored session whose token carries no expiry
const FALLBACK_SESSION_SECS: i64 = 3600;

/// Backend platform error
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// The request never got an answer
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The platform answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The answer could not be decoded
    #[error("malformed backend response: {0}")]
    Decode(String),

    /// The client could not be built from its settings
    #[error("invalid backend settings: {0}")]
    Config(String),
}

/// Client for the hosted auth and table APIs
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    roles_table: String,
}

impl SupabaseClient {
    /// Build a client from backend settings
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            roles_table: config.roles_table.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token_url(&self) -> String {
        format!("{}/auth/v1/token?grant_type=password", self.base_url)
    }

    fn user_url(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }

    fn logout_url(&self) -> String {
        format!("{}/auth/v1/logout", self.base_url)
    }

    fn signup_url(&self) -> String {
        format!("{}/auth/v1/signup", self.base_url)
    }

    fn recover_url(&self, redirect_to: Option<&str>) -> String {
        match redirect_to {
            Some(target) => format!("{}/auth/v1/recover?redirect_to={}", self.base_url, urlencoding::encode(target)),
            None => format!("{}/auth/v1/recover", self.base_url),
        }
    }

    fn role_url(&self, user_id: &str) -> String {
        format!(
            "{}/rest/v1/{}?select=role&user_id=eq.{}",
            self.base_url,
            urlencoding::encode(&self.roles_table),
            urlencoding::encode(user_id)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response, BackendError> {
        request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|source| BackendError::Transport { url: url.to_string(), source })
    }

    /// Read the caller's own role row
    ///
    /// Sent with the user's access token: the roles table only exposes a row
    /// to its owner.
    async fn fetch_role(&self, session: &Session) -> Result<Option<Role>, DirectoryError> {
        let url = self.role_url(session.user_id());
        let response = self
            .send(self.http.get(&url).bearer_auth(&session.access_token), &url)
            .await
            .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| DirectoryError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        wire::parse_role_rows(&body)
    }
}

async fn status_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Status { status, body }
}

/// A 400/422 answer: the platform refused the submitted values
async fn refusal(response: reqwest::Response, fallback: &str) -> crate::Error {
    let body = response.text().await.unwrap_or_default();
    crate::Error::Validation(wire::error_message(&body).unwrap_or_else(|| fallback.to_string()))
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> crate::Result<Session> {
        let url = self.token_url();
        let grant = PasswordGrant { email: email.trim(), password };
        let response = self.send(self.http.post(&url).json(&grant), &url).await?;

        match response.status() {
            status if status.is_success() => {
                let payload: TokenPayload =
                    response.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
                Ok(payload.into_session()?)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                log::debug!("Password grant refused for {}", email);
                Err(crate::Error::Authentication("Invalid login credentials".to_string()))
            }
            _ => Err(status_error(response).await.into()),
        }
    }

    async fn get_session(&self, access_token: &str) -> crate::Result<Option<Session>> {
        let url = self.user_url();
        let response = self.send(self.http.get(&url).bearer_auth(access_token), &url).await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserPayload =
                    response.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
                let expires_at = wire::token_expiry(access_token)
                    .unwrap_or_else(|| Utc::now() + Duration::seconds(FALLBACK_SESSION_SECS));
                Ok(Some(Session::new(user.into(), access_token, expires_at)))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(status_error(response).await.into()),
        }
    }

    async fn sign_out(&self, access_token: &str) -> crate::Result<()> {
        let url = self.logout_url();
        let response = self.send(self.http.post(&url).bearer_auth(access_token), &url).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Token already revoked or expired: nothing left to sign out.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(status_error(response).await.into()),
        }
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> crate::Result<Option<Session>> {
        let url = self.signup_url();
        let request = SignUpRequest { email, password, data: UserMetadata { full_name } };
        let response = self.send(self.http.post(&url).json(&request), &url).await?;

        match response.status() {
            status if status.is_success() => {
                let payload: SignUpPayload =
                    response.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
                match payload {
                    SignUpPayload::Session(token) => Ok(Some(token.into_session()?)),
                    SignUpPayload::Pending(user) => {
                        log::debug!("Account {} created, confirmation pending", user.id);
                        Ok(None)
                    }
                }
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(refusal(response, "Sign-up refused").await)
            }
            _ => Err(status_error(response).await.into()),
        }
    }

    async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>) -> crate::Result<()> {
        let url = self.recover_url(redirect_to);
        let response = self.send(self.http.post(&url).json(&RecoverRequest { email }), &url).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(refusal(response, "Password reset refused").await)
            }
            _ => Err(status_error(response).await.into()),
        }
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> crate::Result<()> {
        let url = self.user_url();
        let body = PasswordUpdate { password: new_password };
        let response = self.send(self.http.put(&url).bearer_auth(access_token).json(&body), &url).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(crate::Error::Authentication("Session expired".to_string()))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(refusal(response, "Password change refused").await)
            }
            _ => Err(status_error(response).await.into()),
        }
    }

    fn name(&self) -> &str {
        "supabase"
    }
}

#[async_trait::async_trait]
impl RoleDirectory for SupabaseClient {
    async fn role_for(&self, session: &Session) -> Result<Option<Role>, DirectoryError> {
        self.fetch_role(session).await
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("roles_table", &self.roles_table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;

    fn client(url: &str) -> SupabaseClient {
        let config = BackendConfig { url: url.to_string(), ..BackendConfig::default() };
        SupabaseClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client("https://abc.supabase.co/");
        assert_eq!(client.base_url(), "https://abc.supabase.co");
        assert_eq!(client.token_url(), "https://abc.supabase.co/auth/v1/token?grant_type=password");
        assert_eq!(client.user_url(), "https://abc.supabase.co/auth/v1/user");
        assert_eq!(client.logout_url(), "https://abc.supabase.co/auth/v1/logout");
        assert_eq!(client.signup_url(), "https://abc.supabase.co/auth/v1/signup");
        assert_eq!(client.recover_url(None), "https://abc.supabase.co/auth/v1/recover");
        assert_eq!(
            client.recover_url(Some("https://teevexa.com/auth/reset-password")),
            "https://abc.supabase.co/auth/v1/recover?redirect_to=https%3A%2F%2Fteevexa.com%2Fauth%2Freset-password"
        );
    }

    #[test]
    fn test_role_url_encodes_filter() {
        let client = client("http://localhost:54321");
        assert_eq!(
            client.role_url("8d0c-41&x"),
            "http://localhost:54321/rest/v1/user_roles?select=role&user_id=eq.8d0c-41%26x"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let config = BackendConfig { anon_key: "secret-key".into(), ..BackendConfig::default() };
        let client = SupabaseClient::from_config(&config).unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_a_failure() {
        // Nothing listens on port 9 locally.
        let client = client("http://127.0.0.1:9");
        let session = Session::new(Identity::new("user-1", None), "token", Utc::now() + Duration::minutes(5));
        let result = client.role_for(&session).await;
        assert!(matches!(result, Err(DirectoryError::Unreachable(_))));
    }
}
