//! Backend platform configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Platform base URL
    /// Env: TEEVEXA_BACKEND_URL
    /// Default: "http://localhost:54321" (local platform stack)
    pub url: String,

    /// Public API key sent with every request
    /// Env: TEEVEXA_BACKEND_ANON_KEY
    pub anon_key: String,

    /// Table mapping user ids to roles
    /// Env: TEEVEXA_ROLES_TABLE
    /// Default: "user_roles"
    pub roles_table: String,

    /// Per-request timeout in seconds
    /// Env: TEEVEXA_BACKEND_TIMEOUT
    /// Default: 10
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            roles_table: "user_roles".to_string(),
            timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = env::var("TEEVEXA_BACKEND_URL") {
            self.url = url;
        }

        if let Ok(key) = env::var("TEEVEXA_BACKEND_ANON_KEY") {
            self.anon_key = key;
        }

        if let Ok(table) = env::var("TEEVEXA_ROLES_TABLE") {
            self.roles_table = table;
        }

        if let Ok(timeout) = env::var("TEEVEXA_BACKEND_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            bail!("Invalid backend url: must not be empty");
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            bail!("Invalid backend url '{}': must start with http:// or https://", self.url);
        }

        if self.roles_table.trim().is_empty() {
            bail!("Invalid roles_table: must not be empty");
        }

        if self.timeout_secs == 0 {
            bail!("Invalid timeout_secs: must be greater than 0");
        }

        if self.anon_key.is_empty() {
            log::warn!("Backend anon_key is empty; the platform will reject requests");
        }

        Ok(())
    }
}
