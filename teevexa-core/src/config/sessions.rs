//! Sessions configuration

use crate::session::{CookieConfig, SameSitePolicy};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Sessions configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Name of the cookie carrying the access token
    /// Env: TEEVEXA_COOKIE_NAME
    /// Default: "teevexa_session"
    pub cookie_name: String,

    /// Set Secure flag on cookies (HTTPS only)
    /// Env: TEEVEXA_COOKIE_SECURE
    /// Default: true
    pub cookie_secure: bool,

    /// Set HttpOnly flag on cookies
    /// Default: true
    pub cookie_httponly: bool,

    /// SameSite policy: "Strict", "Lax", or "None"
    /// Env: TEEVEXA_COOKIE_SAMESITE
    /// Default: "Lax"
    pub cookie_samesite: String,

    /// Cookie maximum age in seconds, shortened to the token expiry when that comes first
    /// Env: TEEVEXA_SESSION_MAX_AGE
    /// Default: 3600 (1 hour)
    pub max_age: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            cookie_name: "teevexa_session".to_string(),
            cookie_secure: true,
            cookie_httponly: true,
            cookie_samesite: "Lax".to_string(),
            max_age: 3600,
        }
    }
}

impl SessionsConfig {
    pub fn merge(&mut self, other: Self) {
        self.cookie_name = other.cookie_name;
        self.cookie_secure = other.cookie_secure;
        self.cookie_httponly = other.cookie_httponly;
        self.cookie_samesite = other.cookie_samesite;
        self.max_age = other.max_age;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(name) = env::var("TEEVEXA_COOKIE_NAME") {
            self.cookie_name = name;
        }

        if let Ok(secure) = env::var("TEEVEXA_COOKIE_SECURE") {
            self.cookie_secure = secure.parse().unwrap_or(true);
        }

        if let Ok(samesite) = env::var("TEEVEXA_COOKIE_SAMESITE") {
            self.cookie_samesite = samesite;
        }

        if let Ok(max_age) = env::var("TEEVEXA_SESSION_MAX_AGE") {
            if let Ok(m) = max_age.parse() {
                self.max_age = m;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.is_empty()
            || self.cookie_name.contains(|c: char| c.is_whitespace() || "=;,".contains(c))
        {
            bail!("Invalid cookie_name '{}'", self.cookie_name);
        }

        if self.max_age == 0 {
            bail!("Invalid max_age: must be greater than 0");
        }

        let same_site: SameSitePolicy = self.cookie_samesite.parse()?;
        if same_site == SameSitePolicy::None && !self.cookie_secure {
            bail!("Invalid cookie settings: SameSite=None requires cookie_secure = true");
        }

        Ok(())
    }

    /// Cookie settings for the server
    pub fn cookie_config(&self) -> Result<CookieConfig> {
        Ok(CookieConfig {
            name: self.cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: self.cookie_httponly,
            same_site: self.cookie_samesite.parse()?,
            max_age: Some(i64::try_from(self.max_age)?),
            ..CookieConfig::default()
        })
    }
}
