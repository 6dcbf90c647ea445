//! Server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening address
    /// Env: TEEVEXA_HOST
    /// Default: "127.0.0.1"
    pub host: String,

    /// Listening port
    /// Env: TEEVEXA_PORT
    /// Default: 8080
    pub port: u16,

    /// Maximum request body size in bytes (sign-in forms only)
    /// Env: TEEVEXA_MAX_BODY_SIZE
    /// Default: 65536 (64KB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, max_body_size: 64 * 1024 }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.host = other.host;
        self.port = other.port;
        self.max_body_size = other.max_body_size;
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        if let Ok(host) = env::var("TEEVEXA_HOST") {
            self.host = host;
        }

        if let Ok(port) = env::var("TEEVEXA_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(size) = env::var("TEEVEXA_MAX_BODY_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_body_size = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("Invalid port: must be between 1 and 65535");
        }

        if self.host.trim().is_empty() {
            bail!("Invalid host: must not be empty");
        }

        if self.max_body_size == 0 {
            bail!("Invalid max_body_size: must be greater than 0");
        }

        Ok(())
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
