//! Logging configuration

use crate::logging::{LogFormat, LOG_LEVELS};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: TEEVEXA_LOG_LEVEL
    pub level: String,
    /// "json", "human" or "logfmt"
    /// Env: TEEVEXA_LOG_FORMAT
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "human".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("TEEVEXA_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("TEEVEXA_LOG_FORMAT") {
            self.format = format;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            bail!("Invalid log level '{}': must be one of {}", self.level, LOG_LEVELS.join(", "));
        }
        self.format.parse::<LogFormat>()?;
        Ok(())
    }
}
