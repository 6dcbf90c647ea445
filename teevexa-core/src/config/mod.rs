//! Configuration system for the Teevexa gate
//!
//! # Configuration Hierarchy
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Command line** (applied by the CLI after loading)
//! 2. **Environment Variables** (`TEEVEXA_*`)
//! 3. **Config File** (`teevexa.toml`)
//! 4. **Defaults**
//!
//! Every section is optional in the file; missing keys keep their defaults.
//!
//! # Example
//!
//! ```no_run
//! use teevexa_core::config::TeevexaConfig;
//!
//! let config = TeevexaConfig::load()?;
//! config.validate()?;
//! println!("listening on {}", config.server.bind_address());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod backend;
pub mod gate;
pub mod logging;
pub mod server;
pub mod sessions;

pub use backend::BackendConfig;
pub use gate::GateConfig;
pub use logging::LoggingConfig;
pub use server::ServerConfig;
pub use sessions::SessionsConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "teevexa.toml";

/// Complete gate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeevexaConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub sessions: SessionsConfig,
    pub gate: GateConfig,
    pub logging: LoggingConfig,
}

impl TeevexaConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration, reading `path` when it exists
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.backend.merge(other.backend);
        self.sessions.merge(other.sessions);
        self.gate.merge(other.gate);
        self.logging.merge(other.logging);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.backend.apply_env_vars();
        self.sessions.apply_env_vars();
        self.logging.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate().context("[server]")?;
        self.backend.validate().context("[backend]")?;
        self.sessions.validate().context("[sessions]")?;
        self.gate.validate().context("[gate]")?;
        self.logging.validate().context("[logging]")?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
