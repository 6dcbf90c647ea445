//! Gate redirect paths

use crate::gate::GatePaths;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Where the gate and shells send users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub login_path: String,
    pub portal_path: String,
    pub admin_path: String,
    pub home_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        let paths = GatePaths::default();
        Self {
            login_path: paths.login,
            portal_path: paths.portal,
            admin_path: paths.admin,
            home_path: paths.home,
        }
    }
}

impl GateConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn validate(&self) -> Result<()> {
        for (key, path) in [
            ("login_path", &self.login_path),
            ("portal_path", &self.portal_path),
            ("admin_path", &self.admin_path),
            ("home_path", &self.home_path),
        ] {
            if !path.starts_with('/') {
                bail!("Invalid {} '{}': must start with '/'", key, path);
            }
        }
        if self.portal_path == self.admin_path {
            bail!("Invalid gate paths: portal and admin areas must differ");
        }
        Ok(())
    }

    pub fn paths(&self) -> GatePaths {
        GatePaths {
            login: self.login_path.clone(),
            portal: self.portal_path.clone(),
            admin: self.admin_path.clone(),
            home: self.home_path.clone(),
        }
    }
}
