//! Role management
//!
//! Every identity has at most one role, taken from a closed set that matches
//! the `app_role` enum of the backend platform. The [`RoleDirectory`] trait is
//! the seam to wherever that mapping lives.

mod directory;
mod memory;

pub use directory::{resolve_role, DirectoryError, RoleDirectory, RoleResolution};
pub use memory::MemoryRoleDirectory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
    ProjectManager,
    Developer,
    /// Lowest-privilege tier: end customers of the agency
    Client,
}

impl Role {
    /// Every role, highest privilege first
    pub const ALL: [Role; 5] =
        [Role::SuperAdmin, Role::Admin, Role::ProjectManager, Role::Developer, Role::Client];

    /// Wire name as stored in the role directory
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
            Role::ProjectManager => "project_manager",
            Role::Developer => "developer",
            Role::Client => "client",
        }
    }

    /// Whether this role may enter the staff area
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| DirectoryError::UnknownRole(s.to_string()))
    }
}
