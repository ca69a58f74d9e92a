//! RBAC roles.

use serde::{Deserialize, Serialize};

/// Role granted to a website user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including the reset utility.
    Admin,
    /// Can record inspections, events and run jobs.
    Inspector,
    /// Read-only access.
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Inspector => "inspector",
            Role::Viewer => "viewer",
        }
    }

    /// Whether this role may perform writes (everything except reads).
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Admin | Role::Inspector)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::str::FromStr for Role {
    type Err = railtrace_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "inspector" => Ok(Role::Inspector),
            "viewer" => Ok(Role::Viewer),
            other => Err(railtrace_core::DomainError::validation(format!(
                "unknown role: {other}"
            ))),
        }
    }
}
