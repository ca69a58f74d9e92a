//! Role checks at the route boundary.
//!
//! Three roles: viewers read, inspectors also write, admins additionally get
//! the destructive utilities. Enforced here so the domain crates stay
//! auth-agnostic.

use axum::http::StatusCode;

use crate::app::errors;
use crate::context::AuthContext;

/// Require a role that may create or mutate records.
pub fn require_write(auth: &AuthContext) -> Result<(), axum::response::Response> {
    if auth.role().can_write() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "role cannot modify records",
        ))
    }
}

/// Require the admin role.
pub fn require_admin(auth: &AuthContext) -> Result<(), axum::response::Response> {
    if auth.role().is_admin() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin role required",
        ))
    }
}
