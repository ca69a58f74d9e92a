//! `railtrace-auth` — authentication boundary (users, roles, JWT).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;
pub mod roles;
pub mod user;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator};
pub use roles::Role;
pub use user::WebsiteUser;
