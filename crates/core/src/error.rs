//! Errors shared by the component-tracking domain crates.
//!
//! Everything here is deterministic and caller-facing: a malformed uid, an
//! illegal lifecycle transition, a duplicate lot or vendor key. Storage and
//! transport failures are modeled in their own layers and mapped separately.

use thiserror::Error;

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before it became an entity: empty lot_no, unknown
    /// component type, zero warranty, oversized uid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An entity rule would be broken, e.g. a status transition the
    /// lifecycle does not allow, or cancelling a finished engraving.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A uid or uuid parameter failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Lookup by key matched nothing.
    #[error("not found")]
    NotFound,

    /// A unique key is already taken (item uid, vendor name, username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's role does not permit the operation.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_detail() {
        let e = DomainError::validation("lot_no must not be empty");
        assert_eq!(e.to_string(), "validation failed: lot_no must not be empty");

        let e = DomainError::invariant("manufactured -> retired");
        assert_eq!(e.to_string(), "invariant violated: manufactured -> retired");
    }

    #[test]
    fn helpers_build_the_matching_variant() {
        assert_eq!(DomainError::not_found(), DomainError::NotFound);
        assert!(matches!(
            DomainError::conflict("uid taken"),
            DomainError::Conflict(_)
        ));
    }
}
