//! JWT claims model (transport-agnostic).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use railtrace_core::UserId;

use crate::Role;

/// The minimal set of claims the API expects once a token has been decoded
/// and verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Username at issue time (display only, not an authorization input).
    pub username: String,

    /// Role granted to the user.
    pub role: Role,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiration, unix seconds.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(
        sub: UserId,
        username: impl Into<String>,
        role: Role,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            sub,
            username: username.into(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification/decoding is
/// the concern of [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat_offset: i64, exp_offset: i64) -> JwtClaims {
        let now = Utc::now().timestamp();
        JwtClaims {
            sub: UserId::new(),
            username: "inspector1".to_string(),
            role: Role::Inspector,
            iat: now + iat_offset,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn accepts_current_window() {
        assert!(validate_claims(&claims(-60, 60), Utc::now()).is_ok());
    }

    #[test]
    fn rejects_expired() {
        assert_eq!(
            validate_claims(&claims(-120, -60), Utc::now()),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn rejects_future_iat() {
        assert_eq!(
            validate_claims(&claims(60, 120), Utc::now()),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        assert_eq!(
            validate_claims(&claims(60, -60), Utc::now()),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
