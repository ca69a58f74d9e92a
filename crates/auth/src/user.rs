//! Website user entity.
//!
//! Passwords are stored as salted SHA-256 digests (hex). The salt is the
//! user's UUID, unique per row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use railtrace_core::{DomainError, DomainResult, UserId};

use crate::Role;

const MIN_PASSWORD_LEN: usize = 8;

/// A user account for the tracking website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteUser {
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Hex-encoded salted SHA-256 digest.
    pub password_digest: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl WebsiteUser {
    pub fn create(
        username: impl Into<String>,
        password: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let id = UserId::new();
        let password_digest = digest(&id, password);
        Ok(Self {
            id,
            username,
            password_digest,
            role,
            active: true,
            created_at: now,
            last_login: None,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        digest(&self.id, password) == self.password_digest
    }

    pub fn set_password(&mut self, password: &str) -> DomainResult<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        self.password_digest = digest(&self.id, password);
        Ok(())
    }

    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login = Some(at);
    }
}

fn digest(salt: &UserId, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_uuid().as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_password_only() {
        let u = WebsiteUser::create("inspector1", "track-safe-42", Role::Inspector, Utc::now())
            .unwrap();
        assert!(u.verify_password("track-safe-42"));
        assert!(!u.verify_password("wrong"));
    }

    #[test]
    fn same_password_different_users_different_digests() {
        let a = WebsiteUser::create("a", "track-safe-42", Role::Viewer, Utc::now()).unwrap();
        let b = WebsiteUser::create("b", "track-safe-42", Role::Viewer, Utc::now()).unwrap();
        assert_ne!(a.password_digest, b.password_digest);
    }

    #[test]
    fn rejects_short_password_and_blank_username() {
        assert!(WebsiteUser::create("u", "short", Role::Viewer, Utc::now()).is_err());
        assert!(WebsiteUser::create("  ", "long-enough-pw", Role::Viewer, Utc::now()).is_err());
    }

    #[test]
    fn set_password_rotates_digest() {
        let mut u =
            WebsiteUser::create("inspector1", "track-safe-42", Role::Inspector, Utc::now())
                .unwrap();
        let old = u.password_digest.clone();
        u.set_password("another-pass-9").unwrap();
        assert_ne!(u.password_digest, old);
        assert!(u.verify_password("another-pass-9"));
    }
}
