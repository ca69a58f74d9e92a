//! Item UID value type.
//!
//! The UID is the string engraved into a component's QR code. It is the
//! natural key for items and is referenced by events, engravings and
//! notifications.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Maximum accepted UID length (matches the relational column width).
const MAX_LEN: usize = 64;

/// Validated item UID (non-empty, printable ASCII, no whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemUid(String);

impl ItemUid {
    pub fn new(s: impl Into<String>) -> Result<Self, DomainError> {
        let s = s.into();
        if s.is_empty() {
            return Err(DomainError::validation("item uid must not be empty"));
        }
        if s.len() > MAX_LEN {
            return Err(DomainError::validation(format!(
                "item uid exceeds {MAX_LEN} characters"
            )));
        }
        if !s.chars().all(|c| c.is_ascii_graphic()) {
            return Err(DomainError::validation(
                "item uid must be printable ASCII without whitespace",
            ));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemUid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemUid {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<ItemUid> for String {
    fn from(value: ItemUid) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_qr_uids() {
        assert!(ItemUid::new("RAIL-CLIP-2024-000123").is_ok());
        assert!(ItemUid::new("ERC/LOT7/42").is_ok());
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(ItemUid::new("").is_err());
        assert!(ItemUid::new("has space").is_err());
        assert!(ItemUid::new("tab\there").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "x".repeat(65);
        assert!(ItemUid::new(long).is_err());
    }
}
