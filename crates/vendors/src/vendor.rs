//! Vendor entity.
//!
//! The relational schema keeps vendor_code, warranty_months and notes as
//! denormalized fields inside a free-form metadata map rather than columns,
//! so the entity carries them the same way.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use railtrace_core::{DomainError, DomainResult, VendorId};

/// A component manufacturer. Owns items via `Item::vendor_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    /// Unique display name.
    pub name: String,
    /// Denormalized attributes (vendor_code, warranty_months, notes, ...).
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("vendor name must not be empty"));
        }
        Ok(Self {
            id: VendorId::new(),
            name,
            metadata: BTreeMap::new(),
            active: true,
            created_at,
            updated_at: created_at,
        })
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Merge metadata keys; `null` values remove the key.
    pub fn apply_metadata_patch(
        &mut self,
        patch: BTreeMap<String, serde_json::Value>,
        at: DateTime<Utc>,
    ) {
        for (k, v) in patch {
            if v.is_null() {
                self.metadata.remove(&k);
            } else {
                self.metadata.insert(k, v);
            }
        }
        self.updated_at = at;
    }

    pub fn set_active(&mut self, active: bool, at: DateTime<Utc>) {
        self.active = active;
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_blank_name() {
        assert!(Vendor::new("   ", Utc::now()).is_err());
    }

    #[test]
    fn metadata_patch_merges_and_removes() {
        let mut v = Vendor::new("Acme Rail", Utc::now()).unwrap();
        v.apply_metadata_patch(
            BTreeMap::from([
                ("vendor_code".to_string(), json!("ACM")),
                ("warranty_months".to_string(), json!(24)),
            ]),
            Utc::now(),
        );
        assert_eq!(v.metadata.get("vendor_code"), Some(&json!("ACM")));

        v.apply_metadata_patch(
            BTreeMap::from([("vendor_code".to_string(), serde_json::Value::Null)]),
            Utc::now(),
        );
        assert!(!v.metadata.contains_key("vendor_code"));
        assert_eq!(v.metadata.get("warranty_months"), Some(&json!(24)));
    }
}
