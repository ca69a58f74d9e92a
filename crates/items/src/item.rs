//! Item entity: one physical railway component, identified by its QR uid.
//!
//! # Invariants
//! - `uid` is immutable after creation (it is engraved into the component).
//! - Items are never hard-deleted; end-of-life is the `Retired` status.
//! - Status changes follow the lifecycle transitions in [`ItemStatus::can_transition_to`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use railtrace_core::{DomainError, DomainResult, ItemUid, VendorId};

/// Kind of railway fastening/track component being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    ElasticRailClip,
    RailPad,
    Liner,
    Sleeper,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::ElasticRailClip => "elastic_rail_clip",
            ComponentType::RailPad => "rail_pad",
            ComponentType::Liner => "liner",
            ComponentType::Sleeper => "sleeper",
        }
    }
}

impl core::str::FromStr for ComponentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elastic_rail_clip" => Ok(ComponentType::ElasticRailClip),
            "rail_pad" => Ok(ComponentType::RailPad),
            "liner" => Ok(ComponentType::Liner),
            "sleeper" => Ok(ComponentType::Sleeper),
            other => Err(DomainError::validation(format!(
                "unknown component type: {other}"
            ))),
        }
    }
}

/// Item lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Manufactured,
    Installed,
    InService,
    UnderInspection,
    Failed,
    Retired,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Manufactured => "manufactured",
            ItemStatus::Installed => "installed",
            ItemStatus::InService => "in_service",
            ItemStatus::UnderInspection => "under_inspection",
            ItemStatus::Failed => "failed",
            ItemStatus::Retired => "retired",
        }
    }

    /// Whether a direct transition to `next` is allowed.
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        match (self, next) {
            (Manufactured, Installed) => true,
            (Installed, InService) => true,
            (InService, UnderInspection) => true,
            (UnderInspection, InService) => true,
            // Anything still in the field can fail.
            (Manufactured | Installed | InService | UnderInspection, Failed) => true,
            // Retirement from service or after failure.
            (InService | Failed, Retired) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Retired)
    }
}

impl core::str::FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manufactured" => Ok(ItemStatus::Manufactured),
            "installed" => Ok(ItemStatus::Installed),
            "in_service" => Ok(ItemStatus::InService),
            "under_inspection" => Ok(ItemStatus::UnderInspection),
            "failed" => Ok(ItemStatus::Failed),
            "retired" => Ok(ItemStatus::Retired),
            other => Err(DomainError::validation(format!("unknown status: {other}"))),
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked railway component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub uid: ItemUid,
    pub lot_no: String,
    pub component_type: ComponentType,
    pub vendor_id: VendorId,
    pub status: ItemStatus,
    pub manufactured_at: DateTime<Utc>,
    pub installed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub warranty_months: u32,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Register a freshly manufactured component.
    pub fn manufactured(
        uid: ItemUid,
        lot_no: impl Into<String>,
        component_type: ComponentType,
        vendor_id: VendorId,
        manufactured_at: DateTime<Utc>,
        warranty_months: u32,
    ) -> DomainResult<Self> {
        let lot_no = lot_no.into();
        if lot_no.trim().is_empty() {
            return Err(DomainError::validation("lot_no must not be empty"));
        }
        if warranty_months == 0 {
            return Err(DomainError::validation("warranty_months must be positive"));
        }
        Ok(Self {
            uid,
            lot_no,
            component_type,
            vendor_id,
            status: ItemStatus::Manufactured,
            manufactured_at,
            installed_at: None,
            failed_at: None,
            warranty_months,
            updated_at: manufactured_at,
        })
    }

    /// Apply a lifecycle transition, stamping the relevant timestamps.
    pub fn transition(&mut self, next: ItemStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status == next {
            return Err(DomainError::invariant(format!(
                "item {} is already {}",
                self.uid, next
            )));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "item {} cannot move from {} to {}",
                self.uid, self.status, next
            )));
        }
        match next {
            ItemStatus::Installed => self.installed_at = Some(at),
            ItemStatus::Failed => self.failed_at = Some(at),
            _ => {}
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    pub fn is_failed(&self) -> bool {
        self.status == ItemStatus::Failed
    }

    /// Warranty expiry, once the component has been installed.
    pub fn warranty_expires_at(&self) -> Option<DateTime<Utc>> {
        let installed = self.installed_at?;
        // chrono months arithmetic: clamp to end-of-month semantics.
        installed.checked_add_months(chrono::Months::new(self.warranty_months))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item::manufactured(
            ItemUid::new("ERC-L1-0001").unwrap(),
            "L1",
            ComponentType::ElasticRailClip,
            VendorId::new(),
            Utc::now(),
            24,
        )
        .unwrap()
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut it = item();
        let now = Utc::now();
        it.transition(ItemStatus::Installed, now).unwrap();
        assert_eq!(it.installed_at, Some(now));
        it.transition(ItemStatus::InService, now).unwrap();
        it.transition(ItemStatus::UnderInspection, now).unwrap();
        it.transition(ItemStatus::InService, now).unwrap();
        it.transition(ItemStatus::Failed, now).unwrap();
        assert_eq!(it.failed_at, Some(now));
        it.transition(ItemStatus::Retired, now).unwrap();
        assert!(it.status.is_terminal());
    }

    #[test]
    fn rejects_skipping_installation() {
        let mut it = item();
        let err = it.transition(ItemStatus::InService, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rejects_noop_transition() {
        let mut it = item();
        assert!(it.transition(ItemStatus::Manufactured, Utc::now()).is_err());
    }

    #[test]
    fn rejects_empty_lot_and_zero_warranty() {
        let uid = ItemUid::new("ERC-L1-0002").unwrap();
        assert!(
            Item::manufactured(
                uid.clone(),
                "  ",
                ComponentType::RailPad,
                VendorId::new(),
                Utc::now(),
                12
            )
            .is_err()
        );
        assert!(
            Item::manufactured(
                uid,
                "L1",
                ComponentType::RailPad,
                VendorId::new(),
                Utc::now(),
                0
            )
            .is_err()
        );
    }

    #[test]
    fn warranty_expiry_requires_installation() {
        let mut it = item();
        assert!(it.warranty_expires_at().is_none());
        it.transition(ItemStatus::Installed, Utc::now()).unwrap();
        assert!(it.warranty_expires_at().is_some());
    }
}
