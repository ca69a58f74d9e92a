//! Notification entity.
//!
//! # Invariants
//! - Rows are append-only: created once, mutated only by mark-read/dismiss.
//! - Mark-read and dismiss are idempotent per row.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use railtrace_core::{ItemUid, NotificationId};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl core::str::FromStr for Severity {
    type Err = railtrace_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(railtrace_core::DomainError::validation(format!(
                "unknown severity: {other}"
            ))),
        }
    }
}

/// What callers hand to the emitter; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub item_uid: Option<ItemUid>,
}

impl NotificationDraft {
    pub fn new(
        notification_type: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            notification_type: notification_type.into(),
            title: title.into(),
            message: message.into(),
            severity,
            metadata: BTreeMap::new(),
            item_uid: None,
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn for_item(mut self, uid: ItemUid) -> Self {
        self.item_uid = Some(uid);
        self
    }

    pub fn into_notification(self, at: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            severity: self.severity,
            metadata: self.metadata,
            item_uid: self.item_uid,
            read: false,
            dismissed: false,
            created_at: at,
        }
    }
}

/// A persisted notification row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub item_uid: Option<ItemUid>,
    pub read: bool,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Returns true if the row changed.
    pub fn mark_read(&mut self) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        true
    }

    /// Returns true if the row changed. Dismissing implies read.
    pub fn dismiss(&mut self) -> bool {
        if self.dismissed {
            return false;
        }
        self.dismissed = true;
        self.read = true;
        true
    }

    pub fn is_unread(&self) -> bool {
        !self.read && !self.dismissed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n() -> Notification {
        NotificationDraft::new("lot.risk", "Lot L1 critical", "failure rate 0.6", Severity::Critical)
            .into_notification(Utc::now())
    }

    #[test]
    fn mark_read_is_idempotent() {
        let mut x = n();
        assert!(x.mark_read());
        assert!(!x.mark_read());
        assert!(x.read);
    }

    #[test]
    fn dismiss_implies_read_and_is_idempotent() {
        let mut x = n();
        assert!(x.dismiss());
        assert!(x.read);
        assert!(!x.dismiss());
    }

    #[test]
    fn unread_excludes_dismissed() {
        let mut x = n();
        assert!(x.is_unread());
        x.dismiss();
        assert!(!x.is_unread());
    }

    #[test]
    fn severity_ordering_is_monotonic() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }
}
