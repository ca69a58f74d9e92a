//! Store traits shared by the in-memory and Postgres backends.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use railtrace_analytics::{AggregationOutcome, LotHealthRow, LotItemRecord, LotQualityRow, RiskLevel};
use railtrace_auth::WebsiteUser;
use railtrace_core::{EngravingId, ItemUid, NotificationId, VendorId};
use railtrace_engraving::EngravingJob;
use railtrace_items::{Item, ItemEvent};
use railtrace_notifications::{Notification, NotificationDraft};
use railtrace_vendors::Vendor;

pub mod memory;
pub mod postgres;

/// Storage-layer error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique-key conflict (duplicate uid, vendor name, username, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert a new item; `Conflict` if the uid is taken.
    async fn insert_item(&self, item: &Item) -> Result<(), StoreError>;

    async fn get_item(&self, uid: &ItemUid) -> Result<Option<Item>, StoreError>;

    /// List items, optionally restricted to one lot.
    async fn list_items(&self, lot_no: Option<&str>) -> Result<Vec<Item>, StoreError>;

    /// Persist a mutated item; `NotFound` if the uid is unknown.
    async fn update_item(&self, item: &Item) -> Result<(), StoreError>;

    /// Append an audit event. Returns `false` (and stores nothing) when the
    /// event carries an `external_id` already seen for that item.
    async fn append_event(&self, event: &ItemEvent) -> Result<bool, StoreError>;

    async fn list_events(&self, uid: &ItemUid) -> Result<Vec<ItemEvent>, StoreError>;

    /// Minimal projection of the full Items table for the aggregation job.
    async fn lot_records(&self) -> Result<Vec<LotItemRecord>, StoreError>;
}

#[async_trait]
pub trait VendorStore: Send + Sync {
    /// Insert a new vendor; `Conflict` if the name is taken.
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<(), StoreError>;

    async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>, StoreError>;

    async fn list_vendors(&self) -> Result<Vec<Vendor>, StoreError>;

    async fn update_vendor(&self, vendor: &Vendor) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LotAnalyticsStore: Send + Sync {
    /// Risk levels currently stored per lot (transition detection input).
    async fn current_risk_levels(&self) -> Result<BTreeMap<String, RiskLevel>, StoreError>;

    /// Atomically replace the derived tables with the outcome of one run and
    /// insert its notification drafts. Rows for lots absent from the outcome
    /// are pruned. On the Postgres backend this is one transaction.
    async fn apply_lot_outcome(
        &self,
        outcome: &AggregationOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_lot_health(&self) -> Result<Vec<LotHealthRow>, StoreError>;

    async fn get_lot_health(&self, lot_no: &str) -> Result<Option<LotHealthRow>, StoreError>;

    async fn list_lot_quality(&self) -> Result<Vec<LotQualityRow>, StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, draft: NotificationDraft, now: DateTime<Utc>)
    -> Result<Notification, StoreError>;

    /// Newest first; `unread_only` filters to `read = false, dismissed = false`.
    async fn list_notifications(&self, unread_only: bool) -> Result<Vec<Notification>, StoreError>;

    async fn unread_count(&self) -> Result<u64, StoreError>;

    /// Batch mark-read. Unknown or already-read ids are ignored; returns the
    /// number of rows actually changed.
    async fn mark_read(&self, ids: &[NotificationId]) -> Result<u64, StoreError>;

    /// Batch dismiss, same idempotence contract as `mark_read`.
    async fn dismiss(&self, ids: &[NotificationId]) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; `Conflict` if the username is taken.
    async fn insert_user(&self, user: &WebsiteUser) -> Result<(), StoreError>;

    async fn get_user_by_username(&self, username: &str)
    -> Result<Option<WebsiteUser>, StoreError>;

    async fn update_user(&self, user: &WebsiteUser) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EngravingStore: Send + Sync {
    async fn enqueue_engraving(&self, job: &EngravingJob) -> Result<(), StoreError>;

    async fn get_engraving(&self, id: &EngravingId) -> Result<Option<EngravingJob>, StoreError>;

    async fn list_engravings(&self) -> Result<Vec<EngravingJob>, StoreError>;

    async fn update_engraving(&self, job: &EngravingJob) -> Result<(), StoreError>;

    /// Claim the next claimable job (oldest first), marking it running.
    async fn claim_next_engraving(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<EngravingJob>, StoreError>;
}

/// Everything the service layer needs from one database.
#[async_trait]
pub trait DataStore:
    ItemStore + VendorStore + LotAnalyticsStore + NotificationStore + UserStore + EngravingStore
{
    /// Reset utility: truncate every table (cascade on the Postgres backend).
    async fn reset_all(&self) -> Result<(), StoreError>;
}
