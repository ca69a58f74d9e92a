//! Append-only per-item audit trail.
//!
//! Events are never updated or deleted. Ingestion from external systems
//! carries an `external_id`; the store treats a re-insert with a seen
//! `external_id` as a no-op so upstream retries stay idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use railtrace_core::{EventId, ItemUid};

/// One audit-trail entry for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvent {
    pub id: EventId,
    pub item_uid: ItemUid,
    /// Free-form event type, e.g. `status_changed`, `inspection.visual`.
    pub event_type: String,
    /// Structured payload supplied by the producer.
    pub payload: serde_json::Value,
    /// Idempotency key assigned by the producing system, if any.
    pub external_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ItemEvent {
    pub fn new(
        item_uid: ItemUid,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            item_uid,
            event_type: event_type.into(),
            payload,
            external_id: None,
            occurred_at,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }
}
