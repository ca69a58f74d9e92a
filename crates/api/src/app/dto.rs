//! Request bodies and JSON mapping helpers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use railtrace_analytics::{LotHealthRow, LotQualityRow};
use railtrace_core::{NotificationId, VendorId};
use railtrace_engraving::{EngravingJob, EngravingStatus};
use railtrace_items::{ComponentType, Item, ItemEvent, ItemStatus};
use railtrace_notifications::Notification;
use railtrace_vendors::Vendor;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub uid: String,
    pub lot_no: String,
    pub component_type: ComponentType,
    pub vendor_id: VendorId,
    pub manufactured_at: Option<DateTime<Utc>>,
    pub warranty_months: u32,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: ItemStatus,
}

#[derive(Debug, Deserialize)]
pub struct AppendEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct PatchVendorRequest {
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationIdsRequest {
    pub ids: Vec<NotificationId>,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueEngravingRequest {
    pub item_uid: String,
}

pub fn item_to_json(item: &Item) -> Value {
    json!({
        "uid": item.uid.as_str(),
        "lot_no": item.lot_no,
        "component_type": item.component_type.as_str(),
        "vendor_id": item.vendor_id,
        "status": item.status.as_str(),
        "manufactured_at": item.manufactured_at,
        "installed_at": item.installed_at,
        "failed_at": item.failed_at,
        "warranty_months": item.warranty_months,
        "warranty_expires_at": item.warranty_expires_at(),
        "updated_at": item.updated_at,
    })
}

pub fn event_to_json(event: &ItemEvent) -> Value {
    json!({
        "id": event.id,
        "item_uid": event.item_uid.as_str(),
        "event_type": event.event_type,
        "payload": event.payload,
        "external_id": event.external_id,
        "occurred_at": event.occurred_at,
    })
}

pub fn vendor_to_json(vendor: &Vendor) -> Value {
    json!({
        "id": vendor.id,
        "name": vendor.name,
        "metadata": vendor.metadata,
        "active": vendor.active,
        "created_at": vendor.created_at,
        "updated_at": vendor.updated_at,
    })
}

pub fn lot_health_to_json(row: &LotHealthRow) -> Value {
    json!({
        "lot_no": row.lot_no,
        "total": row.total,
        "failed": row.failed,
        "failure_rate": row.failure_rate,
        "risk_level": row.risk_level.as_str(),
        "anomaly_score": row.anomaly_score,
        "computed_at": row.computed_at,
    })
}

pub fn lot_quality_to_json(row: &LotQualityRow) -> Value {
    json!({
        "lot_no": row.lot_no,
        "total": row.total,
        "defective": row.defective,
        "quality_score": row.quality_score,
        "grade": row.grade.as_str(),
        "computed_at": row.computed_at,
    })
}

pub fn notification_to_json(n: &Notification) -> Value {
    json!({
        "id": n.id,
        "notification_type": n.notification_type,
        "title": n.title,
        "message": n.message,
        "severity": n.severity.as_str(),
        "metadata": n.metadata,
        "item_uid": n.item_uid.as_ref().map(|u| u.as_str()),
        "read": n.read,
        "dismissed": n.dismissed,
        "created_at": n.created_at,
    })
}

pub fn engraving_to_json(job: &EngravingJob) -> Value {
    let (state, error) = match &job.status {
        EngravingStatus::Pending => ("pending", None),
        EngravingStatus::Running => ("running", None),
        EngravingStatus::Completed => ("completed", None),
        EngravingStatus::Failed { error, .. } => ("failed", Some(error.clone())),
        EngravingStatus::DeadLettered { error, .. } => ("dead_lettered", Some(error.clone())),
        EngravingStatus::Cancelled => ("cancelled", None),
    };
    json!({
        "id": job.id,
        "item_uid": job.item_uid.as_str(),
        "state": state,
        "error": error,
        "attempt": job.attempt,
        "checksum": job.checksum,
        "created_at": job.created_at,
        "updated_at": job.updated_at,
        "scheduled_at": job.scheduled_at,
        "attempts_recorded": job.history.len(),
    })
}
