//! Postgres backend (sqlx).
//!
//! Every trait method is a thin query; the analytics snapshot swap is the one
//! multi-statement path and runs inside a single transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use railtrace_analytics::{
    AggregationOutcome, LotHealthRow, LotItemRecord, LotQualityRow, QualityGrade, RiskLevel,
};
use railtrace_auth::{Role, WebsiteUser};
use railtrace_core::{EngravingId, EventId, ItemUid, NotificationId, UserId, VendorId};
use railtrace_engraving::{EngravingJob, EngravingStatus};
use railtrace_items::{Item, ItemEvent};
use railtrace_notifications::{Notification, NotificationDraft, Severity};
use railtrace_vendors::Vendor;

use super::{
    DataStore, EngravingStore, ItemStore, LotAnalyticsStore, NotificationStore, StoreError,
    UserStore, VendorStore,
};

/// Postgres implementation of every store trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn ser_err(e: impl core::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    Ok(Item {
        uid: ItemUid::new(row.try_get::<String, _>("uid")?).map_err(ser_err)?,
        lot_no: row.try_get("lot_no")?,
        component_type: row
            .try_get::<String, _>("component_type")?
            .parse()
            .map_err(ser_err)?,
        vendor_id: VendorId::from_uuid(row.try_get("vendor_id")?),
        status: row.try_get::<String, _>("status")?.parse().map_err(ser_err)?,
        manufactured_at: row.try_get("manufactured_at")?,
        installed_at: row.try_get("installed_at")?,
        failed_at: row.try_get("failed_at")?,
        warranty_months: row.try_get::<i32, _>("warranty_months")? as u32,
        updated_at: row.try_get("updated_at")?,
    })
}

fn vendor_from_row(row: &PgRow) -> Result<Vendor, StoreError> {
    let metadata: serde_json::Value = row.try_get("metadata")?;
    Ok(Vendor {
        id: VendorId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        metadata: serde_json::from_value(metadata)?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<ItemEvent, StoreError> {
    Ok(ItemEvent {
        id: EventId::from_uuid(row.try_get("id")?),
        item_uid: ItemUid::new(row.try_get::<String, _>("item_uid")?).map_err(ser_err)?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        external_id: row.try_get("external_id")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn health_from_row(row: &PgRow) -> Result<LotHealthRow, StoreError> {
    Ok(LotHealthRow {
        lot_no: row.try_get("lot_no")?,
        total: row.try_get::<i64, _>("total")? as u64,
        failed: row.try_get::<i64, _>("failed")? as u64,
        failure_rate: row.try_get("failure_rate")?,
        risk_level: row
            .try_get::<String, _>("risk_level")?
            .parse::<RiskLevel>()
            .map_err(ser_err)?,
        anomaly_score: row.try_get("anomaly_score")?,
        computed_at: row.try_get("computed_at")?,
    })
}

fn quality_from_row(row: &PgRow) -> Result<LotQualityRow, StoreError> {
    Ok(LotQualityRow {
        lot_no: row.try_get("lot_no")?,
        total: row.try_get::<i64, _>("total")? as u64,
        defective: row.try_get::<i64, _>("defective")? as u64,
        quality_score: row.try_get("quality_score")?,
        grade: row
            .try_get::<String, _>("grade")?
            .parse::<QualityGrade>()
            .map_err(ser_err)?,
        computed_at: row.try_get("computed_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification, StoreError> {
    let metadata: serde_json::Value = row.try_get("metadata")?;
    let item_uid: Option<String> = row.try_get("item_uid")?;
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get("id")?),
        notification_type: row.try_get("notification_type")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        severity: row
            .try_get::<String, _>("severity")?
            .parse::<Severity>()
            .map_err(ser_err)?,
        metadata: serde_json::from_value(metadata)?,
        item_uid: item_uid
            .map(ItemUid::new)
            .transpose()
            .map_err(ser_err)?,
        read: row.try_get("read")?,
        dismissed: row.try_get("dismissed")?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<WebsiteUser, StoreError> {
    Ok(WebsiteUser {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        password_digest: row.try_get("password_digest")?,
        role: row.try_get::<String, _>("role")?.parse::<Role>().map_err(ser_err)?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        last_login: row.try_get("last_login")?,
    })
}

/// Coarse state column derived from the status payload, used for claim
/// queries.
fn state_of(status: &EngravingStatus) -> &'static str {
    match status {
        EngravingStatus::Pending => "pending",
        EngravingStatus::Running => "running",
        EngravingStatus::Completed => "completed",
        EngravingStatus::Failed { .. } => "failed",
        EngravingStatus::DeadLettered { .. } => "dead_lettered",
        EngravingStatus::Cancelled => "cancelled",
    }
}

fn engraving_from_row(row: &PgRow) -> Result<EngravingJob, StoreError> {
    let status: serde_json::Value = row.try_get("status")?;
    let retry_policy: serde_json::Value = row.try_get("retry_policy")?;
    let history: serde_json::Value = row.try_get("history")?;
    Ok(EngravingJob {
        id: EngravingId::from_uuid(row.try_get("id")?),
        item_uid: ItemUid::new(row.try_get::<String, _>("item_uid")?).map_err(ser_err)?,
        status: serde_json::from_value(status)?,
        retry_policy: serde_json::from_value(retry_policy)?,
        attempt: row.try_get::<i32, _>("attempt")? as u32,
        checksum: row.try_get("checksum")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        scheduled_at: row.try_get("scheduled_at")?,
        history: serde_json::from_value(history)?,
    })
}

#[async_trait]
impl ItemStore for PgStore {
    async fn insert_item(&self, item: &Item) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO items (
                uid, lot_no, component_type, vendor_id, status,
                manufactured_at, installed_at, failed_at, warranty_months, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.uid.as_str())
        .bind(&item.lot_no)
        .bind(item.component_type.as_str())
        .bind(item.vendor_id.as_uuid())
        .bind(item.status.as_str())
        .bind(item.manufactured_at)
        .bind(item.installed_at)
        .bind(item.failed_at)
        .bind(item.warranty_months as i32)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get_item(&self, uid: &ItemUid) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query("SELECT * FROM items WHERE uid = $1")
            .bind(uid.as_str())
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self, lot_no: Option<&str>) -> Result<Vec<Item>, StoreError> {
        let rows = match lot_no {
            Some(lot) => {
                sqlx::query("SELECT * FROM items WHERE lot_no = $1 ORDER BY uid")
                    .bind(lot)
                    .fetch_all(&*self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM items ORDER BY uid")
                    .fetch_all(&*self.pool)
                    .await?
            }
        };
        rows.iter().map(item_from_row).collect()
    }

    async fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                lot_no = $2, component_type = $3, vendor_id = $4, status = $5,
                manufactured_at = $6, installed_at = $7, failed_at = $8,
                warranty_months = $9, updated_at = $10
            WHERE uid = $1
            "#,
        )
        .bind(item.uid.as_str())
        .bind(&item.lot_no)
        .bind(item.component_type.as_str())
        .bind(item.vendor_id.as_uuid())
        .bind(item.status.as_str())
        .bind(item.manufactured_at)
        .bind(item.installed_at)
        .bind(item.failed_at)
        .bind(item.warranty_months as i32)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn append_event(&self, event: &ItemEvent) -> Result<bool, StoreError> {
        // Rows with NULL external_id never conflict; producer-keyed rows do.
        let result = sqlx::query(
            r#"
            INSERT INTO item_events (id, item_uid, event_type, payload, external_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (item_uid, external_id) DO NOTHING
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.item_uid.as_str())
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(&event.external_id)
        .bind(event.occurred_at)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events(&self, uid: &ItemUid) -> Result<Vec<ItemEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM item_events WHERE item_uid = $1 ORDER BY occurred_at, id",
        )
        .bind(uid.as_str())
        .fetch_all(&*self.pool)
        .await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn lot_records(&self) -> Result<Vec<LotItemRecord>, StoreError> {
        let rows = sqlx::query("SELECT lot_no, status FROM items")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(LotItemRecord {
                    lot_no: row.try_get("lot_no")?,
                    status: row
                        .try_get::<String, _>("status")?
                        .parse()
                        .map_err(ser_err)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VendorStore for PgStore {
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO vendors (id, name, metadata, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(vendor.id.as_uuid())
        .bind(&vendor.name)
        .bind(serde_json::to_value(&vendor.metadata)?)
        .bind(vendor.active)
        .bind(vendor.created_at)
        .bind(vendor.updated_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>, StoreError> {
        let row = sqlx::query("SELECT * FROM vendors WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(vendor_from_row).transpose()
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>, StoreError> {
        let rows = sqlx::query("SELECT * FROM vendors ORDER BY name")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(vendor_from_row).collect()
    }

    async fn update_vendor(&self, vendor: &Vendor) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE vendors SET name = $2, metadata = $3, active = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(vendor.id.as_uuid())
        .bind(&vendor.name)
        .bind(serde_json::to_value(&vendor.metadata)?)
        .bind(vendor.active)
        .bind(vendor.updated_at)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LotAnalyticsStore for PgStore {
    async fn current_risk_levels(&self) -> Result<BTreeMap<String, RiskLevel>, StoreError> {
        let rows = sqlx::query("SELECT lot_no, risk_level FROM lot_health")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get::<String, _>("lot_no")?,
                    row.try_get::<String, _>("risk_level")?
                        .parse::<RiskLevel>()
                        .map_err(ser_err)?,
                ))
            })
            .collect()
    }

    async fn apply_lot_outcome(
        &self,
        outcome: &AggregationOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Single transaction: either the whole snapshot (rows, prunes and
        // notifications) lands, or none of it does.
        let mut tx = self.pool.begin().await?;

        let kept: Vec<String> = outcome
            .health_rows
            .iter()
            .map(|r| r.lot_no.clone())
            .collect();

        for row in &outcome.health_rows {
            sqlx::query(
                r#"
                INSERT INTO lot_health (
                    lot_no, total, failed, failure_rate, risk_level, anomaly_score, computed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (lot_no) DO UPDATE SET
                    total = EXCLUDED.total,
                    failed = EXCLUDED.failed,
                    failure_rate = EXCLUDED.failure_rate,
                    risk_level = EXCLUDED.risk_level,
                    anomaly_score = EXCLUDED.anomaly_score,
                    computed_at = EXCLUDED.computed_at
                "#,
            )
            .bind(&row.lot_no)
            .bind(row.total as i64)
            .bind(row.failed as i64)
            .bind(row.failure_rate)
            .bind(row.risk_level.as_str())
            .bind(row.anomaly_score)
            .bind(row.computed_at)
            .execute(&mut *tx)
            .await?;
        }

        for row in &outcome.quality_rows {
            sqlx::query(
                r#"
                INSERT INTO lot_quality (
                    lot_no, total, defective, quality_score, grade, computed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (lot_no) DO UPDATE SET
                    total = EXCLUDED.total,
                    defective = EXCLUDED.defective,
                    quality_score = EXCLUDED.quality_score,
                    grade = EXCLUDED.grade,
                    computed_at = EXCLUDED.computed_at
                "#,
            )
            .bind(&row.lot_no)
            .bind(row.total as i64)
            .bind(row.defective as i64)
            .bind(row.quality_score)
            .bind(row.grade.as_str())
            .bind(row.computed_at)
            .execute(&mut *tx)
            .await?;
        }

        // Prune lots that no longer exist in Items.
        sqlx::query("DELETE FROM lot_health WHERE lot_no <> ALL($1)")
            .bind(&kept)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM lot_quality WHERE lot_no <> ALL($1)")
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        for draft in &outcome.drafts {
            let n = draft.clone().into_notification(now);
            sqlx::query(
                r#"
                INSERT INTO notifications (
                    id, notification_type, title, message, severity, metadata,
                    item_uid, read, dismissed, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(n.id.as_uuid())
            .bind(&n.notification_type)
            .bind(&n.title)
            .bind(&n.message)
            .bind(n.severity.as_str())
            .bind(serde_json::to_value(&n.metadata)?)
            .bind(n.item_uid.as_ref().map(|u| u.as_str()))
            .bind(n.read)
            .bind(n.dismissed)
            .bind(n.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_lot_health(&self) -> Result<Vec<LotHealthRow>, StoreError> {
        let rows = sqlx::query("SELECT * FROM lot_health ORDER BY lot_no")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(health_from_row).collect()
    }

    async fn get_lot_health(&self, lot_no: &str) -> Result<Option<LotHealthRow>, StoreError> {
        let row = sqlx::query("SELECT * FROM lot_health WHERE lot_no = $1")
            .bind(lot_no)
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(health_from_row).transpose()
    }

    async fn list_lot_quality(&self) -> Result<Vec<LotQualityRow>, StoreError> {
        let rows = sqlx::query("SELECT * FROM lot_quality ORDER BY lot_no")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(quality_from_row).collect()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        draft: NotificationDraft,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let n = draft.into_notification(now);
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, notification_type, title, message, severity, metadata,
                item_uid, read, dismissed, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(n.id.as_uuid())
        .bind(&n.notification_type)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.severity.as_str())
        .bind(serde_json::to_value(&n.metadata)?)
        .bind(n.item_uid.as_ref().map(|u| u.as_str()))
        .bind(n.read)
        .bind(n.dismissed)
        .bind(n.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(n)
    }

    async fn list_notifications(&self, unread_only: bool) -> Result<Vec<Notification>, StoreError> {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE read = FALSE AND dismissed = FALSE \
             ORDER BY created_at DESC"
        } else {
            "SELECT * FROM notifications ORDER BY created_at DESC"
        };
        let rows = sqlx::query(sql).fetch_all(&*self.pool).await?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM notifications WHERE read = FALSE AND dismissed = FALSE",
        )
        .fetch_one(&*self.pool)
        .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }

    async fn mark_read(&self, ids: &[NotificationId]) -> Result<u64, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = ANY($1) AND read = FALSE")
                .bind(&ids)
                .execute(&*self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn dismiss(&self, ids: &[NotificationId]) -> Result<u64, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let result = sqlx::query(
            "UPDATE notifications SET dismissed = TRUE, read = TRUE \
             WHERE id = ANY($1) AND dismissed = FALSE",
        )
        .bind(&ids)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &WebsiteUser) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO website_users (
                id, username, password_digest, role, active, created_at, last_login
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.password_digest)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<WebsiteUser>, StoreError> {
        let row = sqlx::query("SELECT * FROM website_users WHERE username = $1")
            .bind(username)
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &WebsiteUser) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE website_users SET
                username = $2, password_digest = $3, role = $4, active = $5, last_login = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.password_digest)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.last_login)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl EngravingStore for PgStore {
    async fn enqueue_engraving(&self, job: &EngravingJob) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO engravings (
                id, item_uid, state, status, retry_policy, attempt, checksum,
                created_at, updated_at, scheduled_at, history
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.item_uid.as_str())
        .bind(state_of(&job.status))
        .bind(serde_json::to_value(&job.status)?)
        .bind(serde_json::to_value(&job.retry_policy)?)
        .bind(job.attempt as i32)
        .bind(&job.checksum)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.scheduled_at)
        .bind(serde_json::to_value(&job.history)?)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get_engraving(&self, id: &EngravingId) -> Result<Option<EngravingJob>, StoreError> {
        let row = sqlx::query("SELECT * FROM engravings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(engraving_from_row).transpose()
    }

    async fn list_engravings(&self) -> Result<Vec<EngravingJob>, StoreError> {
        let rows = sqlx::query("SELECT * FROM engravings ORDER BY created_at")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(engraving_from_row).collect()
    }

    async fn update_engraving(&self, job: &EngravingJob) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE engravings SET
                state = $2, status = $3, retry_policy = $4, attempt = $5, checksum = $6,
                updated_at = $7, scheduled_at = $8, history = $9
            WHERE id = $1
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(state_of(&job.status))
        .bind(serde_json::to_value(&job.status)?)
        .bind(serde_json::to_value(&job.retry_policy)?)
        .bind(job.attempt as i32)
        .bind(&job.checksum)
        .bind(job.updated_at)
        .bind(job.scheduled_at)
        .bind(serde_json::to_value(&job.history)?)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn claim_next_engraving(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<EngravingJob>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT * FROM engravings
            WHERE state IN ('pending', 'failed')
              AND (scheduled_at IS NULL OR scheduled_at <= $1)
            ORDER BY created_at
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let mut job = engraving_from_row(&row)?;
        job.mark_running(now);

        sqlx::query(
            "UPDATE engravings SET state = $2, status = $3, attempt = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(job.id.as_uuid())
        .bind(state_of(&job.status))
        .bind(serde_json::to_value(&job.status)?)
        .bind(job.attempt as i32)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(job))
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn reset_all(&self) -> Result<(), StoreError> {
        sqlx::query(
            "TRUNCATE items, item_events, vendors, lot_health, lot_quality, \
             notifications, website_users, engravings CASCADE",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}
