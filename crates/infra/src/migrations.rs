//! Imperative schema migrations.
//!
//! Statements run in order on every startup. Each is best-effort: a failure
//! (typically "already exists" for the post-hoc constraints) is logged and
//! skipped so the remaining statements still run.

use sqlx::PgPool;
use tracing::{info, warn};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        uid TEXT PRIMARY KEY,
        lot_no TEXT NOT NULL,
        component_type TEXT NOT NULL,
        vendor_id UUID NOT NULL,
        status TEXT NOT NULL,
        manufactured_at TIMESTAMPTZ NOT NULL,
        installed_at TIMESTAMPTZ,
        failed_at TIMESTAMPTZ,
        warranty_months INTEGER NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS items_lot_no_idx ON items (lot_no)",
    r#"
    CREATE TABLE IF NOT EXISTS item_events (
        id UUID PRIMARY KEY,
        item_uid TEXT NOT NULL REFERENCES items (uid) ON DELETE CASCADE,
        event_type TEXT NOT NULL,
        payload JSONB NOT NULL,
        external_id TEXT,
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS item_events_item_uid_idx ON item_events (item_uid)",
    // NULL external_ids never collide, so plain inserts are unaffected.
    "CREATE UNIQUE INDEX IF NOT EXISTS item_events_external_idx \
     ON item_events (item_uid, external_id)",
    r#"
    CREATE TABLE IF NOT EXISTS vendors (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lot_health (
        lot_no TEXT NOT NULL,
        total BIGINT NOT NULL,
        failed BIGINT NOT NULL,
        failure_rate DOUBLE PRECISION NOT NULL,
        risk_level TEXT NOT NULL,
        anomaly_score DOUBLE PRECISION NOT NULL,
        computed_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lot_quality (
        lot_no TEXT NOT NULL,
        total BIGINT NOT NULL,
        defective BIGINT NOT NULL,
        quality_score DOUBLE PRECISION NOT NULL,
        grade TEXT NOT NULL,
        computed_at TIMESTAMPTZ NOT NULL
    )
    "#,
    // Added after the tables shipped; fails harmlessly on re-run.
    "ALTER TABLE lot_health ADD CONSTRAINT lot_health_lot_no_key UNIQUE (lot_no)",
    "ALTER TABLE lot_quality ADD CONSTRAINT lot_quality_lot_no_key UNIQUE (lot_no)",
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id UUID PRIMARY KEY,
        notification_type TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        severity TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        item_uid TEXT,
        read BOOLEAN NOT NULL DEFAULT FALSE,
        dismissed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS notifications_unread_idx \
     ON notifications (created_at DESC) WHERE read = FALSE AND dismissed = FALSE",
    r#"
    CREATE TABLE IF NOT EXISTS website_users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_digest TEXT NOT NULL,
        role TEXT NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        last_login TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS engravings (
        id UUID PRIMARY KEY,
        item_uid TEXT NOT NULL,
        state TEXT NOT NULL,
        status JSONB NOT NULL,
        retry_policy JSONB NOT NULL,
        attempt INTEGER NOT NULL DEFAULT 0,
        checksum TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        scheduled_at TIMESTAMPTZ,
        history JSONB NOT NULL DEFAULT '[]'::jsonb
    )
    "#,
    "CREATE INDEX IF NOT EXISTS engravings_claim_idx ON engravings (state, created_at)",
];

/// Apply the schema. Never fails the caller; individual statement failures
/// are logged and skipped.
pub async fn apply(pool: &PgPool) {
    let mut applied = 0usize;
    for statement in STATEMENTS {
        match sqlx::query(statement).execute(pool).await {
            Ok(_) => applied += 1,
            Err(e) => {
                warn!(error = %e, "migration statement skipped");
            }
        }
    }
    info!(applied, total = STATEMENTS.len(), "schema migrations applied");
}
