//! Synchronous entry point for the lot aggregation job.

use chrono::Utc;
use tracing::info;

use railtrace_analytics::{AggregationJob, JobSummary};

use crate::store::{DataStore, StoreError};

/// Run one aggregation pass over the current Items snapshot and persist the
/// result. Callers serialize invocations; the store apply is atomic either
/// way.
pub async fn run_lot_job(store: &dyn DataStore) -> Result<JobSummary, StoreError> {
    let items = store.lot_records().await?;
    let previous = store.current_risk_levels().await?;

    let now = Utc::now();
    let outcome = AggregationJob::new(items).with_previous(previous).run(now);
    store.apply_lot_outcome(&outcome, now).await?;

    let summary = outcome.summary();
    info!(
        lots = summary.lots,
        critical = summary.critical,
        high = summary.high,
        notifications = summary.notifications,
        "lot aggregation completed"
    );
    Ok(summary)
}
