use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;

use railtrace_analytics::JobSummary;
use railtrace_auth::Hs256Jwt;
use railtrace_infra::store::memory::MemoryStore;
use railtrace_infra::store::postgres::PgStore;
use railtrace_infra::workers::{
    AnalyticsRunner, AnalyticsRunnerHandle, EngravingWorker, EngravingWorkerHandle,
    Sha256MarkingRenderer,
};
use railtrace_infra::{DataStore, StoreError, migrations, run_lot_job};
use railtrace_inspection::MockDefectClassifier;

/// Shared state behind every handler.
pub struct AppServices {
    pub store: Arc<dyn DataStore>,
    pub jwt: Arc<Hs256Jwt>,
    pub classifier: MockDefectClassifier,
    engraving: EngravingWorkerHandle,
    analytics: AnalyticsRunnerHandle,
    /// Serializes `run_job` invocations, including the scheduled runner's
    /// passes; the HTTP surface otherwise allows concurrent calls into the
    /// same derived tables.
    job_gate: Arc<Mutex<()>>,
}

impl AppServices {
    /// Wire services over an explicit store with default worker settings.
    pub fn with_store(store: Arc<dyn DataStore>, jwt_secret: impl AsRef<[u8]>) -> Self {
        Self::with_workers(
            store,
            jwt_secret,
            AnalyticsRunner::default(),
            EngravingWorker::default(),
        )
    }

    /// Wire services with explicit worker configs (tests shorten the
    /// analytics interval through this).
    pub fn with_workers(
        store: Arc<dyn DataStore>,
        jwt_secret: impl AsRef<[u8]>,
        analytics: AnalyticsRunner,
        engraving: EngravingWorker,
    ) -> Self {
        let job_gate = Arc::new(Mutex::new(()));
        let engraving = engraving.spawn(store.clone(), Sha256MarkingRenderer);
        let analytics = analytics.spawn(store.clone(), job_gate.clone());
        Self {
            store,
            jwt: Arc::new(Hs256Jwt::new(jwt_secret)),
            classifier: MockDefectClassifier::default(),
            engraving,
            analytics,
            job_gate,
        }
    }

    /// Run one aggregation pass, serialized across concurrent callers.
    pub async fn run_job(&self) -> Result<JobSummary, StoreError> {
        let _guard = self.job_gate.lock().await;
        run_lot_job(self.store.as_ref()).await
    }

    /// Wake the engraving worker ahead of its next poll.
    pub fn trigger_engraving(&self) {
        self.engraving.trigger();
    }

    /// Ask the analytics runner for an early pass (fire-and-forget).
    pub fn trigger_analytics(&self) {
        self.analytics.trigger();
    }
}

/// Backend selection: Postgres when `DATABASE_URL` is set, in-memory
/// otherwise (dev/test).
pub async fn build_services(jwt_secret: String) -> AppServices {
    let store: Arc<dyn DataStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to Postgres");
            migrations::apply(&pool).await;
            tracing::info!("using Postgres store");
            Arc::new(PgStore::new(pool))
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    AppServices::with_store(store, jwt_secret)
}
