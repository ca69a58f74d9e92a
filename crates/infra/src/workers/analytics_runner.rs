//! Periodic lot analytics runner.
//!
//! Runs the aggregation job on an interval, with a coalesced trigger hook so
//! the API can request an early run after bulk writes. Scheduled passes take
//! the same gate the HTTP `run_job` handlers lock, so a scheduled pass and an
//! on-demand run never write the derived tables concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::jobs::run_lot_job;
use crate::store::DataStore;

/// Handle for the running analytics loop.
#[derive(Debug)]
pub struct AnalyticsRunnerHandle {
    shutdown: watch::Sender<bool>,
    trigger: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl AnalyticsRunnerHandle {
    /// Request an early run. Coalesced: a no-op while one is already queued.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

/// Analytics runner configuration.
#[derive(Debug, Clone)]
pub struct AnalyticsRunner {
    pub interval: Duration,
}

impl Default for AnalyticsRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
        }
    }
}

impl AnalyticsRunner {
    /// `gate` serializes this runner against other `run_lot_job` callers.
    pub fn spawn(self, store: Arc<dyn DataStore>, gate: Arc<Mutex<()>>) -> AnalyticsRunnerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>(1);

        let join = tokio::spawn(runner_loop(self.interval, store, gate, shutdown_rx, trigger_rx));

        AnalyticsRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        }
    }
}

async fn runner_loop(
    interval: Duration,
    store: Arc<dyn DataStore>,
    gate: Arc<Mutex<()>>,
    mut shutdown: watch::Receiver<bool>,
    mut trigger: mpsc::Receiver<()>,
) {
    info!(interval_secs = interval.as_secs(), "analytics runner started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = trigger.recv() => {}
            _ = tokio::time::sleep(interval) => {}
        }
        if *shutdown.borrow() {
            break;
        }

        let _guard = gate.lock().await;
        if let Err(e) = run_lot_job(store.as_ref()).await {
            // A failed pass leaves the previous snapshot intact.
            warn!(error = %e, "scheduled lot aggregation failed");
        }
    }
    info!("analytics runner stopped");
}
