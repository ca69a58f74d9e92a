//! Engraving queue consumer.
//!
//! Polls the store for the oldest claimable job, renders the marking and
//! records the outcome. Failures go through the job's retry policy; the
//! worker itself never dies on a handler error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use railtrace_core::ItemUid;

use crate::store::EngravingStore;

/// Renders a marking for an item and returns its checksum.
///
/// The production renderer drives the laser head; this seam exists so the
/// queue machinery is testable without hardware.
pub trait MarkingRenderer: Send + Sync + 'static {
    fn render(&self, uid: &ItemUid) -> Result<String, String>;
}

/// Default renderer: derives the marking checksum from the uid alone.
#[derive(Debug, Default, Clone)]
pub struct Sha256MarkingRenderer;

impl MarkingRenderer for Sha256MarkingRenderer {
    fn render(&self, uid: &ItemUid) -> Result<String, String> {
        let digest = Sha256::digest(uid.as_str().as_bytes());
        let mut out = String::with_capacity(64);
        for b in digest {
            out.push_str(&format!("{b:02x}"));
        }
        Ok(out)
    }
}

/// Handle to the running worker: trigger hook plus graceful shutdown.
#[derive(Debug)]
pub struct EngravingWorkerHandle {
    shutdown: watch::Sender<bool>,
    trigger: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl EngravingWorkerHandle {
    /// Wake the worker ahead of its next poll. Coalesced: a no-op while a
    /// wake-up is already queued.
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

/// Engraving worker configuration.
#[derive(Debug, Clone)]
pub struct EngravingWorker {
    pub poll_interval: Duration,
}

impl Default for EngravingWorker {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl EngravingWorker {
    pub fn spawn<S, R>(self, store: Arc<S>, renderer: R) -> EngravingWorkerHandle
    where
        S: EngravingStore + ?Sized + 'static,
        R: MarkingRenderer,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>(1);

        let join = tokio::spawn(worker_loop(
            self.poll_interval,
            store,
            renderer,
            shutdown_rx,
            trigger_rx,
        ));

        EngravingWorkerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        }
    }
}

async fn worker_loop<S, R>(
    poll_interval: Duration,
    store: Arc<S>,
    renderer: R,
    mut shutdown: watch::Receiver<bool>,
    mut trigger: mpsc::Receiver<()>,
) where
    S: EngravingStore + ?Sized + 'static,
    R: MarkingRenderer,
{
    info!("engraving worker started");
    loop {
        // Drain the queue, then wait for a trigger or the next poll tick.
        while drain_one(store.as_ref(), &renderer).await {}

        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = trigger.recv() => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
    info!("engraving worker stopped");
}

/// Claim and process at most one job. Returns true if a job was processed.
async fn drain_one<S, R>(store: &S, renderer: &R) -> bool
where
    S: EngravingStore + ?Sized,
    R: MarkingRenderer,
{
    let started = Utc::now();
    let mut job = match store.claim_next_engraving(started).await {
        Ok(Some(job)) => job,
        Ok(None) => return false,
        Err(e) => {
            warn!(error = %e, "engraving claim failed");
            return false;
        }
    };

    match renderer.render(&job.item_uid) {
        Ok(checksum) => {
            job.mark_completed(checksum, started, Utc::now());
        }
        Err(error) => {
            warn!(engraving = %job.id, error = %error, "engraving attempt failed");
            job.mark_failed(error, started, Utc::now());
        }
    }

    if let Err(e) = store.update_engraving(&job).await {
        warn!(engraving = %job.id, error = %e, "failed to persist engraving outcome");
    }
    true
}
