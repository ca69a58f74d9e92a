//! Engraving queue entities and retry policy.
//!
//! An engraving job renders a marking onto a component's QR identifier. The
//! queue keeps every attempt in the row's history, so the history table of
//! the relational schema is just a projection of terminal rows.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use railtrace_core::{EngravingId, ItemUid};

/// Engraving job status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngravingStatus {
    /// Queued, waiting to be picked up.
    Pending,
    /// Claimed by the worker.
    Running,
    /// Marking rendered.
    Completed,
    /// Failed, will be retried.
    Failed { error: String, attempt: u32 },
    /// Exhausted retries.
    DeadLettered { error: String, attempts: u32 },
    /// Cancelled before completion.
    Cancelled,
}

impl EngravingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngravingStatus::Completed
                | EngravingStatus::DeadLettered { .. }
                | EngravingStatus::Cancelled
        )
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, EngravingStatus::Failed { .. })
    }
}

/// Retry policy: exponential backoff, deterministic (no jitter), capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Delay before a given attempt number (1-indexed): base * 2^(n-1), capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exp = 1u64 << attempt.saturating_sub(1).min(20);
        Duration::from_millis(base_ms.saturating_mul(exp).min(max_ms))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Record of one engraving attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngravingAttempt {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

/// A queued engraving job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngravingJob {
    pub id: EngravingId,
    pub item_uid: ItemUid,
    pub status: EngravingStatus,
    pub retry_policy: RetryPolicy,
    /// Current attempt number (starts at 0).
    pub attempt: u32,
    /// Checksum of the rendered marking, set on completion.
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time the worker may (re)claim the job.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub history: Vec<EngravingAttempt>,
}

impl EngravingJob {
    pub fn new(item_uid: ItemUid, now: DateTime<Utc>) -> Self {
        Self {
            id: EngravingId::new(),
            item_uid,
            status: EngravingStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            checksum: None,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            history: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Whether the worker may claim the job now.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        let ready = match self.scheduled_at {
            Some(at) => now >= at,
            None => true,
        };
        ready
            && matches!(
                self.status,
                EngravingStatus::Pending | EngravingStatus::Failed { .. }
            )
    }

    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = EngravingStatus::Running;
        self.attempt += 1;
        self.updated_at = now;
    }

    pub fn mark_completed(&mut self, checksum: String, started_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = EngravingStatus::Completed;
        self.checksum = Some(checksum);
        self.updated_at = now;
        self.history.push(EngravingAttempt {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: true,
            error: None,
        });
    }

    pub fn mark_failed(&mut self, error: String, started_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.history.push(EngravingAttempt {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: false,
            error: Some(error.clone()),
        });

        if self.retry_policy.should_retry(self.attempt) {
            let delay = self.retry_policy.delay_for_attempt(self.attempt);
            self.scheduled_at =
                Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.status = EngravingStatus::Failed {
                error,
                attempt: self.attempt,
            };
        } else {
            self.status = EngravingStatus::DeadLettered {
                error,
                attempts: self.attempt,
            };
        }
    }

    /// Cancel a job that has not reached a terminal status. Returns false if
    /// it already had.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = EngravingStatus::Cancelled;
        self.updated_at = now;
        true
    }
}
