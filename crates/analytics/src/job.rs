//! Lot aggregation job.
//!
//! Model:
//! - Group the full Items snapshot by `lot_no`.
//! - Per lot: total, failed, failure_rate = failed / total, risk tier from
//!   fixed thresholds.
//! - Anomaly score: z-score of the lot's failure rate against the sample
//!   mean/stddev of all lots in the same run (0.0 with fewer than two lots or
//!   a near-zero stddev).
//! - Notifications are drafted only for lots *transitioning into* an alerting
//!   tier relative to the previously stored rows, so re-running on unchanged
//!   data emits nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use railtrace_items::ItemStatus;
use railtrace_notifications::{NotificationDraft, Severity};

use crate::risk::{LotHealthRow, LotQualityRow, RiskLevel};

/// Minimal per-item input the job needs from the Items table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotItemRecord {
    pub lot_no: String,
    pub status: ItemStatus,
}

/// Everything a single run produces. Persisting it (atomically) is the
/// caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub health_rows: Vec<LotHealthRow>,
    pub quality_rows: Vec<LotQualityRow>,
    pub drafts: Vec<NotificationDraft>,
    /// Records skipped for malformed input (empty lot_no).
    pub skipped: u64,
}

impl AggregationOutcome {
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            lots: self.health_rows.len() as u64,
            critical: self
                .health_rows
                .iter()
                .filter(|r| r.risk_level == RiskLevel::Critical)
                .count() as u64,
            high: self
                .health_rows
                .iter()
                .filter(|r| r.risk_level == RiskLevel::High)
                .count() as u64,
            notifications: self.drafts.len() as u64,
        }
    }
}

/// Counts returned to the synchronous `run_job` caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub lots: u64,
    pub critical: u64,
    pub high: u64,
    pub notifications: u64,
}

/// Deterministic aggregation over an Items snapshot.
#[derive(Debug, Clone)]
pub struct AggregationJob {
    items: Vec<LotItemRecord>,
    /// Risk levels currently stored per lot, for transition detection.
    previous: BTreeMap<String, RiskLevel>,
}

impl AggregationJob {
    pub fn new(items: Vec<LotItemRecord>) -> Self {
        Self {
            items,
            previous: BTreeMap::new(),
        }
    }

    pub fn with_previous(mut self, previous: BTreeMap<String, RiskLevel>) -> Self {
        self.previous = previous;
        self
    }

    pub fn run(&self, now: DateTime<Utc>) -> AggregationOutcome {
        let mut counts: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        let mut skipped = 0u64;

        for rec in &self.items {
            if rec.lot_no.trim().is_empty() {
                // Malformed lot: skip, never abort the batch.
                skipped += 1;
                continue;
            }
            let entry = counts.entry(rec.lot_no.as_str()).or_insert((0, 0));
            entry.0 += 1;
            if rec.status == ItemStatus::Failed {
                entry.1 += 1;
            }
        }

        if skipped > 0 {
            warn!(skipped, "aggregation skipped records with empty lot_no");
        }

        let rates: Vec<f64> = counts
            .values()
            .map(|(total, failed)| *failed as f64 / *total as f64)
            .collect();
        let mean = mean(&rates);
        let std = stddev_sample(&rates, mean);

        let mut health_rows = Vec::with_capacity(counts.len());
        let mut drafts = Vec::new();

        for (lot_no, (total, failed)) in counts {
            let failure_rate = failed as f64 / total as f64;
            let risk_level = RiskLevel::from_failure_rate(failure_rate);
            let anomaly_score = if std <= f64::EPSILON {
                0.0
            } else {
                (failure_rate - mean) / std
            };

            let previous = self.previous.get(lot_no).copied();
            if risk_level.is_alerting() && previous.map_or(true, |p| !p.is_alerting()) {
                drafts.push(risk_draft(lot_no, total, failed, failure_rate, risk_level));
            }

            health_rows.push(LotHealthRow {
                lot_no: lot_no.to_string(),
                total,
                failed,
                failure_rate,
                risk_level,
                anomaly_score,
                computed_at: now,
            });
        }

        let quality_rows = health_rows.iter().map(LotQualityRow::from).collect();

        AggregationOutcome {
            health_rows,
            quality_rows,
            drafts,
            skipped,
        }
    }
}

fn risk_draft(
    lot_no: &str,
    total: u64,
    failed: u64,
    failure_rate: f64,
    risk_level: RiskLevel,
) -> NotificationDraft {
    let severity = match risk_level {
        RiskLevel::Critical => Severity::Critical,
        _ => Severity::Warning,
    };
    NotificationDraft::new(
        "lot.risk_level",
        format!("Lot {lot_no} is {risk_level}"),
        format!("{failed} of {total} components failed (failure rate {failure_rate:.2})"),
        severity,
    )
    .with_metadata(BTreeMap::from([
        ("lot_no".to_string(), json!(lot_no)),
        ("failure_rate".to_string(), json!(failure_rate)),
        ("risk_level".to_string(), json!(risk_level.as_str())),
    ]))
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1), deterministic.
fn stddev_sample(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(lot: &str, total: u64, failed: u64) -> Vec<LotItemRecord> {
        let mut out = Vec::new();
        for i in 0..total {
            out.push(LotItemRecord {
                lot_no: lot.to_string(),
                status: if i < failed {
                    ItemStatus::Failed
                } else {
                    ItemStatus::InService
                },
            });
        }
        out
    }

    #[test]
    fn failure_rate_is_failed_over_total() {
        let job = AggregationJob::new(records("L1", 10, 6));
        let out = job.run(Utc::now());
        assert_eq!(out.health_rows.len(), 1);
        let row = &out.health_rows[0];
        assert!((row.failure_rate - 0.6).abs() < 1e-9);
        assert_eq!(row.risk_level, RiskLevel::Critical);
        assert_eq!(row.total, 10);
        assert_eq!(row.failed, 6);
    }

    #[test]
    fn quality_view_mirrors_health() {
        let job = AggregationJob::new(records("L1", 4, 1));
        let out = job.run(Utc::now());
        let q = &out.quality_rows[0];
        assert_eq!(q.defective, 1);
        assert!((q.quality_score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_lot_no_is_skipped_not_fatal() {
        let mut items = records("L1", 3, 0);
        items.push(LotItemRecord {
            lot_no: "  ".to_string(),
            status: ItemStatus::Failed,
        });
        let out = AggregationJob::new(items).run(Utc::now());
        assert_eq!(out.skipped, 1);
        assert_eq!(out.health_rows.len(), 1);
        assert_eq!(out.health_rows[0].failed, 0);
    }

    #[test]
    fn notifies_on_transition_into_alerting() {
        let job = AggregationJob::new(records("L1", 10, 6));
        let out = job.run(Utc::now());
        assert_eq!(out.drafts.len(), 1);
        assert_eq!(out.drafts[0].severity, Severity::Critical);
        assert_eq!(out.drafts[0].notification_type, "lot.risk_level");
    }

    #[test]
    fn rerun_with_unchanged_items_is_idempotent() {
        let items = records("L1", 10, 6);
        let first = AggregationJob::new(items.clone()).run(Utc::now());

        let previous: BTreeMap<String, RiskLevel> = first
            .health_rows
            .iter()
            .map(|r| (r.lot_no.clone(), r.risk_level))
            .collect();

        let second = AggregationJob::new(items).with_previous(previous).run(Utc::now());
        assert_eq!(second.drafts.len(), 0, "no duplicate notifications");
        assert_eq!(
            first.health_rows[0].failure_rate,
            second.health_rows[0].failure_rate
        );
        assert_eq!(first.health_rows[0].risk_level, second.health_rows[0].risk_level);
    }

    #[test]
    fn no_notification_when_already_alerting() {
        let previous = BTreeMap::from([("L1".to_string(), RiskLevel::High)]);
        let out = AggregationJob::new(records("L1", 10, 6))
            .with_previous(previous)
            .run(Utc::now());
        // High -> Critical stays inside the alerting band; no new draft.
        assert!(out.drafts.is_empty());
    }

    #[test]
    fn anomaly_score_flags_the_outlier_lot() {
        let mut items = Vec::new();
        for lot in ["L1", "L2", "L3", "L4"] {
            items.extend(records(lot, 20, 0));
        }
        items.extend(records("L5", 20, 10));
        let out = AggregationJob::new(items).run(Utc::now());

        let l5 = out.health_rows.iter().find(|r| r.lot_no == "L5").unwrap();
        let l1 = out.health_rows.iter().find(|r| r.lot_no == "L1").unwrap();
        assert!(l5.anomaly_score > l1.anomaly_score);
        assert!(l5.anomaly_score > 1.0);
    }

    #[test]
    fn anomaly_score_zero_for_single_lot() {
        let out = AggregationJob::new(records("L1", 5, 2)).run(Utc::now());
        assert_eq!(out.health_rows[0].anomaly_score, 0.0);
    }

    #[test]
    fn summary_counts_tiers() {
        let mut items = records("L1", 10, 6); // critical
        items.extend(records("L2", 10, 3)); // high
        items.extend(records("L3", 10, 0)); // low
        let out = AggregationJob::new(items).run(Utc::now());
        let s = out.summary();
        assert_eq!(s.lots, 3);
        assert_eq!(s.critical, 1);
        assert_eq!(s.high, 1);
        assert_eq!(s.notifications, 2);
    }
}
