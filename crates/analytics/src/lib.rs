//! `railtrace-analytics` — deterministic lot health/quality aggregation.
//!
//! The job here is pure: it takes a snapshot of item rows and the previously
//! stored risk levels, and produces derived rows plus notification drafts.
//! Persistence (and its transaction) lives in the infra crate.

pub mod job;
pub mod risk;

pub use job::{AggregationJob, AggregationOutcome, JobSummary, LotItemRecord};
pub use risk::{LotHealthRow, LotQualityRow, QualityGrade, RiskLevel};
