//! Risk tiers and derived row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categorical severity derived from a lot's failure rate.
///
/// Ordering is meaningful: a higher failure rate never maps to a lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Fixed thresholds: >= 0.5 Critical, >= 0.25 High, >= 0.1 Medium, else Low.
const CRITICAL_THRESHOLD: f64 = 0.5;
const HIGH_THRESHOLD: f64 = 0.25;
const MEDIUM_THRESHOLD: f64 = 0.1;

impl RiskLevel {
    pub fn from_failure_rate(rate: f64) -> Self {
        if rate >= CRITICAL_THRESHOLD {
            RiskLevel::Critical
        } else if rate >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if rate >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Levels that warrant an operator notification.
    pub fn is_alerting(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl core::str::FromStr for RiskLevel {
    type Err = railtrace_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(railtrace_core::DomainError::validation(format!(
                "unknown risk level: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter grade used by the quality view of the same aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
}

impl From<RiskLevel> for QualityGrade {
    fn from(value: RiskLevel) -> Self {
        match value {
            RiskLevel::Low => QualityGrade::A,
            RiskLevel::Medium => QualityGrade::B,
            RiskLevel::High => QualityGrade::C,
            RiskLevel::Critical => QualityGrade::D,
        }
    }
}

impl QualityGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::A => "A",
            QualityGrade::B => "B",
            QualityGrade::C => "C",
            QualityGrade::D => "D",
        }
    }
}

impl core::str::FromStr for QualityGrade {
    type Err = railtrace_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(QualityGrade::A),
            "B" => Ok(QualityGrade::B),
            "C" => Ok(QualityGrade::C),
            "D" => Ok(QualityGrade::D),
            other => Err(railtrace_core::DomainError::validation(format!(
                "unknown quality grade: {other}"
            ))),
        }
    }
}

/// Derived row: one per distinct `lot_no`. The aggregation job is the only
/// writer; `lot_no` is unique per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotHealthRow {
    pub lot_no: String,
    pub total: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub risk_level: RiskLevel,
    /// Z-score of this lot's failure rate against all lots in the run.
    pub anomaly_score: f64,
    pub computed_at: DateTime<Utc>,
}

/// Quality view of the same aggregation (kept as its own table in the
/// relational schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotQualityRow {
    pub lot_no: String,
    pub total: u64,
    pub defective: u64,
    pub quality_score: f64,
    pub grade: QualityGrade,
    pub computed_at: DateTime<Utc>,
}

impl From<&LotHealthRow> for LotQualityRow {
    fn from(row: &LotHealthRow) -> Self {
        Self {
            lot_no: row.lot_no.clone(),
            total: row.total,
            defective: row.failed,
            quality_score: 1.0 - row.failure_rate,
            grade: QualityGrade::from(row.risk_level),
            computed_at: row.computed_at,
        }
    }
}
