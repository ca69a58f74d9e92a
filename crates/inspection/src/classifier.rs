//! Mock defect classifier.
//!
//! There is no real model behind this endpoint. The classification is derived
//! from a SHA-256 digest of the image bytes: the same image always yields the
//! same answer (tests stay reproducible), while distinct images spread across
//! classes and confidences like a randomized mock would.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use railtrace_core::{DomainError, DomainResult};

/// Defect classes the mock can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectClass {
    NoDefect,
    SurfaceCrack,
    Corrosion,
    Deformation,
    MissingFastener,
}

impl DefectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectClass::NoDefect => "no_defect",
            DefectClass::SurfaceCrack => "surface_crack",
            DefectClass::Corrosion => "corrosion",
            DefectClass::Deformation => "deformation",
            DefectClass::MissingFastener => "missing_fastener",
        }
    }

    pub fn is_defect(&self) -> bool {
        !matches!(self, DefectClass::NoDefect)
    }
}

/// Result of a mock inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub defect_class: DefectClass,
    /// In `[0.5, 1.0)`.
    pub confidence: f64,
    /// True when the classification should raise an operator notification.
    pub alerting: bool,
}

/// Digest-derived mock classifier.
#[derive(Debug, Clone)]
pub struct MockDefectClassifier {
    /// Confidence at/above which a reported defect is alerting.
    alert_threshold: f64,
}

impl Default for MockDefectClassifier {
    fn default() -> Self {
        Self {
            alert_threshold: 0.75,
        }
    }
}

impl MockDefectClassifier {
    pub fn new(alert_threshold: f64) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&alert_threshold) {
            return Err(DomainError::validation(
                "alert_threshold must be within [0, 1]",
            ));
        }
        Ok(Self { alert_threshold })
    }

    pub fn classify(&self, image: &[u8]) -> DomainResult<Classification> {
        if image.is_empty() {
            return Err(DomainError::validation("image payload must not be empty"));
        }

        let digest = Sha256::digest(image);

        // Half of the space reports no defect; the rest spreads over classes.
        let defect_class = match digest[0] % 8 {
            0..=3 => DefectClass::NoDefect,
            4 => DefectClass::SurfaceCrack,
            5 => DefectClass::Corrosion,
            6 => DefectClass::Deformation,
            _ => DefectClass::MissingFastener,
        };

        // Two digest bytes give a confidence in [0.5, 1.0).
        let raw = u16::from_be_bytes([digest[1], digest[2]]) as f64 / (u16::MAX as f64 + 1.0);
        let confidence = 0.5 + raw / 2.0;

        let alerting = defect_class.is_defect() && confidence >= self.alert_threshold;

        Ok(Classification {
            defect_class,
            confidence,
            alerting,
        })
    }
}
