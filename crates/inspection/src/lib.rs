//! `railtrace-inspection` — mocked computer-vision defect classification.

pub mod classifier;

pub use classifier::{Classification, DefectClass, MockDefectClassifier};
