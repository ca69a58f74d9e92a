//! `railtrace-engraving` — background rendering of QR markings.

pub mod queue;

pub use queue::{
    EngravingAttempt, EngravingJob, EngravingStatus, RetryPolicy,
};
