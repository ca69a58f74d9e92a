//! Background workers: engraving queue consumer and periodic lot analytics.

mod analytics_runner;
mod engraving_worker;

pub use analytics_runner::{AnalyticsRunner, AnalyticsRunnerHandle};
pub use engraving_worker::{
    EngravingWorker, EngravingWorkerHandle, MarkingRenderer, Sha256MarkingRenderer,
};
