//! Pipeline orchestration
//!
//! Wires feature extraction, splitting, standardization, encoding, model
//! fitting, scoring and persistence into per-user train, retrain, batch and
//! predict flows, each reported to a tracking sink.

mod locks;
mod orchestrator;
mod report;

pub use locks::{LockPolicy, UserGuard, UserLocks};
pub use orchestrator::Pipeline;
pub use report::{
    IncomeForecast, IncomePrediction, RunKind, RunMetrics, RunStatus, SampleCounts, TrainingRun,
};
