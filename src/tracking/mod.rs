//! Experiment tracking sinks
//!
//! Every training run reports its parameters, metrics and the persisted
//! artifact to a [`TrackingSink`]. The pipeline only ever talks to the trait;
//! the concrete backend is picked from configuration.
//!
//! # Backends
//!
//! - [`LogTracker`]: emits every call as a `tracing` event
//! - [`InMemoryTracker`]: keeps runs in memory, used by tests and embedders
//! - [`NoopTracker`]: discards everything
//!
//! # Example
//!
//! ```
//! use arthya::tracking::{InMemoryTracker, RunOutcome, TrackingSink};
//!
//! let mut tracker = InMemoryTracker::new();
//! let run_id = tracker.start_run("income-forecast", "user-7").unwrap();
//! tracker.log_param(&run_id, "user_id", "7").unwrap();
//! tracker.log_metric(&run_id, "val_mae", 0.12).unwrap();
//! tracker.end_run(&run_id, RunOutcome::Succeeded).unwrap();
//! assert_eq!(tracker.metric(&run_id, "val_mae"), Some(0.12));
//! ```

pub mod log;
pub mod memory;

pub use log::LogTracker;
pub use memory::InMemoryTracker;

use crate::config::{TrackingBackend, TrackingConfig};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Final state reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "succeeded"),
            RunOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Destination for run parameters, metrics and artifacts.
///
/// Implementations report their own failures as [`crate::Error::Tracking`];
/// callers decide whether such a failure matters.
pub trait TrackingSink: Send {
    /// Open a run under `experiment` and return its id
    fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<String>;

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()>;

    /// Record a file produced by the run and return its content hash
    fn log_artifact(&mut self, run_id: &str, path: &Path) -> Result<String>;

    fn end_run(&mut self, run_id: &str, outcome: RunOutcome) -> Result<()>;
}

impl<T: TrackingSink + ?Sized> TrackingSink for Box<T> {
    fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<String> {
        (**self).start_run(experiment, run_name)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).log_param(run_id, key, value)
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        (**self).log_metric(run_id, key, value)
    }

    fn log_artifact(&mut self, run_id: &str, path: &Path) -> Result<String> {
        (**self).log_artifact(run_id, path)
    }

    fn end_run(&mut self, run_id: &str, outcome: RunOutcome) -> Result<()> {
        (**self).end_run(run_id, outcome)
    }
}

/// Sink used when tracking is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl TrackingSink for NoopTracker {
    fn start_run(&mut self, _experiment: &str, _run_name: &str) -> Result<String> {
        Ok(String::new())
    }

    fn log_param(&mut self, _run_id: &str, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn log_metric(&mut self, _run_id: &str, _key: &str, _value: f64) -> Result<()> {
        Ok(())
    }

    fn log_artifact(&mut self, _run_id: &str, _path: &Path) -> Result<String> {
        Ok(String::new())
    }

    fn end_run(&mut self, _run_id: &str, _outcome: RunOutcome) -> Result<()> {
        Ok(())
    }
}

/// Build the sink selected by `config`
pub fn sink_from_config(config: &TrackingConfig) -> Box<dyn TrackingSink> {
    match config.backend {
        TrackingBackend::Log => Box::new(LogTracker::new()),
        TrackingBackend::Memory => Box::new(InMemoryTracker::new()),
        TrackingBackend::Disabled => Box::new(NoopTracker),
    }
}

/// Content address of an artifact: `sha256-` followed by the first 16 digest bytes
pub fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("sha256-{}", hex::encode(&digest[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(b"model");
        let b = content_hash(b"model");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256-"));
        assert_eq!(a.len(), "sha256-".len() + 32);
        assert_ne!(a, content_hash(b"model2"));
    }

    #[test]
    fn test_noop_tracker_accepts_everything() {
        let mut sink = NoopTracker;
        let id = sink.start_run("exp", "run").unwrap();
        sink.log_param(&id, "k", "v").unwrap();
        sink.log_metric(&id, "m", 1.0).unwrap();
        sink.end_run(&id, RunOutcome::Failed).unwrap();
    }

    #[test]
    fn test_boxed_sink_delegates() {
        let config = TrackingConfig {
            backend: TrackingBackend::Memory,
            ..TrackingConfig::default()
        };
        let mut sink = sink_from_config(&config);
        let id = sink.start_run("exp", "run").unwrap();
        assert!(sink.log_metric(&id, "m", 1.0).is_ok());
        assert!(sink.log_metric("run-missing", "m", 1.0).is_err());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(RunOutcome::Succeeded.to_string(), "succeeded");
        assert_eq!(
            serde_json::to_string(&RunOutcome::Failed).unwrap(),
            "\"failed\""
        );
    }
}
