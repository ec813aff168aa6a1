//! Tracking backend that writes runs to the log

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::{content_hash, RunOutcome, TrackingSink};
use crate::error::{Error, Result};

/// Emits every tracking call as a structured `tracing` event under the
/// `arthya::tracking` target.
#[derive(Debug, Default)]
pub struct LogTracker {
    open: HashSet<String>,
    next_run_id: u64,
}

impl LogTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, run_id: &str) -> Result<()> {
        if self.open.contains(run_id) {
            Ok(())
        } else {
            Err(Error::Tracking(format!("run not open: {run_id}")))
        }
    }
}

impl TrackingSink for LogTracker {
    fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<String> {
        let run_id = format!("{experiment}-{}", self.next_run_id);
        self.next_run_id += 1;
        self.open.insert(run_id.clone());
        tracing::info!(target: "arthya::tracking", run = %run_id, name = run_name, "run started");
        Ok(run_id)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.check(run_id)?;
        tracing::info!(target: "arthya::tracking", run = run_id, key, value, "param");
        Ok(())
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.check(run_id)?;
        tracing::info!(target: "arthya::tracking", run = run_id, key, value, "metric");
        Ok(())
    }

    fn log_artifact(&mut self, run_id: &str, path: &Path) -> Result<String> {
        self.check(run_id)?;
        let data = fs::read(path).map_err(|e| {
            Error::Tracking(format!("cannot read artifact {}: {e}", path.display()))
        })?;
        let hash = content_hash(&data);
        tracing::info!(
            target: "arthya::tracking",
            run = run_id,
            path = %path.display(),
            hash = %hash,
            "artifact"
        );
        Ok(hash)
    }

    fn end_run(&mut self, run_id: &str, outcome: RunOutcome) -> Result<()> {
        self.check(run_id)?;
        self.open.remove(run_id);
        tracing::info!(target: "arthya::tracking", run = run_id, %outcome, "run ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lifecycle() {
        let mut tracker = LogTracker::new();
        let id = tracker.start_run("income-forecast", "user-3").unwrap();
        assert_eq!(id, "income-forecast-0");
        tracker.log_param(&id, "user_id", "3").unwrap();
        tracker.log_metric(&id, "val_rmse", 0.4).unwrap();
        tracker.end_run(&id, RunOutcome::Succeeded).unwrap();

        assert!(tracker.log_metric(&id, "val_rmse", 0.4).is_err());
    }

    #[test]
    fn test_unknown_run_rejected() {
        let mut tracker = LogTracker::new();
        assert!(matches!(
            tracker.log_param("nope", "k", "v"),
            Err(Error::Tracking(_))
        ));
    }
}
