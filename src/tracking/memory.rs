//! In-memory tracking backend

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::{content_hash, RunOutcome, TrackingSink};
use crate::error::{Error, Result};

/// Tracking backend that keeps every run in memory.
///
/// Artifacts are copied in and addressed by content hash, so a run record
/// stays valid even after the file on disk is replaced by a later retrain.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    runs: HashMap<String, RunRecord>,
    next_run_id: AtomicU64,
}

/// Everything one run reported
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub experiment: String,
    pub name: String,
    pub params: HashMap<String, String>,
    pub metrics: HashMap<String, f64>,
    /// (path, content hash) pairs in logging order
    pub artifacts: Vec<(PathBuf, String)>,
    pub outcome: Option<RunOutcome>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// Run ids in creation order
    pub fn run_ids(&self) -> Vec<String> {
        let mut ids: Vec<&String> = self.runs.keys().collect();
        ids.sort_by_key(|id| {
            id.strip_prefix("run-")
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(u64::MAX)
        });
        ids.into_iter().cloned().collect()
    }

    pub fn param(&self, run_id: &str, key: &str) -> Option<&str> {
        self.runs
            .get(run_id)
            .and_then(|r| r.params.get(key))
            .map(String::as_str)
    }

    pub fn metric(&self, run_id: &str, key: &str) -> Option<f64> {
        self.runs.get(run_id).and_then(|r| r.metrics.get(key)).copied()
    }

    fn open_run(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        let run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::Tracking(format!("run not found: {run_id}")))?;
        if run.outcome.is_some() {
            return Err(Error::Tracking(format!("run {run_id} has already ended")));
        }
        Ok(run)
    }
}

impl TrackingSink for InMemoryTracker {
    fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<String> {
        let id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let run_id = format!("run-{id}");
        self.runs.insert(
            run_id.clone(),
            RunRecord {
                experiment: experiment.to_string(),
                name: run_name.to_string(),
                params: HashMap::new(),
                metrics: HashMap::new(),
                artifacts: Vec::new(),
                outcome: None,
                started_at: Utc::now(),
                ended_at: None,
            },
        );
        Ok(run_id)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.open_run(run_id)?
            .params
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.open_run(run_id)?.metrics.insert(key.to_string(), value);
        Ok(())
    }

    fn log_artifact(&mut self, run_id: &str, path: &Path) -> Result<String> {
        self.open_run(run_id)?;
        let data = fs::read(path).map_err(|e| {
            Error::Tracking(format!("cannot read artifact {}: {e}", path.display()))
        })?;
        let hash = content_hash(&data);
        self.open_run(run_id)?
            .artifacts
            .push((path.to_path_buf(), hash.clone()));
        Ok(hash)
    }

    fn end_run(&mut self, run_id: &str, outcome: RunOutcome) -> Result<()> {
        let run = self.open_run(run_id)?;
        run.outcome = Some(outcome);
        run.ended_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_run_ids_are_sequential() {
        let mut tracker = InMemoryTracker::new();
        let a = tracker.start_run("exp", "a").unwrap();
        let b = tracker.start_run("exp", "b").unwrap();
        assert_eq!(a, "run-0");
        assert_eq!(b, "run-1");
        assert_eq!(tracker.run_ids(), vec![a, b]);
    }

    #[test]
    fn test_params_and_metrics_are_recorded() {
        let mut tracker = InMemoryTracker::new();
        let id = tracker.start_run("exp", "user-1").unwrap();
        tracker.log_param(&id, "warm_start", "false").unwrap();
        tracker.log_metric(&id, "train_mae", 0.25).unwrap();
        tracker.log_metric(&id, "train_mae", 0.2).unwrap();

        assert_eq!(tracker.param(&id, "warm_start"), Some("false"));
        assert_eq!(tracker.metric(&id, "train_mae"), Some(0.2));
        assert_eq!(tracker.run(&id).unwrap().name, "user-1");
    }

    #[test]
    fn test_unknown_run_is_tracking_error() {
        let mut tracker = InMemoryTracker::new();
        let err = tracker.log_metric("run-9", "x", 1.0).unwrap_err();
        assert!(matches!(err, Error::Tracking(_)));
    }

    #[test]
    fn test_ended_run_rejects_logging() {
        let mut tracker = InMemoryTracker::new();
        let id = tracker.start_run("exp", "r").unwrap();
        tracker.end_run(&id, RunOutcome::Succeeded).unwrap();

        assert!(tracker.log_param(&id, "k", "v").is_err());
        assert!(tracker.end_run(&id, RunOutcome::Failed).is_err());
        let run = tracker.run(&id).unwrap();
        assert_eq!(run.outcome, Some(RunOutcome::Succeeded));
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_artifact_hash_matches_content() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"version\": 1}").unwrap();

        let mut tracker = InMemoryTracker::new();
        let id = tracker.start_run("exp", "r").unwrap();
        let hash = tracker.log_artifact(&id, file.path()).unwrap();

        assert_eq!(hash, content_hash(b"{\"version\": 1}"));
        assert_eq!(tracker.run(&id).unwrap().artifacts.len(), 1);
    }

    #[test]
    fn test_missing_artifact_file_is_tracking_error() {
        let mut tracker = InMemoryTracker::new();
        let id = tracker.start_run("exp", "r").unwrap();
        let err = tracker
            .log_artifact(&id, Path::new("/no/such/model.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Tracking(_)));
    }
}
