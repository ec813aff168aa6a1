//! Tracked runs over a shared sink
//!
//! A [`TrackedRun`] owns one run id on a sink shared between all pipeline
//! calls. The sink sits behind `Arc<Mutex<_>>` so different users can train
//! concurrently while reporting to the same backend.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use arthya::run::TrackedRun;
//! use arthya::tracking::{InMemoryTracker, RunOutcome};
//!
//! let sink = Arc::new(Mutex::new(InMemoryTracker::new()));
//! let mut run = TrackedRun::start(sink.clone(), "income-forecast", "user-1").unwrap();
//! run.log_param("user_id", "1").unwrap();
//! run.log_metric("train_mae", 0.3).unwrap();
//! run.finish(RunOutcome::Succeeded).unwrap();
//!
//! assert_eq!(sink.lock().unwrap().run_count(), 1);
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::tracking::{RunOutcome, TrackingSink};

/// One open run on a shared tracking sink
pub struct TrackedRun<S: TrackingSink> {
    id: String,
    sink: Arc<Mutex<S>>,
    finished: bool,
}

impl<S: TrackingSink> TrackedRun<S> {
    /// Open a run named `run_name` under `experiment`
    pub fn start(sink: Arc<Mutex<S>>, experiment: &str, run_name: &str) -> Result<Self> {
        let id = lock(&sink)?.start_run(experiment, run_name)?;
        Ok(Self {
            id,
            sink,
            finished: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn log_param(&mut self, key: &str, value: impl ToString) -> Result<()> {
        self.ensure_open()?;
        lock(&self.sink)?.log_param(&self.id, key, &value.to_string())
    }

    pub fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        self.ensure_open()?;
        lock(&self.sink)?.log_metric(&self.id, key, value)
    }

    pub fn log_artifact(&mut self, path: &Path) -> Result<String> {
        self.ensure_open()?;
        lock(&self.sink)?.log_artifact(&self.id, path)
    }

    /// End the run. Consumes the run so nothing can be logged afterwards.
    pub fn finish(mut self, outcome: RunOutcome) -> Result<()> {
        self.finished = true;
        let ended = lock(&self.sink)?.end_run(&self.id, outcome);
        ended
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(Error::Tracking(format!("run {} already finished", self.id)))
        } else {
            Ok(())
        }
    }
}

impl<S: TrackingSink> Drop for TrackedRun<S> {
    fn drop(&mut self) {
        // A run abandoned mid-way (early return, panic) is closed as failed
        if !self.finished {
            self.finished = true;
            if let Ok(mut sink) = self.sink.lock() {
                if let Err(e) = sink.end_run(&self.id, RunOutcome::Failed) {
                    tracing::warn!(run = %self.id, error = %e, "could not close abandoned run");
                }
            }
        }
    }
}

impl<S: TrackingSink> std::fmt::Debug for TrackedRun<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedRun")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn lock<S>(sink: &Mutex<S>) -> Result<MutexGuard<'_, S>> {
    sink.lock()
        .map_err(|_| Error::Tracking("tracking sink lock poisoned".to_string()))
}
