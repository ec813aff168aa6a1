//! Integration tests for tracking sinks and their use by the pipeline

use std::path::Path;
use std::sync::{Arc, Mutex};

use arthya::config::{PipelineConfig, StoreConfig};
use arthya::data::DailyRecord;
use arthya::error::{Error, Result};
use arthya::pipeline::Pipeline;
use arthya::run::TrackedRun;
use arthya::tracking::{content_hash, InMemoryTracker, RunOutcome, TrackingSink};
use arthya::UserId;
use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

/// Sink whose every call fails
struct BrokenSink;

impl TrackingSink for BrokenSink {
    fn start_run(&mut self, _experiment: &str, _run_name: &str) -> Result<String> {
        Err(Error::Tracking("backend unreachable".to_string()))
    }

    fn log_param(&mut self, _run_id: &str, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Tracking("backend unreachable".to_string()))
    }

    fn log_metric(&mut self, _run_id: &str, _key: &str, _value: f64) -> Result<()> {
        Err(Error::Tracking("backend unreachable".to_string()))
    }

    fn log_artifact(&mut self, _run_id: &str, _path: &Path) -> Result<String> {
        Err(Error::Tracking("backend unreachable".to_string()))
    }

    fn end_run(&mut self, _run_id: &str, _outcome: RunOutcome) -> Result<()> {
        Err(Error::Tracking("backend unreachable".to_string()))
    }
}

fn records(days: usize) -> Vec<DailyRecord> {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    (0..days)
        .map(|i| DailyRecord {
            date: start + Duration::days(i as i64),
            category: if i % 2 == 0 { "ride" } else { "delivery" }.to_string(),
            daily_income: 700.0 + 15.0 * i as f64,
            daily_expenses: 120.0,
            hours_worked: Some(5.0),
            gas_price: None,
            is_holiday: false,
            job_type: None,
        })
        .collect()
}

fn config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.store = StoreConfig {
        root: root.to_path_buf(),
        ..StoreConfig::default()
    };
    config.model.optimizer.max_iters = 200;
    config
}

#[test]
fn test_tracking_sink_trait_objects() {
    fn assert_sink<S: TrackingSink>() {}
    assert_sink::<InMemoryTracker>();
    assert_sink::<Box<dyn TrackingSink>>();
}

#[test]
fn test_tracked_run_lifecycle() {
    let sink = Arc::new(Mutex::new(InMemoryTracker::new()));
    let mut run = TrackedRun::start(sink.clone(), "income-forecast", "user-1-train").unwrap();
    let run_id = run.run_id().to_string();

    run.log_param("train_frac", 0.9).unwrap();
    for (key, value) in [("train_mae", 0.21), ("val_mae", 0.34)] {
        run.log_metric(key, value).unwrap();
    }
    run.finish(RunOutcome::Succeeded).unwrap();

    let tracker = sink.lock().unwrap();
    let record = tracker.run(&run_id).unwrap();
    assert_eq!(record.experiment, "income-forecast");
    assert_eq!(record.params["train_frac"], "0.9");
    assert_eq!(record.metrics.len(), 2);
    assert_eq!(record.outcome, Some(RunOutcome::Succeeded));
}

#[test]
fn test_pipeline_logs_params_metrics_and_artifact() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(Mutex::new(InMemoryTracker::new()));
    let pipeline = Pipeline::with_shared_tracker(config(dir.path()), sink.clone()).unwrap();
    let user = UserId::new(17);

    let run = pipeline.train_records(user, &records(40)).unwrap();

    let tracker = sink.lock().unwrap();
    let ids = tracker.run_ids();
    assert_eq!(ids.len(), 1);
    let record = tracker.run(&ids[0]).unwrap();
    assert_eq!(record.name, "user-17-train");
    assert_eq!(record.params["user_id"], "17");
    assert_eq!(record.params["n_features"], run.feature_names.len().to_string());
    assert_eq!(record.params["features"], run.feature_names.join(","));
    assert_eq!(record.metrics["n_samples"], 40.0);
    assert!(record.metrics.contains_key("income_mean"));
    assert!(record.metrics.contains_key("income_std"));
    assert!(record.metrics.contains_key("train_rmse"));

    let (path, hash) = &record.artifacts[0];
    assert_eq!(Some(path), run.artifact_path.as_ref());
    assert_eq!(hash, &content_hash(&std::fs::read(path).unwrap()));
}

#[test]
fn test_broken_tracking_never_fails_a_fit() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(dir.path()), BrokenSink).unwrap();
    let user = UserId::new(2);

    let run = pipeline.train_records(user, &records(30)).unwrap();
    assert!(run.is_success());
    assert!(pipeline.store().exists(user));
}
