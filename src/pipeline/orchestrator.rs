//! Per-user train, retrain and predict flows

use super::locks::UserLocks;
use super::report::{IncomeForecast, RunKind, SampleCounts, TrainingRun};
use crate::config::PipelineConfig;
use crate::data::{
    columns, extract_features, load_records_csv, next_day_history, unemployment_rate, Column,
    ColumnValues, DailyRecord, FeatureFrame,
};
use crate::encode::FeaturePipeline;
use crate::error::{Error, Result};
use crate::eval::{ChronologicalSplit, EvaluationSeries, PartitionMetrics};
use crate::ids::UserId;
use crate::io::{ModelArtifact, ModelStore};
use crate::model::ForecastModel;
use crate::run::TrackedRun;
use crate::standardize::MuSigma;
use crate::tracking::{RunOutcome, TrackingSink};
use crate::warm_start::WarmStart;
use chrono::Duration;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Income forecasting pipeline over a per-user artifact store.
///
/// Shareable between threads: fits for different users run concurrently,
/// fits for the same user are serialized by [`UserLocks`].
pub struct Pipeline<S: TrackingSink> {
    config: PipelineConfig,
    store: ModelStore,
    locks: UserLocks,
    tracker: Arc<Mutex<S>>,
}

impl<S: TrackingSink> Pipeline<S> {
    /// Build a pipeline, validating `config` first
    pub fn new(config: PipelineConfig, tracker: S) -> Result<Self> {
        Self::with_shared_tracker(config, Arc::new(Mutex::new(tracker)))
    }

    /// Build a pipeline reporting to a sink the caller keeps a handle on
    pub fn with_shared_tracker(config: PipelineConfig, tracker: Arc<Mutex<S>>) -> Result<Self> {
        crate::config::validate_config(&config)?;
        Ok(Self {
            store: ModelStore::from_config(&config.store),
            config,
            locks: UserLocks::new(),
            tracker,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<Mutex<S>> {
        &self.tracker
    }

    pub fn locks(&self) -> &UserLocks {
        &self.locks
    }

    /// Features for raw records, using the configured extraction options
    pub fn features_from_records(&self, records: &[DailyRecord]) -> Result<FeatureFrame> {
        extract_features(records, &self.config.features)
    }

    /// Cold fit on `frame`, replacing any existing artifact for `user`
    pub fn train(&self, user: UserId, frame: &FeatureFrame) -> Result<TrainingRun> {
        into_result(self.run(user, RunKind::Train, Ok(frame.clone())))
    }

    pub fn train_records(&self, user: UserId, records: &[DailyRecord]) -> Result<TrainingRun> {
        let frame = self.features_from_records(records);
        into_result(self.run(user, RunKind::Train, frame))
    }

    /// Warm-started refit from the user's persisted artifact.
    ///
    /// The previous artifact stays in place unless the new fit succeeds and
    /// is fully written.
    pub fn retrain(&self, user: UserId, frame: &FeatureFrame) -> Result<TrainingRun> {
        into_result(self.run(user, RunKind::Retrain, Ok(frame.clone())))
    }

    pub fn retrain_records(&self, user: UserId, records: &[DailyRecord]) -> Result<TrainingRun> {
        let frame = self.features_from_records(records);
        into_result(self.run(user, RunKind::Retrain, frame))
    }

    /// Train every user from their raw-record CSV.
    ///
    /// Users are processed one after another; a failure is recorded in that
    /// user's run and never stops the batch.
    pub fn batch_train(&self, inputs: &BTreeMap<UserId, PathBuf>) -> BTreeMap<UserId, TrainingRun> {
        tracing::info!(users = inputs.len(), "starting batch training");
        let mut runs = BTreeMap::new();
        for (&user, path) in inputs {
            let frame = load_records_csv(path).and_then(|records| self.features_from_records(&records));
            let (run, _) = self.run(user, RunKind::Train, frame);
            runs.insert(user, run);
        }
        let failed = runs.values().filter(|r| !r.is_success()).count();
        tracing::info!(users = runs.len(), failed, "batch training finished");
        runs
    }

    /// Predict income for the rows of `frame` with the user's persisted model
    pub fn predict(&self, user: UserId, frame: &FeatureFrame) -> Result<IncomeForecast> {
        let artifact = self.store.load(user)?;
        self.predict_with(&artifact, frame)
    }

    /// Predict the `days` days following the last date of `history`.
    ///
    /// Future rows carry the last observed covariates forward, with the
    /// unemployment rate looked up for each new month and the holiday flag
    /// cleared. Income and expense history columns are rolled one day past
    /// the history and then held, since later incomes are not known.
    pub fn forecast_days(
        &self,
        user: UserId,
        history: &FeatureFrame,
        days: usize,
    ) -> Result<IncomeForecast> {
        if days == 0 {
            return Err(Error::invalid("days must be at least 1"));
        }
        let artifact = self.store.load(user)?;
        let future = future_frame(history, days)?;
        self.predict_with(&artifact, &future)
    }

    fn predict_with(&self, artifact: &ModelArtifact, frame: &FeatureFrame) -> Result<IncomeForecast> {
        let mut frame = frame.clone();
        frame.aggregate_duplicate_dates();
        let features = artifact.encoding.transform(&frame)?;
        let forecast = artifact.model.predict(frame.dates(), &features)?;
        tracing::info!(
            user = %artifact.user,
            version = artifact.version,
            rows = forecast.len(),
            "predicted income"
        );
        Ok(IncomeForecast::from_forecast(
            artifact.user,
            artifact.version,
            forecast,
            &artifact.mu_sigma,
            self.config.standardize.decimals,
        ))
    }

    /// Execute one run and report it. The run record is returned even when
    /// the fit failed, together with the error.
    fn run(
        &self,
        user: UserId,
        kind: RunKind,
        frame: Result<FeatureFrame>,
    ) -> (TrainingRun, Result<()>) {
        let mut run = TrainingRun::begin(user, kind);
        let outcome = frame.and_then(|frame| self.execute(&mut run, frame));
        run.finish(&outcome);

        match &outcome {
            Ok(()) => tracing::info!(
                user = %user,
                kind = %kind,
                version = ?run.artifact_version,
                "run succeeded"
            ),
            Err(e) => tracing::warn!(user = %user, kind = %kind, error = %e, "run failed"),
        }
        self.report(&run);
        (run, outcome)
    }

    fn execute(&self, run: &mut TrainingRun, mut frame: FeatureFrame) -> Result<()> {
        let user = run.user;
        let _guard = self
            .locks
            .acquire(user, self.config.concurrency.lock_policy)?;

        let (prior_version, warm) = match run.kind {
            RunKind::Retrain => {
                let prior = self.store.load(user)?;
                (Some(prior.version), Some(WarmStart::from_artifact(&prior)))
            }
            RunKind::Train => (self.existing_version(user), None),
        };

        frame.aggregate_duplicate_dates();

        let split = &self.config.split;
        let mut parts = ChronologicalSplit::new(&frame, split.train_frac, split.test_size)?;
        run.samples = SampleCounts {
            total: frame.len(),
            train: parts.train.len(),
            validation: parts.validation.len(),
            test: parts.test.len(),
        };
        tracing::info!(
            user = %user,
            train = parts.train.len(),
            validation = parts.validation.len(),
            test = parts.test.len(),
            "split history"
        );

        let mu_sigma = MuSigma::fit(parts.train.income())?;
        run.mu_sigma = Some(mu_sigma);
        for part in [&mut parts.train, &mut parts.validation, &mut parts.test] {
            let y = mu_sigma.transform_all(part.income());
            part.set_target(y)?;
        }

        let encoding = FeaturePipeline::new(&self.config.features).fit(&parts.train)?;
        run.feature_names = encoding.feature_names.clone();
        let train_features = encoding.transform(&parts.train)?;

        run.warm_started = warm.is_some();
        let model = ForecastModel::fit(
            parts.train.dates(),
            target(&parts.train)?,
            &train_features,
            &self.config.model,
            warm.as_ref(),
        )?;
        run.fit = Some(model.summary().clone());

        let artifact = ModelArtifact::new(
            user,
            prior_version.map_or(1, |v| v + 1),
            mu_sigma,
            encoding,
            model,
        );

        let (train, train_series) = score(&artifact, &parts.train)?;
        let (validation, val_series) = score(&artifact, &parts.validation)?;
        let (test, test_series) = score(&artifact, &parts.test)?;
        run.metrics.train = train;
        run.metrics.validation = validation;
        run.metrics.test = test;
        let mut series = train_series;
        series.extend(val_series);
        series.extend(test_series);
        run.series = series;

        let path = self.store.save(user, &artifact)?;
        run.artifact_path = Some(path);
        run.artifact_version = Some(artifact.version);
        Ok(())
    }

    /// Version of the artifact a cold train replaces, if one is readable
    fn existing_version(&self, user: UserId) -> Option<u64> {
        if !self.store.exists(user) {
            return None;
        }
        match self.store.load(user) {
            Ok(artifact) => Some(artifact.version),
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "existing artifact unreadable, restarting at version 1");
                None
            }
        }
    }

    /// Send a finished run to the tracking sink. Failures only warn.
    fn report(&self, run: &TrainingRun) {
        if let Err(e) = self.log_run(run) {
            tracing::warn!(user = %run.user, error = %e, "tracking failed");
        }
    }

    fn log_run(&self, run: &TrainingRun) -> Result<()> {
        let name = format!("user-{}-{}", run.user, run.kind);
        let mut tracked = TrackedRun::start(
            Arc::clone(&self.tracker),
            &self.config.tracking.experiment,
            &name,
        )?;

        tracked.log_param("user_id", run.user)?;
        tracked.log_param("kind", run.kind)?;
        tracked.log_param("train_frac", self.config.split.train_frac)?;
        tracked.log_param("test_size", self.config.split.test_size)?;
        tracked.log_param("n_features", run.feature_names.len())?;
        tracked.log_param("features", run.feature_names.join(","))?;
        tracked.log_param("warm_start", run.warm_started)?;

        tracked.log_metric("n_samples", run.samples.total as f64)?;
        tracked.log_metric("n_train", run.samples.train as f64)?;
        tracked.log_metric("n_validation", run.samples.validation as f64)?;
        tracked.log_metric("n_test", run.samples.test as f64)?;
        if let Some(ms) = run.mu_sigma {
            tracked.log_metric("income_mean", ms.mu)?;
            tracked.log_metric("income_std", ms.sigma)?;
        }
        let partitions = [
            ("train", run.metrics.train),
            ("val", run.metrics.validation),
            ("test", run.metrics.test),
        ];
        for (prefix, metrics) in partitions {
            let Some(m) = metrics else { continue };
            tracked.log_metric(&format!("{prefix}_mae"), m.mae)?;
            tracked.log_metric(&format!("{prefix}_rmse"), m.rmse)?;
            tracked.log_metric(&format!("{prefix}_accuracy"), m.accuracy)?;
            if let Some(r2) = m.r2 {
                tracked.log_metric(&format!("{prefix}_r2"), r2)?;
            }
        }
        if let Some(path) = &run.artifact_path {
            tracked.log_artifact(path)?;
        }

        let outcome = if run.is_success() {
            RunOutcome::Succeeded
        } else {
            RunOutcome::Failed
        };
        tracked.finish(outcome)
    }
}

impl<S: TrackingSink> std::fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

fn into_result((run, outcome): (TrainingRun, Result<()>)) -> Result<TrainingRun> {
    outcome.map(|()| run)
}

fn target(frame: &FeatureFrame) -> Result<&[f64]> {
    frame
        .target()
        .ok_or_else(|| Error::invalid("partition has no standardized target"))
}

/// Metrics and aligned series for one partition; empty partitions score `None`
fn score(
    artifact: &ModelArtifact,
    part: &FeatureFrame,
) -> Result<(Option<PartitionMetrics>, EvaluationSeries)> {
    if part.is_empty() {
        return Ok((None, EvaluationSeries::default()));
    }
    let features = artifact.encoding.transform(part)?;
    let predicted = artifact.model.predict(part.dates(), &features)?.yhat();
    let actual = target(part)?.to_vec();
    let metrics = PartitionMetrics::score(&predicted, &actual)?;
    let series = EvaluationSeries::new(part.dates().to_vec(), actual, predicted)?;
    Ok((metrics, series))
}

/// `days` rows after the last date of `history`, covariates carried forward
fn future_frame(history: &FeatureFrame, days: usize) -> Result<FeatureFrame> {
    let mut sorted = history.clone();
    sorted.aggregate_duplicate_dates();
    let last = sorted
        .last_row()
        .ok_or_else(|| Error::InsufficientData("history is empty".to_string()))?;
    let last_date = last.dates()[0];
    let ds: Vec<_> = (1..=days)
        .map(|i| last_date + Duration::days(i as i64))
        .collect();
    let rolled: BTreeMap<String, f64> = next_day_history(&sorted).into_iter().collect();

    let columns = last
        .columns()
        .iter()
        .map(|column| match (&column.values, column.name.as_str()) {
            (ColumnValues::Numeric(_), columns::UNEMPLOYMENT_RATE) => Column::numeric(
                column.name.clone(),
                ds.iter().map(|d| unemployment_rate(*d)).collect(),
            ),
            (ColumnValues::Numeric(_), columns::IS_HOLIDAY) => {
                Column::numeric(column.name.clone(), vec![0.0; days])
            }
            (ColumnValues::Numeric(v), name) => {
                let value = rolled.get(name).copied().unwrap_or(v[0]);
                Column::numeric(column.name.clone(), vec![value; days])
            }
            (ColumnValues::Categorical(v), _) => {
                Column::categorical(column.name.clone(), vec![v[0].clone(); days])
            }
        })
        .collect();

    FeatureFrame::new(ds, vec![0.0; days], columns)
}
