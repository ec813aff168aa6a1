//! Run records and forecast results returned by the pipeline

use crate::error::{Error, ErrorKind};
use crate::eval::{EvaluationSeries, PartitionMetrics};
use crate::ids::UserId;
use crate::model::{FitSummary, Forecast};
use crate::standardize::MuSigma;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Train,
    Retrain,
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunKind::Train => write!(f, "train"),
            RunKind::Retrain => write!(f, "retrain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed {
        error_kind: ErrorKind,
        message: String,
    },
}

impl RunStatus {
    pub fn failed(error: &Error) -> Self {
        RunStatus::Failed {
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }
}

/// Row counts per partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub total: usize,
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Scores on the standardized scale; `None` for an empty partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub train: Option<PartitionMetrics>,
    pub validation: Option<PartitionMetrics>,
    pub test: Option<PartitionMetrics>,
}

/// Record of one train or retrain call.
///
/// Filled in progressively; a failed run keeps whatever was known when the
/// error happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRun {
    pub user: UserId,
    pub kind: RunKind,
    #[serde(flatten)]
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub samples: SampleCounts,
    pub mu_sigma: Option<MuSigma>,
    pub feature_names: Vec<String>,
    pub metrics: RunMetrics,
    pub fit: Option<FitSummary>,
    pub warm_started: bool,
    pub artifact_path: Option<PathBuf>,
    pub artifact_version: Option<u64>,
    /// Train, validation and test rows in date order
    pub series: EvaluationSeries,
}

impl TrainingRun {
    pub(crate) fn begin(user: UserId, kind: RunKind) -> Self {
        Self {
            user,
            kind,
            status: RunStatus::Succeeded,
            started_at: Utc::now(),
            finished_at: None,
            samples: SampleCounts::default(),
            mu_sigma: None,
            feature_names: Vec::new(),
            metrics: RunMetrics::default(),
            fit: None,
            warm_started: false,
            artifact_path: None,
            artifact_version: None,
            series: EvaluationSeries::default(),
        }
    }

    pub(crate) fn finish(&mut self, outcome: &Result<(), Error>) {
        self.status = match outcome {
            Ok(()) => RunStatus::Succeeded,
            Err(e) => RunStatus::failed(e),
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            RunStatus::Succeeded => None,
            RunStatus::Failed { error_kind, .. } => Some(*error_kind),
        }
    }
}

/// One predicted day in income units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomePrediction {
    pub ds: NaiveDate,
    /// Rounded to the configured precision
    pub income: f64,
    pub income_lower: f64,
    pub income_upper: f64,
}

/// Prediction for a user, inverted with the persisted MuSigma
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeForecast {
    pub user: UserId,
    pub artifact_version: u64,
    pub predictions: Vec<IncomePrediction>,
    /// Standardized-scale forecast with its components
    pub standardized: Forecast,
}

impl IncomeForecast {
    pub(crate) fn from_forecast(
        user: UserId,
        artifact_version: u64,
        forecast: Forecast,
        mu_sigma: &MuSigma,
        decimals: i32,
    ) -> Self {
        let predictions = forecast
            .rows
            .iter()
            .map(|row| IncomePrediction {
                ds: row.ds,
                income: mu_sigma.inverse(row.yhat, decimals),
                income_lower: mu_sigma.inverse(row.yhat_lower, decimals),
                income_upper: mu_sigma.inverse(row.yhat_upper, decimals),
            })
            .collect();
        Self {
            user,
            artifact_version,
            predictions,
            standardized: forecast,
        }
    }

    pub fn incomes(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.income).collect()
    }

    /// Sum of the predicted incomes
    pub fn total(&self) -> f64 {
        self.predictions.iter().map(|p| p.income).sum()
    }
}
