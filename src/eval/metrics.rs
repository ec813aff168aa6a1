//! Regression metrics on the standardized scale

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Trait for evaluation metrics
pub trait Metric {
    /// Compute the metric given predictions and targets
    fn compute(&self, predictions: &[f64], targets: &[f64]) -> Result<f64>;

    /// Name of the metric
    fn name(&self) -> &str;

    /// Whether higher values are better (true) or lower (false)
    fn higher_is_better(&self) -> bool {
        true
    }
}

fn check_lengths(predictions: &[f64], targets: &[f64]) -> Result<()> {
    if predictions.len() != targets.len() {
        return Err(Error::invalid(format!(
            "{} predictions for {} targets",
            predictions.len(),
            targets.len()
        )));
    }
    if predictions.is_empty() {
        return Err(Error::InsufficientData(
            "cannot score an empty partition".to_string(),
        ));
    }
    Ok(())
}

/// R² (coefficient of determination)
///
/// R² = 1 - SS_res / SS_tot
///
/// Undefined when the targets have no variance; reported as
/// [`Error::NumericInstability`] rather than a made-up value.
#[derive(Debug, Clone, Copy, Default)]
pub struct R2Score;

impl Metric for R2Score {
    fn compute(&self, predictions: &[f64], targets: &[f64]) -> Result<f64> {
        check_lengths(predictions, targets)?;

        let y_mean = targets.iter().sum::<f64>() / targets.len() as f64;
        let ss_res: f64 = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = targets.iter().map(|t| (t - y_mean).powi(2)).sum();

        if ss_tot <= f64::EPSILON * targets.len() as f64 {
            return Err(Error::NumericInstability(
                "R² is undefined for targets with zero variance".to_string(),
            ));
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    fn name(&self) -> &str {
        "r2"
    }
}

/// Mean Absolute Error
#[derive(Debug, Clone, Copy, Default)]
pub struct MAE;

impl Metric for MAE {
    fn compute(&self, predictions: &[f64], targets: &[f64]) -> Result<f64> {
        check_lengths(predictions, targets)?;
        Ok(predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / predictions.len() as f64)
    }

    fn name(&self) -> &str {
        "mae"
    }

    fn higher_is_better(&self) -> bool {
        false
    }
}

/// Root Mean Squared Error
#[derive(Debug, Clone, Copy, Default)]
pub struct RMSE;

impl Metric for RMSE {
    fn compute(&self, predictions: &[f64], targets: &[f64]) -> Result<f64> {
        check_lengths(predictions, targets)?;
        let mse = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / predictions.len() as f64;
        Ok(mse.sqrt())
    }

    fn name(&self) -> &str {
        "rmse"
    }

    fn higher_is_better(&self) -> bool {
        false
    }
}

/// Fraction of rows where the rounded prediction equals the rounded target.
///
/// Coarse sanity signal only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundedAccuracy;

impl Metric for RoundedAccuracy {
    fn compute(&self, predictions: &[f64], targets: &[f64]) -> Result<f64> {
        check_lengths(predictions, targets)?;
        let hits = predictions
            .iter()
            .zip(targets)
            .filter(|(p, t)| p.round() == t.round())
            .count();
        Ok(hits as f64 / predictions.len() as f64)
    }

    fn name(&self) -> &str {
        "accuracy"
    }
}

/// Scores of one partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionMetrics {
    pub rows: usize,
    pub mae: f64,
    pub rmse: f64,
    /// `None` when undefined (constant targets)
    pub r2: Option<f64>,
    pub accuracy: f64,
}

impl PartitionMetrics {
    /// Score a partition; `Ok(None)` for an empty one
    pub fn score(predictions: &[f64], targets: &[f64]) -> Result<Option<Self>> {
        if predictions.is_empty() && targets.is_empty() {
            return Ok(None);
        }
        let r2 = match R2Score.compute(predictions, targets) {
            Ok(value) => Some(value),
            Err(Error::NumericInstability(reason)) => {
                tracing::debug!(%reason, "r2 undefined for partition");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Some(Self {
            rows: targets.len(),
            mae: MAE.compute(predictions, targets)?,
            rmse: RMSE.compute(predictions, targets)?,
            r2,
            accuracy: RoundedAccuracy.compute(predictions, targets)?,
        }))
    }
}
