//! Income ↔ z-score standardization
//!
//! [`MuSigma`] uses the population convention (divide by N) and is the only
//! pair the forecasting pipeline fits or inverts with. [`SampleIncomeStats`]
//! carries the sample convention (divide by N−1) read from external stats files
//! and is deliberately a different type.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sigma values below this are replaced by 1.0
pub const SIGMA_FLOOR: f64 = 1e-9;

/// Default rounding applied by [`MuSigma::inverse`]: tens of currency units
pub const DEFAULT_DECIMALS: i32 = -1;

/// Mean and population standard deviation of raw income over one training partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuSigma {
    pub mu: f64,
    pub sigma: f64,
}

impl MuSigma {
    /// Build from known values, applying the sigma floor
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self {
            mu,
            sigma: floor_sigma(sigma),
        }
    }

    /// Fit on raw incomes
    pub fn fit(incomes: &[f64]) -> Result<Self> {
        if incomes.is_empty() {
            return Err(Error::InsufficientData(
                "cannot standardize an empty income series".to_string(),
            ));
        }
        if let Some(bad) = incomes.iter().find(|x| !x.is_finite()) {
            return Err(Error::NumericInstability(format!(
                "non-finite income value {bad}"
            )));
        }

        let n = incomes.len() as f64;
        let mu = incomes.iter().sum::<f64>() / n;
        let variance = incomes.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / n;
        let sigma = variance.sqrt();
        if sigma < SIGMA_FLOOR {
            tracing::warn!(mu, sigma, "income has no spread, using sigma = 1.0");
        }
        Ok(Self::new(mu, sigma))
    }

    /// y = (income − mu) / sigma
    pub fn transform(&self, income: f64) -> f64 {
        (income - self.mu) / floor_sigma(self.sigma)
    }

    pub fn transform_all(&self, incomes: &[f64]) -> Vec<f64> {
        incomes.iter().map(|&x| self.transform(x)).collect()
    }

    /// income = y · sigma + mu, unrounded
    pub fn inverse_raw(&self, y: f64) -> f64 {
        y * floor_sigma(self.sigma) + self.mu
    }

    /// Inverse rounded half away from zero to `decimals` places.
    ///
    /// Negative `decimals` round to tens, hundreds and so on.
    pub fn inverse(&self, y: f64, decimals: i32) -> f64 {
        round_to(self.inverse_raw(y), decimals)
    }
}

fn floor_sigma(sigma: f64) -> f64 {
    if sigma.is_finite() && sigma >= SIGMA_FLOOR {
        sigma
    } else {
        1.0
    }
}

/// Round half away from zero to `decimals` decimal places
pub fn round_to(x: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (x * scale).round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (x / scale).round() * scale
    }
}

/// Mean and sample standard deviation of an externally supplied income column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleIncomeStats {
    pub mean: f64,
    pub sample_std: f64,
}

impl SampleIncomeStats {
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "sample std needs at least 2 values, got {}",
                values.len()
            )));
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Ok(Self {
            mean,
            sample_std: variance.sqrt(),
        })
    }
}
