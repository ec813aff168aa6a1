//! Model hyperparameters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a seasonal component is fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityToggle {
    /// Decide from the span and spacing of the training history
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Named set of dates that receive their own indicator feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub dates: Vec<NaiveDate>,
}

/// Settings of the MAP optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Starting Adam learning rate
    pub lr: f64,
    pub max_iters: usize,
    /// Final learning rate of the cosine schedule as a fraction of `lr`
    pub min_lr_ratio: f64,
    /// Stop once the largest gradient component falls below this
    pub grad_tol: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lr: 0.05,
            max_iters: 3000,
            min_lr_ratio: 0.001,
            grad_tol: 1e-6,
        }
    }
}

/// Additive forecasting model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints are placed
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,

    pub yearly_seasonality: SeasonalityToggle,
    pub yearly_order: usize,
    pub weekly_seasonality: SeasonalityToggle,
    pub weekly_order: usize,
    pub seasonality_prior_scale: f64,

    pub holidays: Vec<Holiday>,
    pub holidays_prior_scale: f64,

    pub regressor_prior_scale: f64,

    /// Coverage of the `yhat_lower`/`yhat_upper` band
    pub interval_width: f64,

    pub optimizer: OptimizerConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            yearly_seasonality: SeasonalityToggle::Auto,
            yearly_order: 10,
            weekly_seasonality: SeasonalityToggle::Auto,
            weekly_order: 3,
            seasonality_prior_scale: 10.0,
            holidays: Vec::new(),
            holidays_prior_scale: 10.0,
            regressor_prior_scale: 10.0,
            interval_width: 0.8,
            optimizer: OptimizerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.n_changepoints, 25);
        assert_eq!(config.yearly_order, 10);
        assert_eq!(config.weekly_order, 3);
        assert_eq!(config.interval_width, 0.8);
        assert_eq!(config.optimizer.lr, 0.05);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
n_changepoints: 5
weekly_seasonality: disabled
holidays:
  - name: diwali
    dates: [2024-11-01]
optimizer:
  max_iters: 100
"#;
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.n_changepoints, 5);
        assert_eq!(config.weekly_seasonality, SeasonalityToggle::Disabled);
        assert_eq!(config.yearly_seasonality, SeasonalityToggle::Auto);
        assert_eq!(config.holidays[0].name, "diwali");
        assert_eq!(config.optimizer.max_iters, 100);
        assert_eq!(config.optimizer.lr, 0.05);
    }
}
