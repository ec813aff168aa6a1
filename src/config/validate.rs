//! Configuration validation

use super::schema::PipelineConfig;
use crate::error::Error;

/// A configuration value outside its accepted range
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid train_frac: {0} (must be in (0, 1])")]
    InvalidTrainFrac(f64),

    #[error("Invalid test_size: {0} (must be in [0, 1))")]
    InvalidTestSize(f64),

    #[error("Invalid changepoint_range: {0} (must be in (0, 1])")]
    InvalidChangepointRange(f64),

    #[error("Invalid interval_width: {0} (must be in (0, 1))")]
    InvalidIntervalWidth(f64),

    #[error("Invalid {name}: {value} (must be > 0.0)")]
    NonPositivePriorScale { name: &'static str, value: f64 },

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f64),

    #[error("Invalid max_iters: 0 (must be > 0)")]
    InvalidMaxIters,

    #[error("Invalid min_lr_ratio: {0} (must be in [0, 1])")]
    InvalidMinLrRatio(f64),

    #[error("Invalid {name}: 0 (must be > 0 when the seasonality can be enabled)")]
    InvalidFourierOrder { name: &'static str },

    #[error("Invalid default_gas_price: {0} (must be finite)")]
    InvalidGasPrice(f64),

    #[error("Holiday {0:?} has no dates")]
    EmptyHoliday(String),
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Validate a pipeline configuration
///
/// Checks split fractions, model priors and optimizer settings. Paths are
/// not checked; the store root is created on first save.
pub fn validate_config(config: &PipelineConfig) -> Result<(), ValidationError> {
    let split = &config.split;
    if !(split.train_frac > 0.0 && split.train_frac <= 1.0) {
        return Err(ValidationError::InvalidTrainFrac(split.train_frac));
    }
    if !(split.test_size >= 0.0 && split.test_size < 1.0) {
        return Err(ValidationError::InvalidTestSize(split.test_size));
    }

    if !config.features.default_gas_price.is_finite() {
        return Err(ValidationError::InvalidGasPrice(
            config.features.default_gas_price,
        ));
    }

    let model = &config.model;
    if !(model.changepoint_range > 0.0 && model.changepoint_range <= 1.0) {
        return Err(ValidationError::InvalidChangepointRange(
            model.changepoint_range,
        ));
    }
    if !(model.interval_width > 0.0 && model.interval_width < 1.0) {
        return Err(ValidationError::InvalidIntervalWidth(model.interval_width));
    }

    let scales = [
        ("changepoint_prior_scale", model.changepoint_prior_scale),
        ("seasonality_prior_scale", model.seasonality_prior_scale),
        ("holidays_prior_scale", model.holidays_prior_scale),
        ("regressor_prior_scale", model.regressor_prior_scale),
    ];
    for (name, value) in scales {
        if !(value > 0.0 && value.is_finite()) {
            return Err(ValidationError::NonPositivePriorScale { name, value });
        }
    }

    use crate::model::SeasonalityToggle::Disabled;
    if model.yearly_seasonality != Disabled && model.yearly_order == 0 {
        return Err(ValidationError::InvalidFourierOrder {
            name: "yearly_order",
        });
    }
    if model.weekly_seasonality != Disabled && model.weekly_order == 0 {
        return Err(ValidationError::InvalidFourierOrder {
            name: "weekly_order",
        });
    }

    if let Some(holiday) = model.holidays.iter().find(|h| h.dates.is_empty()) {
        return Err(ValidationError::EmptyHoliday(holiday.name.clone()));
    }

    let optim = &model.optimizer;
    if !(optim.lr > 0.0 && optim.lr.is_finite()) {
        return Err(ValidationError::InvalidLearningRate(optim.lr));
    }
    if optim.max_iters == 0 {
        return Err(ValidationError::InvalidMaxIters);
    }
    if !(0.0..=1.0).contains(&optim.min_lr_ratio) {
        return Err(ValidationError::InvalidMinLrRatio(optim.min_lr_ratio));
    }

    Ok(())
}
