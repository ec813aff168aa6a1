//! Additive decomposable forecasting model
//!
//! Piecewise-linear trend with changepoints, Fourier seasonality, holiday
//! indicators and linear regressors, fit by MAP estimation on the
//! standardized income target.

mod config;
mod design;
mod forecast;
mod forecaster;
mod objective;
mod params;

pub use config::{Holiday, ModelConfig, OptimizerConfig, SeasonalityToggle};
pub use design::{Component, DesignLayout, RegressorScaling, Seasonality, RESERVED_COLUMNS};
pub use forecast::{Forecast, ForecastRow};
pub use forecaster::{FitSummary, ForecastModel};
pub use params::{FitParams, PointParams};
