//! # Arthya: per-user income forecasting
//!
//! Arthya forecasts a gig or freelance worker's near-future income from a
//! history of daily income, expenses and context signals (job category, fuel
//! price, unemployment rate, holidays).
//!
//! ## Architecture
//!
//! - **data**: Request validation, CSV loading and feature extraction
//! - **standardize**: Income standardization (`MuSigma`) and its inverse
//! - **encode**: Categorical/numeric feature encoding learned on training rows
//! - **model**: Additive trend + seasonality + regressor model, MAP fit
//! - **optim**: Adam and cosine learning-rate schedule used by the fit
//! - **eval**: Chronological splits and scoring
//! - **warm_start**: Parameters carried from a stored model into a refit
//! - **io**: Per-user artifact store (JSON, YAML formats)
//! - **pipeline**: Train, retrain, batch and predict flows with per-user locks
//! - **tracking** / **run**: Experiment tracking sinks
//! - **config**: Declarative YAML configuration and CLI arguments
//!
//! ## Example
//!
//! ```no_run
//! use arthya::config::PipelineConfig;
//! use arthya::data::load_records_csv;
//! use arthya::pipeline::Pipeline;
//! use arthya::tracking::LogTracker;
//! use arthya::UserId;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default(), LogTracker::new())?;
//! let records = load_records_csv("user_7.csv".as_ref())?;
//! let run = pipeline.train_records(UserId::new(7), &records)?;
//! println!("validation: {:?}", run.metrics.validation);
//!
//! let history = pipeline.features_from_records(&records)?;
//! let forecast = pipeline.forecast_days(UserId::new(7), &history, 14)?;
//! println!("next two weeks: {}", forecast.total());
//! # Ok::<(), arthya::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod encode;
pub mod eval;
pub mod io;
pub mod model;
pub mod optim;
pub mod pipeline;
pub mod run;
pub mod standardize;
pub mod tracking;
pub mod warm_start;

pub mod error;
pub mod ids;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use ids::UserId;
pub use pipeline::{IncomeForecast, Pipeline, TrainingRun};
pub use standardize::{MuSigma, SampleIncomeStats};
