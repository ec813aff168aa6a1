//! Declarative YAML configuration
//!
//! Every section and field is optional and falls back to its default.
//!
//! # Example
//!
//! ```yaml
//! store:
//!   root: models
//!   format: json
//!
//! split:
//!   train_frac: 0.9
//!   test_size: 0.1
//!
//! features:
//!   exclude: [Job_Type]
//!
//! model:
//!   n_changepoints: 25
//!   weekly_seasonality: auto
//!   optimizer:
//!     lr: 0.05
//!     max_iters: 3000
//!
//! tracking:
//!   backend: log
//!
//! concurrency:
//!   lock_policy: block
//! ```

mod cli;
mod load;
mod schema;
mod validate;

pub use cli::{
    apply_overrides, parse_args, BatchArgs, Cli, Command, ConfigOverrides, OutputFormat,
    PredictArgs, TrainArgs, ValidateArgs,
};
pub use load::{load_config, parse_config};
pub use schema::{
    ConcurrencyConfig, FeatureConfig, PipelineConfig, SplitConfig, StandardizeConfig, StoreConfig,
    TrackingBackend, TrackingConfig,
};
pub use validate::{validate_config, ValidationError};
