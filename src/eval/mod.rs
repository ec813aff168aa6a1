//! Chronological splitting and scoring

mod metrics;
mod series;
mod split;

pub use metrics::{Metric, PartitionMetrics, RoundedAccuracy, R2Score, MAE, RMSE};
pub use series::EvaluationSeries;
pub use split::{holdout_index, split_index, ChronologicalSplit};
