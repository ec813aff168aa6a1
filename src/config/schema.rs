//! YAML schema of the pipeline configuration

use crate::io::ArtifactFormat;
use crate::model::ModelConfig;
use crate::pipeline::LockPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete pipeline configuration; every section is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub split: SplitConfig,
    pub features: FeatureConfig,
    pub standardize: StandardizeConfig,
    pub model: ModelConfig,
    pub tracking: TrackingConfig,
    pub concurrency: ConcurrencyConfig,
}

/// Where and how model artifacts are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory holding one `user_<id>` folder per user
    pub root: PathBuf,
    pub format: ArtifactFormat,
    /// Pretty-print JSON artifacts
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models"),
            format: ArtifactFormat::Json,
            pretty: true,
        }
    }
}

/// Chronological partitioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of the non-test rows used for training, `0 < f ≤ 1`
    pub train_frac: f64,
    /// Fraction of all rows held out at the tail, `0 ≤ s < 1`
    pub test_size: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_frac: 0.9,
            test_size: 0.0,
        }
    }
}

/// Feature extraction and encoding options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Fuel price used when a record carries none
    pub default_gas_price: f64,
    /// Covariate columns left out of the encoding
    pub exclude: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            default_gas_price: 77.5,
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizeConfig {
    /// Rounding of predicted income; negative rounds to tens, hundreds...
    pub decimals: i32,
}

impl Default for StandardizeConfig {
    fn default() -> Self {
        Self {
            decimals: crate::standardize::DEFAULT_DECIMALS,
        }
    }
}

/// Tracking sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingBackend {
    /// Emit params and metrics as log events
    #[default]
    Log,
    /// Keep everything in memory
    Memory,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub backend: TrackingBackend,
    pub experiment: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            backend: TrackingBackend::Log,
            experiment: "income-forecast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub lock_policy: LockPolicy,
}
