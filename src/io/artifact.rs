//! Persisted per-user model state

use crate::encode::FeatureEncoding;
use crate::ids::UserId;
use crate::model::ForecastModel;
use crate::standardize::MuSigma;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Layout version of [`ModelArtifact`]
pub const FORMAT_VERSION: u32 = 1;

/// Everything inference needs: the target scaling, the fitted encoding and
/// the fitted model. Immutable once written; a retrain writes a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub user: UserId,
    /// Starts at 1, incremented by every retrain
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub mu_sigma: MuSigma,
    pub encoding: FeatureEncoding,
    pub model: ForecastModel,
}

impl ModelArtifact {
    pub fn new(
        user: UserId,
        version: u64,
        mu_sigma: MuSigma,
        encoding: FeatureEncoding,
        model: ForecastModel,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            user,
            version,
            created_at: Utc::now(),
            mu_sigma,
            encoding,
            model,
        }
    }
}
