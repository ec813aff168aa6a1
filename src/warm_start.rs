//! Continuity parameters carried from a persisted model into the next fit

use crate::io::ModelArtifact;
use crate::model::FitParams;
use serde::{Deserialize, Serialize};

/// Five named parameters used to seed a refit.
///
/// Each is the point value when the source had a single draw and the mean
/// over draws otherwise (element-wise for vectors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmStart {
    pub k: f64,
    pub m: f64,
    pub sigma_obs: f64,
    pub delta: Vec<f64>,
    pub beta: Vec<f64>,
}

impl WarmStart {
    pub fn from_params(params: &FitParams) -> Self {
        let point = params.point_estimate();
        Self {
            k: point.k,
            m: point.m,
            sigma_obs: point.sigma_obs,
            delta: point.delta,
            beta: point.beta,
        }
    }

    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        Self::from_params(artifact.model.params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_over_draws() {
        let params = FitParams {
            k: vec![0.2, 0.4, 0.6],
            m: vec![1.0, 1.0, 1.0],
            delta: vec![vec![0.0, 0.3], vec![0.3, 0.3], vec![0.6, 0.3]],
            sigma_obs: vec![0.1, 0.2, 0.3],
            beta: vec![vec![1.0], vec![2.0], vec![3.0]],
        };
        let warm = WarmStart::from_params(&params);
        assert_abs_diff_eq!(warm.k, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(warm.m, 1.0);
        assert_abs_diff_eq!(warm.sigma_obs, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(warm.delta[0], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(warm.delta[1], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(warm.beta[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_draw_passthrough() {
        let params = FitParams {
            k: vec![0.25],
            m: vec![-0.5],
            delta: vec![vec![0.01]],
            sigma_obs: vec![0.7],
            beta: vec![vec![]],
        };
        let warm = WarmStart::from_params(&params);
        assert_eq!(warm.k, 0.25);
        assert_eq!(warm.m, -0.5);
        assert_eq!(warm.delta, vec![0.01]);
        assert_eq!(warm.sigma_obs, 0.7);
        assert!(warm.beta.is_empty());
    }
}
