//! Fitted parameters

use serde::{Deserialize, Serialize};

/// Fitted parameters stored as a list of draws.
///
/// A MAP fit produces exactly one draw; sampling back-ends would produce many.
/// Vectors are indexed `[draw][component]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    /// Base growth rate
    pub k: Vec<f64>,
    /// Offset
    pub m: Vec<f64>,
    /// Rate adjustments at each changepoint
    pub delta: Vec<Vec<f64>>,
    /// Observation noise scale
    pub sigma_obs: Vec<f64>,
    /// Coefficients of seasonal, holiday and regressor features
    pub beta: Vec<Vec<f64>>,
}

/// Single parameter set used for prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PointParams {
    pub k: f64,
    pub m: f64,
    pub delta: Vec<f64>,
    pub sigma_obs: f64,
    pub beta: Vec<f64>,
}

impl FitParams {
    pub fn single(point: PointParams) -> Self {
        Self {
            k: vec![point.k],
            m: vec![point.m],
            delta: vec![point.delta],
            sigma_obs: vec![point.sigma_obs],
            beta: vec![point.beta],
        }
    }

    pub fn n_draws(&self) -> usize {
        self.k.len()
    }

    /// The point value for one draw, the element-wise mean for several
    pub fn point_estimate(&self) -> PointParams {
        PointParams {
            k: mean(&self.k),
            m: mean(&self.m),
            delta: mean_vec(&self.delta),
            sigma_obs: mean(&self.sigma_obs),
            beta: mean_vec(&self.beta),
        }
    }
}

fn mean(draws: &[f64]) -> f64 {
    match draws {
        [] => 0.0,
        [only] => *only,
        _ => draws.iter().sum::<f64>() / draws.len() as f64,
    }
}

fn mean_vec(draws: &[Vec<f64>]) -> Vec<f64> {
    match draws {
        [] => Vec::new(),
        [only] => only.clone(),
        _ => {
            let width = draws.iter().map(Vec::len).min().unwrap_or(0);
            (0..width)
                .map(|j| draws.iter().map(|d| d[j]).sum::<f64>() / draws.len() as f64)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_single_draw_is_passthrough() {
        let point = PointParams {
            k: 0.3,
            m: -0.1,
            delta: vec![0.01, 0.02],
            sigma_obs: 0.4,
            beta: vec![1.5],
        };
        let params = FitParams::single(point.clone());
        assert_eq!(params.n_draws(), 1);
        assert_eq!(params.point_estimate(), point);
    }

    #[test]
    fn test_multiple_draws_average() {
        let params = FitParams {
            k: vec![1.0, 3.0],
            m: vec![0.0, 1.0],
            delta: vec![vec![0.0, 2.0], vec![2.0, 4.0]],
            sigma_obs: vec![0.5, 1.5],
            beta: vec![vec![-1.0], vec![1.0]],
        };
        let point = params.point_estimate();
        assert_abs_diff_eq!(point.k, 2.0);
        assert_abs_diff_eq!(point.m, 0.5);
        assert_eq!(point.delta, vec![1.0, 3.0]);
        assert_abs_diff_eq!(point.sigma_obs, 1.0);
        assert_eq!(point.beta, vec![0.0]);
    }
}
