//! Negative log posterior of the additive model and its gradient
//!
//! Parameter vector layout: `[k, m, delta.., beta.., ln sigma]`.
//!
//! ```text
//! f   = k·t + m + B·delta + X·beta
//! NLP = n·ln σ + Σr²/(2σ²) + k²/50 + m²/50 + Σ|delta|/τ + σ²/(2·0.5²) + Σ beta²/(2s²)
//! ```

use super::design::Design;
use super::params::PointParams;
use ndarray::{s, Array1, ArrayView1};

/// Std of the Normal priors on `k` and `m`
const TREND_PRIOR_STD: f64 = 5.0;
/// Scale of the half-normal prior on the noise scale
const SIGMA_PRIOR_SCALE: f64 = 0.5;
/// Bounds on ln σ during optimization
const LOG_SIGMA_RANGE: (f64, f64) = (-10.0, 5.0);

/// Objective over a fixed design and scaled target
pub struct Objective<'a> {
    design: &'a Design,
    y: ArrayView1<'a, f64>,
    /// Laplace scale of the changepoint prior
    tau: f64,
}

impl<'a> Objective<'a> {
    pub fn new(design: &'a Design, y: ArrayView1<'a, f64>, tau: f64) -> Self {
        Self { design, y, tau }
    }

    fn n_delta(&self) -> usize {
        self.design.changepoint_basis.ncols()
    }

    fn n_beta(&self) -> usize {
        self.design.features.ncols()
    }

    pub fn dim(&self) -> usize {
        3 + self.n_delta() + self.n_beta()
    }

    pub fn pack(&self, point: &PointParams) -> Array1<f64> {
        let mut theta = Array1::<f64>::zeros(self.dim());
        theta[0] = point.k;
        theta[1] = point.m;
        let d = self.n_delta();
        theta
            .slice_mut(s![2..2 + d])
            .assign(&ArrayView1::from(&point.delta[..]));
        theta
            .slice_mut(s![2 + d..2 + d + self.n_beta()])
            .assign(&ArrayView1::from(&point.beta[..]));
        theta[self.dim() - 1] = point.sigma_obs.ln();
        self.project(&mut theta);
        theta
    }

    pub fn unpack(&self, theta: &Array1<f64>) -> PointParams {
        let d = self.n_delta();
        PointParams {
            k: theta[0],
            m: theta[1],
            delta: theta.slice(s![2..2 + d]).to_vec(),
            beta: theta.slice(s![2 + d..2 + d + self.n_beta()]).to_vec(),
            sigma_obs: theta[self.dim() - 1].exp(),
        }
    }

    /// Keep ln σ inside its bounds
    pub fn project(&self, theta: &mut Array1<f64>) {
        let last = self.dim() - 1;
        theta[last] = theta[last].clamp(LOG_SIGMA_RANGE.0, LOG_SIGMA_RANGE.1);
    }

    /// Model mean on the scaled target
    pub fn mean(&self, theta: &Array1<f64>) -> Array1<f64> {
        let d = self.n_delta();
        let delta = theta.slice(s![2..2 + d]);
        let beta = theta.slice(s![2 + d..2 + d + self.n_beta()]);
        &self.design.t * theta[0]
            + theta[1]
            + self.design.changepoint_basis.dot(&delta)
            + self.design.features.dot(&beta)
    }

    /// Negative log posterior and its gradient at `theta`
    pub fn value_and_grad(&self, theta: &Array1<f64>) -> (f64, Array1<f64>) {
        let d = self.n_delta();
        let b = self.n_beta();
        let n = self.y.len() as f64;

        let k = theta[0];
        let m = theta[1];
        let delta = theta.slice(s![2..2 + d]);
        let beta = theta.slice(s![2 + d..2 + d + b]);
        let ls = theta[self.dim() - 1];
        let sigma2 = (2.0 * ls).exp();

        let residual = &self.y - &self.mean(theta);
        let rss = residual.dot(&residual);
        let trend_var = TREND_PRIOR_STD * TREND_PRIOR_STD;
        let sigma_prior_var = SIGMA_PRIOR_SCALE * SIGMA_PRIOR_SCALE;
        let beta_var = self.design.prior_scales.mapv(|s| s * s);

        let value = n * ls
            + rss / (2.0 * sigma2)
            + k * k / (2.0 * trend_var)
            + m * m / (2.0 * trend_var)
            + delta.iter().map(|x| x.abs()).sum::<f64>() / self.tau
            + sigma2 / (2.0 * sigma_prior_var)
            + (&beta * &beta / &beta_var).sum() / 2.0;

        let scaled = &residual / sigma2;
        let mut grad = Array1::<f64>::zeros(self.dim());
        grad[0] = -scaled.dot(&self.design.t) + k / trend_var;
        grad[1] = -scaled.sum() + m / trend_var;
        let g_delta = -self.design.changepoint_basis.t().dot(&scaled)
            + delta.mapv(|x| sign(x) / self.tau);
        grad.slice_mut(s![2..2 + d]).assign(&g_delta);
        let g_beta = -self.design.features.t().dot(&scaled) + &beta / &beta_var;
        grad.slice_mut(s![2 + d..2 + d + b]).assign(&g_beta);
        grad[self.dim() - 1] = n - rss / sigma2 + sigma2 / sigma_prior_var;

        (value, grad)
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}
