//! Adam optimizer

use super::Optimizer;
use ndarray::{Array1, Zip};

/// Adam optimizer (Adaptive Moment Estimation)
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u64,
    m: Option<Array1<f64>>, // First moment
    v: Option<Array1<f64>>, // Second moment
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: None,
            v: None,
        }
    }

    /// Create Adam with default parameters
    pub fn default_params(lr: f64) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    /// Number of steps taken since creation or the last reset
    pub fn steps(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut Array1<f64>, grad: &Array1<f64>) {
        let n = grad.len();
        if self.m.as_ref().map_or(true, |m| m.len() != n) {
            self.m = Some(Array1::zeros(n));
            self.v = Some(Array1::zeros(n));
            self.t = 0;
        }
        self.t += 1;

        // Bias correction folded into the step size
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        if let (Some(m), Some(v)) = (self.m.as_mut(), self.v.as_mut()) {
            Zip::from(params)
                .and(m)
                .and(v)
                .and(grad)
                .for_each(|p, m, v, &g| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    *p -= lr_t * *m / (v.sqrt() + eps);
                });
        }
    }

    fn reset(&mut self) {
        self.t = 0;
        self.m = None;
        self.v = None;
    }

    fn lr(&self) -> f64 {
        self.lr
    }

    fn set_lr(&mut self, lr: f64) {
        self.lr = lr;
    }
}
