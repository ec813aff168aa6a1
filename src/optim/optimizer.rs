//! Optimizer trait

use ndarray::Array1;

/// Trait for first-order minimizers over a flat parameter vector
pub trait Optimizer {
    /// Move `params` one step against `grad`
    fn step(&mut self, params: &mut Array1<f64>, grad: &Array1<f64>);

    /// Forget accumulated state (moments, step count)
    fn reset(&mut self);

    /// Get learning rate
    fn lr(&self) -> f64;

    /// Set learning rate
    fn set_lr(&mut self, lr: f64);
}
