//! Learning rate schedulers

use super::Optimizer;
use std::f64::consts::PI;

/// Learning rate scheduler trait
pub trait LRScheduler {
    /// Get the current learning rate
    fn get_lr(&self) -> f64;

    /// Advance one optimizer iteration
    fn step(&mut self);
}

/// Cosine annealing from `lr_max` down to `lr_min` over `t_max` steps.
///
/// lr_t = lr_min + 0.5 * (lr_max - lr_min) * (1 + cos(π * t / T))
#[derive(Debug, Clone)]
pub struct CosineAnnealingLR {
    lr_max: f64,
    lr_min: f64,
    t_max: usize,
    current_step: usize,
}

impl CosineAnnealingLR {
    pub fn new(lr_max: f64, t_max: usize, lr_min: f64) -> Self {
        Self {
            lr_max,
            lr_min,
            t_max,
            current_step: 0,
        }
    }

    /// Scheduler whose floor is a fraction of the starting rate
    pub fn with_min_ratio(lr_max: f64, t_max: usize, min_ratio: f64) -> Self {
        Self::new(lr_max, t_max, lr_max * min_ratio)
    }

    /// Apply the current learning rate to an optimizer
    pub fn apply<O: Optimizer>(&self, optimizer: &mut O) {
        optimizer.set_lr(self.get_lr());
    }
}

impl LRScheduler for CosineAnnealingLR {
    fn get_lr(&self) -> f64 {
        if self.t_max == 0 || self.current_step >= self.t_max {
            return self.lr_min;
        }

        let progress = self.current_step as f64 / self.t_max as f64;
        let cosine_decay = 0.5 * (1.0 + (PI * progress).cos());
        self.lr_min + (self.lr_max - self.lr_min) * cosine_decay
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
