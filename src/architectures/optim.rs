//! Optimizers and gradient utilities

use super::layers::Param;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Adam hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Adam with bias-corrected first and second moments.
///
/// Moment buffers are created lazily on the first step and matched to
/// parameters by position, so the parameter list must keep its order.
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    step: i32,
    m: Vec<Array2<f64>>,
    v: Vec<Array2<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self::with_config(AdamConfig {
            learning_rate,
            ..Default::default()
        })
    }

    pub fn with_config(config: AdamConfig) -> Self {
        Self {
            config,
            step: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    pub fn steps(&self) -> i32 {
        self.step
    }

    pub fn step(&mut self, params: Vec<&mut Param>) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|p| Array2::zeros(p.value.raw_dim())).collect();
            self.v = params.iter().map(|p| Array2::zeros(p.value.raw_dim())).collect();
        }

        self.step += 1;
        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;
        let bias1 = 1.0 - beta1.powi(self.step);
        let bias2 = 1.0 - beta2.powi(self.step);

        for ((param, m), v) in params.into_iter().zip(&mut self.m).zip(&mut self.v) {
            if param.grad.raw_dim() != param.value.raw_dim() {
                continue;
            }
            m.zip_mut_with(&param.grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            v.zip_mut_with(&param.grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

            let update = ndarray::Zip::from(&*m)
                .and(&*v)
                .map_collect(|&m, &v| learning_rate * (m / bias1) / ((v / bias2).sqrt() + epsilon));
            param.value -= &update;
        }
    }
}

/// Rescale gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(params: Vec<&mut Param>, max_norm: f64) -> f64 {
    let total = params
        .iter()
        .map(|p| p.grad.iter().map(|g| g * g).sum::<f64>())
        .sum::<f64>()
        .sqrt();

    let coef = max_norm / (total + 1e-6);
    if coef < 1.0 {
        for p in params {
            p.grad *= coef;
        }
    }
    total
}
