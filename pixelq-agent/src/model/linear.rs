//! A linear Q-function trained with SGD.
use super::{QFunction, QWeights};
use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};
use pixelq_core::Configurable;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`LinearQNet`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LinearQNetConfig {
    /// Number of input features (stacked frame elements).
    pub in_dim: usize,

    /// Number of discrete actions.
    pub out_dim: usize,

    /// SGD learning rate.
    pub learning_rate: f32,

    /// Seed for weight initialization.
    pub seed: u64,
}

impl Default for LinearQNetConfig {
    fn default() -> Self {
        Self {
            in_dim: 4 * 84 * 84,
            out_dim: 4,
            learning_rate: 1e-4,
            seed: 42,
        }
    }
}

impl LinearQNetConfig {
    /// Sets the number of input features.
    pub fn in_dim(mut self, v: usize) -> Self {
        self.in_dim = v;
        self
    }

    /// Sets the number of discrete actions.
    pub fn out_dim(mut self, v: usize) -> Self {
        self.out_dim = v;
        self
    }

    /// Sets the SGD learning rate.
    pub fn learning_rate(mut self, v: f32) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the seed for weight initialization.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }
}

/// A single linear layer `Q(s) = s W + b`, updated by plain SGD on the
/// masked mean-squared TD error.
///
/// This is the bundled reference implementation of [`QFunction`]. It stands
/// in for an external convolutional network in tests and demos; anything
/// that fulfills the [`QFunction`] contract can replace it.
pub struct LinearQNet {
    w: Array2<f32>,
    b: Array1<f32>,
    learning_rate: f32,
}

impl Configurable for LinearQNet {
    type Config = LinearQNetConfig;

    fn build(config: Self::Config) -> Self {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let bound = 1. / (config.in_dim as f32).sqrt();
        let w = Array2::from_shape_fn((config.in_dim, config.out_dim), |_| {
            rng.gen_range(-bound..bound)
        });
        let b = Array1::zeros(config.out_dim);

        Self {
            w,
            b,
            learning_rate: config.learning_rate,
        }
    }
}

impl QFunction for LinearQNet {
    fn num_actions(&self) -> usize {
        self.b.len()
    }

    fn forward(&self, obs: &Array2<f32>) -> Array2<f32> {
        obs.dot(&self.w) + &self.b
    }

    fn train_step(
        &mut self,
        obs: &Array2<f32>,
        targets: &Array1<f32>,
        action_masks: &Array2<f32>,
    ) -> f32 {
        let n = obs.nrows() as f32;
        let pred_all = self.forward(obs);
        let pred = (&pred_all * action_masks).sum_axis(Axis(1));
        let diff = &pred - targets;
        let loss = diff.mapv(|d| d * d).mean().unwrap_or(0.);

        // d(loss)/d(pred) back through the mask to the taken action only.
        let grad_pred = diff.mapv(|d| 2. * d / n);
        let grad_q = action_masks * &grad_pred.insert_axis(Axis(1));
        let grad_w = obs.t().dot(&grad_q);
        let grad_b = grad_q.sum_axis(Axis(0));

        self.w.scaled_add(-self.learning_rate, &grad_w);
        self.b.scaled_add(-self.learning_rate, &grad_b);

        loss
    }

    fn weights(&self) -> QWeights {
        QWeights {
            tensors: vec![
                ("w".to_string(), self.w.iter().cloned().collect()),
                ("b".to_string(), self.b.to_vec()),
            ],
        }
    }

    fn set_weights(&mut self, weights: &QWeights) -> Result<()> {
        // Validate before mutating anything; a sync is all-or-nothing.
        let mut w = None;
        let mut b = None;
        for (name, data) in weights.tensors.iter() {
            match name.as_str() {
                "w" if data.len() == self.w.len() => w = Some(data),
                "b" if data.len() == self.b.len() => b = Some(data),
                _ => bail!(
                    "Unexpected tensor {:?} with {} elements in weight snapshot",
                    name,
                    data.len()
                ),
            }
        }

        match (w, b) {
            (Some(w), Some(b)) => {
                self.w = Array2::from_shape_vec(self.w.raw_dim(), w.clone())?;
                self.b = Array1::from_vec(b.clone());
                Ok(())
            }
            _ => bail!("Weight snapshot misses tensors"),
        }
    }
}
