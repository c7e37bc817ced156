//! Configuration of [`DoubleDqn`](super::DoubleDqn).
use super::EpsilonGreedy;
use anyhow::Result;
use pixelq_core::error::PixelqError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`DoubleDqn`](super::DoubleDqn).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DoubleDqnConfig {
    /// Number of transitions per sampled batch.
    pub batch_size: usize,

    /// Minimum number of stored transitions before optimization starts.
    pub min_transitions_warmup: usize,

    /// Discount factor gamma.
    pub discount_factor: f32,

    /// Interval of target network synchronization in optimization steps.
    pub sync_interval: usize,

    /// Exploration schedule used during training.
    pub explorer: EpsilonGreedy,

    /// Fixed exploration probability used during evaluation.
    pub eval_epsilon: f64,

    /// Seed of the action-sampling random number generator.
    pub seed: u64,
}

impl Default for DoubleDqnConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            min_transitions_warmup: 10_000,
            discount_factor: 0.99,
            sync_interval: 10_000,
            explorer: EpsilonGreedy::default(),
            eval_epsilon: 0.02,
            seed: 42,
        }
    }
}

impl DoubleDqnConfig {
    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the minimum number of transitions before optimization starts.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f32) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the target synchronization interval in optimization steps.
    pub fn sync_interval(mut self, v: usize) -> Self {
        self.sync_interval = v;
        self
    }

    /// Sets the exploration schedule.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the evaluation exploration probability.
    pub fn eval_epsilon(mut self, v: f64) -> Self {
        self.eval_epsilon = v;
        self
    }

    /// Sets the seed of the action-sampling random number generator.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the hyperparameters for consistency.
    ///
    /// Violations are setup bugs and fatal: a batch can never be sampled
    /// before `batch_size` transitions are stored, and a discount factor
    /// outside `(0, 1)` diverges.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PixelqError::InvalidConfig("batch_size must be positive".into()).into());
        }
        if self.min_transitions_warmup < self.batch_size {
            return Err(PixelqError::InvalidConfig(format!(
                "min_transitions_warmup ({}) must be at least batch_size ({})",
                self.min_transitions_warmup, self.batch_size
            ))
            .into());
        }
        if !(self.discount_factor > 0. && self.discount_factor < 1.) {
            return Err(PixelqError::InvalidConfig(format!(
                "discount_factor must be in (0, 1), got {}",
                self.discount_factor
            ))
            .into());
        }
        if self.sync_interval == 0 {
            return Err(
                PixelqError::InvalidConfig("sync_interval must be positive".into()).into(),
            );
        }
        if !(0. ..=1.).contains(&self.eval_epsilon) {
            return Err(PixelqError::InvalidConfig(format!(
                "eval_epsilon must be in [0, 1], got {}",
                self.eval_epsilon
            ))
            .into());
        }
        Ok(())
    }

    /// Constructs [`DoubleDqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DoubleDqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DoubleDqnConfig::default().validate().is_ok());
    }

    #[test]
    fn warmup_below_batch_size_is_rejected() {
        let config = DoubleDqnConfig::default()
            .batch_size(64)
            .min_transitions_warmup(32);
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_discount_factor_is_rejected() {
        assert!(DoubleDqnConfig::default()
            .discount_factor(1.0)
            .validate()
            .is_err());
        assert!(DoubleDqnConfig::default()
            .discount_factor(0.0)
            .validate()
            .is_err());
    }
}
