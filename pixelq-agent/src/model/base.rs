//! Q-function interface.
use anyhow::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A flat snapshot of named parameter tensors.
///
/// Used for target-network synchronization and checkpointing. Snapshots are
/// value types: copying one out of a network and setting it on another never
/// aliases the live parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QWeights {
    /// Parameter tensors, flattened, keyed by name.
    pub tensors: Vec<(String, Vec<f32>)>,
}

impl QWeights {
    /// Saves the weights with bincode at the given path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let buf = bincode::serialize(self)?;
        std::fs::write(path, buf)?;
        Ok(())
    }

    /// Loads weights saved with [`QWeights::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let buf = std::fs::read(path)?;
        Ok(bincode::deserialize(&buf)?)
    }
}

/// An action-value function over stacked-frame states.
///
/// This is the seam to the gradient-computation engine: the agent constructs
/// target values and action masks, the implementation computes the loss and
/// updates its own parameters. Backpropagation internals are opaque to the
/// agent; the loss value is returned unmodified so callers can watch for
/// divergence.
pub trait QFunction {
    /// The number of discrete actions this function scores.
    fn num_actions(&self) -> usize;

    /// Q-values for a batch of states, shape `(batch, num_actions)`.
    fn forward(&self, obs: &Array2<f32>) -> Array2<f32>;

    /// Performs one gradient step on the masked TD loss and returns the loss.
    ///
    /// `action_masks` is one-hot over actions; only the Q-value of the taken
    /// action enters the loss.
    fn train_step(
        &mut self,
        obs: &Array2<f32>,
        targets: &Array1<f32>,
        action_masks: &Array2<f32>,
    ) -> f32;

    /// Returns a copy of the current parameters.
    fn weights(&self) -> QWeights;

    /// Replaces the parameters with the given snapshot.
    ///
    /// The copy is all-or-nothing: a shape mismatch fails before any
    /// parameter is touched.
    fn set_weights(&mut self, weights: &QWeights) -> Result<()>;
}
