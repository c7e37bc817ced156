//! Epsilon-greedy exploration.
use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Index of the first maximal element.
///
/// Ties on exactly equal Q-values resolve to the lowest action index, which
/// makes greedy selection reproducible under a fixed seed.
pub fn argmax(q: &ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_v = f32::NEG_INFINITY;
    for (i, v) in q.iter().enumerate() {
        if *v > best_v {
            best_v = *v;
            best = i;
        }
    }
    best
}

/// Epsilon-greedy explorer with a linear decay schedule.
///
/// The schedule is a pure function of the step counter supplied by the
/// caller: epsilon decays linearly from `eps_start` to `eps_final` over
/// `decay_steps` steps and is held at `eps_final` afterwards. Keeping the
/// counter outside the explorer avoids drift when a run is resumed from a
/// checkpoint.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Exploration probability at step 0.
    pub eps_start: f64,

    /// Exploration probability after the decay finished.
    pub eps_final: f64,

    /// Number of steps over which epsilon decays.
    pub decay_steps: usize,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            eps_start: 1.0,
            eps_final: 0.02,
            decay_steps: 100_000,
        }
    }
}

impl EpsilonGreedy {
    /// Exploration probability at the given step.
    pub fn epsilon(&self, step: usize) -> f64 {
        let d = (self.eps_start - self.eps_final) / self.decay_steps as f64;
        (self.eps_start - d * step as f64).max(self.eps_final)
    }

    /// Picks an action given Q-values and the current epsilon.
    ///
    /// With probability `epsilon` a uniformly random action is returned,
    /// otherwise the greedy action. The only side effect is consuming the
    /// random source.
    pub fn select(&self, q: &ArrayView1<f32>, epsilon: f64, rng: &mut impl Rng) -> u32 {
        if rng.gen::<f64>() < epsilon {
            rng.gen_range(0..q.len() as u32)
        } else {
            argmax(q) as u32
        }
    }

    /// Sets the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Sets the epsilon value after the decay finished.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Sets the number of decay steps.
    pub fn decay_steps(mut self, v: usize) -> Self {
        self.decay_steps = v;
        self
    }
}
