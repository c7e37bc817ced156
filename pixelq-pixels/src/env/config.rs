//! Configuration of [`PixelEnv`](super::PixelEnv).
use crate::PixelGame;
use serde::{Deserialize, Serialize};

/// Configuration of [`PixelEnv`](super::PixelEnv).
#[derive(Debug, Deserialize, Serialize)]
#[serde(bound(
    serialize = "G::Config: Serialize",
    deserialize = "G::Config: Deserialize<'de>"
))]
pub struct PixelEnvConfig<G: PixelGame> {
    /// Configuration of the wrapped game.
    pub game: G::Config,

    /// Number of game ticks per environment step.
    pub frame_skip: usize,

    /// Number of frames stacked into one observation.
    pub num_stack: usize,

    /// True for training mode, which clips rewards to their sign.
    pub train: bool,
}

// Manual impl; a derived bound `G: Clone` would be too strict.
impl<G: PixelGame> Clone for PixelEnvConfig<G> {
    fn clone(&self) -> Self {
        Self {
            game: self.game.clone(),
            frame_skip: self.frame_skip,
            num_stack: self.num_stack,
            train: self.train,
        }
    }
}

impl<G: PixelGame> PixelEnvConfig<G> {
    /// Creates a configuration with the classic DQN defaults, in
    /// evaluation mode.
    pub fn new(game: G::Config) -> Self {
        Self {
            game,
            frame_skip: 4,
            num_stack: 4,
            train: false,
        }
    }

    /// Sets the number of game ticks per environment step.
    pub fn frame_skip(mut self, v: usize) -> Self {
        self.frame_skip = v;
        self
    }

    /// Sets the number of stacked frames.
    pub fn num_stack(mut self, v: usize) -> Self {
        self.num_stack = v;
        self
    }

    /// Sets the training mode flag.
    pub fn train(mut self, v: bool) -> Self {
        self.train = v;
        self
    }
}
