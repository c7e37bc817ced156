#![warn(missing_docs)]
//! Double DQN training from raw pixel observations.
//!
//! This crate ties the workspace together:
//!
//! * [pixelq-core](pixelq_core) defines the seams between environment,
//!   agent, replay buffer and recorder, and drives them with
//!   [`Trainer`](pixelq_core::Trainer).
//! * [pixelq-agent](pixelq_agent) implements the Double DQN agent on top
//!   of the [`QFunction`](pixelq_agent::QFunction) seam.
//! * [pixelq-pixels](pixelq_pixels) turns raw RGB game frames into
//!   stacked 84x84 grayscale observations.
//!
//! The type aliases below wire the pieces together for the bundled
//! [`Catcher`](pixelq_pixels::Catcher) game; the `train` binary shows a
//! complete run.
pub use pixelq_agent;
pub use pixelq_core;
pub use pixelq_pixels;

use pixelq_agent::{DoubleDqn, LinearQNet};
use pixelq_core::{
    replay::{RingReplayBuffer, SimpleStepProcessor},
    StepBudgetEvaluator,
};
use pixelq_pixels::{Catcher, DiscreteActBatch, FrameBatch, PixelEnv};

/// The bundled game wrapped with the pixel pipeline.
pub type CatcherEnv = PixelEnv<Catcher>;

/// Step processor producing single transitions from [`CatcherEnv`] steps.
pub type CatcherStepProc = SimpleStepProcessor<CatcherEnv, FrameBatch, DiscreteActBatch>;

/// Replay buffer holding `u8` frame observations and action indices.
pub type CatcherReplayBuffer = RingReplayBuffer<FrameBatch, DiscreteActBatch>;

/// Double DQN agent over the bundled linear Q-function.
pub type CatcherAgent = DoubleDqn<CatcherEnv, LinearQNet, CatcherReplayBuffer>;

/// Step-budget evaluator for [`CatcherEnv`].
pub type CatcherEvaluator = StepBudgetEvaluator<CatcherEnv>;
