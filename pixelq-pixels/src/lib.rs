#![warn(missing_docs)]
//! Pixel observation pipeline for pixelq.
//!
//! This crate turns raw RGB frames emitted by a [`PixelGame`] into the
//! stacked, downscaled grayscale observations consumed by the agents in
//! `pixelq-agent`:
//!
//! * [`preprocess`](crate::preprocess) warps each frame to 84x84 grayscale,
//! * [`FrameStack`] concatenates the most recent frames into one observation,
//! * [`PixelEnv`] wraps a game with frame skipping, flicker removal by
//!   max-pooling and reward clipping, implementing
//!   [`Env`](pixelq_core::Env).
//!
//! Observations are kept as `u8` throughout; they are converted to `f32`
//! and scaled to `[0, 1]` only at the network boundary.
mod act;
mod batch;
mod env;
mod game;
mod obs;
pub mod preprocess;
mod stack;

pub use act::PixelAct;
pub use batch::{DiscreteActBatch, FrameBatch};
pub use env::{PixelEnv, PixelEnvConfig};
pub use game::{Catcher, CatcherConfig, PixelGame};
pub use obs::StackedObs;
pub use stack::FrameStack;

/// Width and height of a preprocessed frame.
pub const FRAME_SIZE: usize = 84;

/// Number of pixels in a preprocessed frame.
pub const FRAME_LEN: usize = FRAME_SIZE * FRAME_SIZE;
