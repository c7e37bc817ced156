//! A fixed-capacity ring replay buffer with uniform sampling.
//!
//! Transitions are stored field-by-field in circular arrays indexed by a
//! wrapping write cursor, which bounds memory without per-item lifetime
//! tracking. Sampling draws indices uniformly at random with replacement,
//! decorrelating the highly autocorrelated stream of environment steps.
mod base;
mod batch;
mod config;
mod step_proc;

pub use base::RingReplayBuffer;
pub use batch::{BatchBase, RingTransitionBatch};
pub use config::RingReplayBufferConfig;
pub use step_proc::{SimpleStepProcessor, SimpleStepProcessorConfig};
