#![warn(missing_docs)]
//! Core abstractions for training value-based agents from pixel observations.
//!
//! The crate defines the seams between the four actors of a training run:
//! an environment implementing [`Env`], an agent implementing [`Agent`],
//! a replay buffer implementing [`ReplayBufferBase`], and a metrics sink
//! implementing [`Recorder`](record::Recorder). [`Trainer`] drives them as
//! an explicit phase machine (warmup, training, evaluating, terminal) and
//! [`StepBudgetEvaluator`] runs greedy rollouts for a fixed step budget.
pub mod error;
pub mod record;
pub mod replay;

mod base;
pub use base::{
    Act, Agent, Configurable, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase,
    Step, StepProcessor, TransitionBatch,
};

mod trainer;
pub use trainer::{Sampler, Trainer, TrainerConfig, TrainerPhase};

mod evaluator;
pub use evaluator::{EvalReport, Evaluator, StepBudgetEvaluator};
