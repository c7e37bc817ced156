#![warn(missing_docs)]
//! Double DQN agent on top of [`pixelq_core`].
//!
//! The temporal-difference update implemented here is the Double DQN rule:
//! action selection for the bootstrap target uses the online network, while
//! action evaluation uses a periodically hard-synced target network. The
//! gradient engine itself sits behind the [`QFunction`](model::QFunction)
//! seam; this crate only constructs the targets and the action masks.
pub mod dqn;
pub mod model;

pub use dqn::{DoubleDqn, DoubleDqnConfig, EpsilonGreedy};
pub use model::{LinearQNet, LinearQNetConfig, QFunction, QWeights};
