//! Double DQN agent.
mod base;
mod config;
mod explorer;

pub use base::DoubleDqn;
pub use config::DoubleDqnConfig;
pub use explorer::{argmax, EpsilonGreedy};
