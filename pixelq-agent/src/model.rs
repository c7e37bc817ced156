//! Q-function interface and a linear reference implementation.
mod base;
mod linear;

pub use base::{QFunction, QWeights};
pub use linear::{LinearQNet, LinearQNetConfig};
