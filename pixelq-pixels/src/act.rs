//! Discrete action.
use pixelq_core::Act;

/// A discrete action, an index into the game's action set.
#[derive(Debug, Clone)]
pub struct PixelAct {
    /// The action index.
    pub act: u32,
}

impl PixelAct {
    /// Constructs an action from its index.
    pub fn new(act: u32) -> Self {
        Self { act }
    }
}

impl Act for PixelAct {}

impl From<u32> for PixelAct {
    fn from(act: u32) -> Self {
        Self { act }
    }
}
