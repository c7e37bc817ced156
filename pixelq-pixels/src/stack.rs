//! Frame stacking.
use crate::{FRAME_LEN, StackedObs};

/// A fixed-size stack of the most recent preprocessed frames.
///
/// The stack is stored as one flat buffer of `num_stack * FRAME_LEN` bytes,
/// ordered oldest to newest. Pushing shifts the buffer left by one frame
/// and copies the new frame into the last slot, so the observation handed
/// to the agent is always a contiguous history of the last `num_stack`
/// frames.
pub struct FrameStack {
    num_stack: usize,
    frames: Vec<u8>,
}

impl FrameStack {
    /// Creates a zero-filled stack of `num_stack` frames.
    pub fn new(num_stack: usize) -> Self {
        Self {
            num_stack,
            frames: vec![0; num_stack * FRAME_LEN],
        }
    }

    /// Fills every slot with `frame`, starting a new episode.
    ///
    /// Repeating the initial frame keeps the observation shape constant
    /// from the very first step, before any history exists.
    pub fn reset(&mut self, frame: &[u8]) {
        assert_eq!(frame.len(), FRAME_LEN);
        for slot in self.frames.chunks_mut(FRAME_LEN) {
            slot.copy_from_slice(frame);
        }
    }

    /// Drops the oldest frame and appends `frame` as the newest.
    pub fn push(&mut self, frame: &[u8]) {
        assert_eq!(frame.len(), FRAME_LEN);
        self.frames.copy_within(FRAME_LEN.., 0);
        self.frames[(self.num_stack - 1) * FRAME_LEN..].copy_from_slice(frame);
    }

    /// The current observation, a copy of the stacked frames.
    pub fn obs(&self) -> StackedObs {
        StackedObs::from(self.frames.clone())
    }

    /// The number of stacked frames.
    pub fn num_stack(&self) -> usize {
        self.num_stack
    }
}
