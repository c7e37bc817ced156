//! Transition batches of generic observation and action types.
use crate::TransitionBatch;

/// Basic operations on a batch of observations or actions.
///
/// Implementations own a contiguous store of `capacity` slots; `push`
/// copies data in at a given index, so a stored item can never alias a
/// live environment frame.
pub trait BatchBase {
    /// Creates a new batch with the specified capacity.
    fn new(capacity: usize) -> Self;

    /// Copies `data` into the store, starting at index `ix` and wrapping
    /// around at the capacity.
    fn push(&mut self, ix: usize, data: Self);

    /// Retrieves a batch of samples at the specified indices.
    fn sample(&self, ixs: &[usize]) -> Self;
}

/// A transition batch `(o_t, a_t, o_t+1, r_t, done_t)` of generic
/// observation and action types.
///
/// This type serves both as the item pushed into
/// [`RingReplayBuffer`](super::RingReplayBuffer) (with length 1) and as
/// the batch sampled from it.
pub struct RingTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Observations.
    pub obs: O,

    /// Actions.
    pub act: A,

    /// Next observations.
    pub next_obs: O,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Episode termination flags.
    pub is_done: Vec<i8>,
}

impl<O, A> TransitionBatch for RingTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type ObsBatch = O;
    type ActBatch = A;

    fn unpack(
        self,
    ) -> (
        Self::ObsBatch,
        Self::ActBatch,
        Self::ObsBatch,
        Vec<f32>,
        Vec<i8>,
    ) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_done,
        )
    }

    fn len(&self) -> usize {
        self.reward.len()
    }

    fn obs(&self) -> &Self::ObsBatch {
        &self.obs
    }

    fn act(&self) -> &Self::ActBatch {
        &self.act
    }
}
