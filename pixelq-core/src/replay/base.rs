//! Ring replay buffer.
use super::{BatchBase, RingReplayBufferConfig, RingTransitionBatch};
use crate::{
    error::PixelqError, ExperienceBufferBase, ReplayBufferBase, TransitionBatch,
};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A fixed-capacity replay buffer with ring semantics and uniform sampling.
///
/// Insertion is O(1): once `capacity` transitions are stored, the oldest
/// slot is overwritten. [`ReplayBufferBase::batch`] draws indices uniformly
/// at random with replacement from the filled part of the buffer; requesting
/// more transitions than are stored is a fatal precondition violation.
pub struct RingReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Current insertion index.
    i: usize,

    /// Current number of stored transitions.
    size: usize,

    /// Storage for observations.
    obs: O,

    /// Storage for actions.
    act: A,

    /// Storage for next observations.
    next_obs: O,

    /// Storage for rewards.
    reward: Vec<f32>,

    /// Storage for termination flags.
    is_done: Vec<i8>,

    /// Random number generator for sampling.
    rng: StdRng,
}

impl<O, A> RingReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn push_reward(&mut self, i: usize, b: &[f32]) {
        let mut j = i;
        for r in b.iter() {
            self.reward[j] = *r;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    #[inline]
    fn push_is_done(&mut self, i: usize, b: &[i8]) {
        let mut j = i;
        for d in b.iter() {
            self.is_done[j] = *d;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    fn sample_reward(&self, ixs: &[usize]) -> Vec<f32> {
        ixs.iter().map(|ix| self.reward[*ix]).collect()
    }

    fn sample_is_done(&self, ixs: &[usize]) -> Vec<i8> {
        ixs.iter().map(|ix| self.is_done[*ix]).collect()
    }

    /// Returns the number of termination flags set in the buffer.
    pub fn num_done_flags(&self) -> usize {
        self.is_done.iter().map(|d| *d as usize).sum()
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.reward.iter().sum()
    }
}

impl<O, A> ExperienceBufferBase for RingReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = RingTransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.size
    }

    /// Adds transitions to the buffer, overwriting the oldest slots once
    /// the capacity is reached.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        let len = tr.len();
        let (obs, act, next_obs, reward, is_done) = tr.unpack();
        self.obs.push(self.i, obs);
        self.act.push(self.i, act);
        self.next_obs.push(self.i, next_obs);
        self.push_reward(self.i, &reward);
        self.push_is_done(self.i, &is_done);

        self.i = (self.i + len) % self.capacity;
        self.size += len;
        if self.size >= self.capacity {
            self.size = self.capacity;
        }

        Ok(())
    }
}

impl<O, A> ReplayBufferBase for RingReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = RingReplayBufferConfig;
    type Batch = RingTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        let capacity = config.capacity;

        Self {
            capacity,
            i: 0,
            size: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_done: vec![0; capacity],
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Samples a batch of transitions, uniformly at random with replacement.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        if size > self.size {
            return Err(PixelqError::InsufficientTransitions {
                requested: size,
                available: self.size,
            }
            .into());
        }

        let ixs = (0..size)
            .map(|_| self.rng.gen_range(0..self.size))
            .collect::<Vec<_>>();

        Ok(Self::Batch {
            obs: self.obs.sample(&ixs),
            act: self.act.sample(&ixs),
            next_obs: self.next_obs.sample(&ixs),
            reward: self.sample_reward(&ixs),
            is_done: self.sample_is_done(&ixs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scalar observation/action store used to exercise the ring semantics.
    #[derive(Clone, Debug, PartialEq)]
    struct ScalarBatch(Vec<f32>);

    impl BatchBase for ScalarBatch {
        fn new(capacity: usize) -> Self {
            Self(vec![0.; capacity])
        }

        fn push(&mut self, ix: usize, data: Self) {
            let capacity = self.0.len();
            let mut j = ix;
            for v in data.0.iter() {
                self.0[j] = *v;
                j += 1;
                if j == capacity {
                    j = 0;
                }
            }
        }

        fn sample(&self, ixs: &[usize]) -> Self {
            Self(ixs.iter().map(|ix| self.0[*ix]).collect())
        }
    }

    fn transition(v: f32) -> RingTransitionBatch<ScalarBatch, ScalarBatch> {
        RingTransitionBatch {
            obs: ScalarBatch(vec![v]),
            act: ScalarBatch(vec![v]),
            next_obs: ScalarBatch(vec![v + 0.5]),
            reward: vec![v],
            is_done: vec![0],
        }
    }

    fn buffer(capacity: usize) -> RingReplayBuffer<ScalarBatch, ScalarBatch> {
        let config = RingReplayBufferConfig::default().capacity(capacity);
        RingReplayBuffer::build(&config)
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let mut buffer = buffer(3);
        for v in 1..=5 {
            buffer.push(transition(v as f32)).unwrap();
        }

        assert_eq!(buffer.len(), 3);
        // Slots hold items 4, 5, 3 after wrapping; 1 and 2 were overwritten.
        assert_eq!(buffer.reward, vec![4., 5., 3.]);
    }

    #[test]
    fn len_grows_until_capacity() {
        let mut buffer = buffer(3);
        assert!(buffer.is_empty());
        buffer.push(transition(1.)).unwrap();
        assert_eq!(buffer.len(), 1);
        buffer.push(transition(2.)).unwrap();
        buffer.push(transition(3.)).unwrap();
        buffer.push(transition(4.)).unwrap();
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn batch_fails_when_underfilled() {
        let mut buffer = buffer(8);
        buffer.push(transition(1.)).unwrap();

        assert!(buffer.batch(2).is_err());
        assert!(buffer.batch(1).is_ok());
    }

    #[test]
    fn batch_draws_from_filled_slots_only() {
        let mut buffer = buffer(16);
        for v in 0..4 {
            buffer.push(transition(v as f32)).unwrap();
        }

        for _ in 0..100 {
            let batch = buffer.batch(4).unwrap();
            for r in batch.reward.iter() {
                assert!(*r >= 0. && *r <= 3.);
            }
        }
    }
}
