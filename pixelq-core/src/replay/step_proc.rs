//! Converts environment steps into transitions.
use super::{BatchBase, RingTransitionBatch};
use crate::{Env, StepProcessor};
use std::{default::Default, marker::PhantomData};

/// Configuration for [`SimpleStepProcessor`].
#[derive(Clone, Debug)]
pub struct SimpleStepProcessorConfig {}

impl Default for SimpleStepProcessorConfig {
    fn default() -> Self {
        Self {}
    }
}

/// Produces transitions `(o_t, a_t, o_t+1, r_t, done_t)` from 1-step backups.
///
/// The previous observation `o_t` is kept in the processor; the remaining
/// items come from the processed [`Step`](crate::Step). The processor must
/// be reset with the initial observation of every episode, otherwise a stale
/// cross-episode observation would leak into the first transition.
pub struct SimpleStepProcessor<E, O, A> {
    prev_obs: Option<O>,
    phantom: PhantomData<(E, A)>,
}

impl<E, O, A> StepProcessor<E> for SimpleStepProcessor<E, O, A>
where
    E: Env,
    O: BatchBase + From<E::Obs>,
    A: BatchBase + From<E::Act>,
{
    type Config = SimpleStepProcessorConfig;
    type Output = RingTransitionBatch<O, A>;

    fn build(_config: &Self::Config) -> Self {
        Self {
            prev_obs: None,
            phantom: PhantomData,
        }
    }

    fn reset(&mut self, init_obs: E::Obs) {
        self.prev_obs = Some(init_obs.into());
    }

    /// Processes a [`Step`](crate::Step) into a single transition.
    ///
    /// # Panics
    ///
    /// Panics if `reset()` has not been called before the first step of an
    /// episode.
    fn process(&mut self, step: crate::Step<E>) -> Self::Output {
        if self.prev_obs.is_none() {
            panic!("prev_obs is not set. Forgot to call reset()?");
        }

        let next_obs = step.obs.clone().into();
        let obs = self.prev_obs.replace(step.obs.into()).unwrap();
        let act = step.act.into();
        let reward = vec![step.reward];
        let is_done = vec![step.is_done as i8];

        if step.is_done {
            // The caller re-seeds with the next episode's initial observation.
            self.prev_obs = None;
        }

        RingTransitionBatch {
            obs,
            act,
            next_obs,
            reward,
            is_done,
        }
    }
}
