//! Samples experiences from the environment into a replay buffer.
use crate::{
    record::{Record, RecordValue::Scalar},
    Env, ExperienceBufferBase, Policy, StepProcessor,
};
use anyhow::Result;
use std::time::SystemTime;

/// Drives the agent-environment interaction and pushes the resulting
/// transitions into a replay buffer.
///
/// The sampler owns the training environment and the step processor. It also
/// tracks per-episode statistics (return and length) and a frames-per-second
/// counter for the compute-cost records.
pub struct Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    /// The environment being sampled from.
    env: E,

    /// Previous observation.
    prev_obs: Option<E::Obs>,

    /// Processor for converting steps into transitions.
    step_processor: P,

    /// Return of the episode in progress.
    episode_return: f32,

    /// Length of the episode in progress.
    episode_steps: usize,

    /// Environment steps since the FPS counter was reset.
    n_frames: usize,

    /// Time at which the FPS counter was reset.
    time: SystemTime,
}

impl<E, P> Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    /// Creates a sampler for the given environment and step processor.
    pub fn new(env: E, step_processor: P) -> Self {
        Self {
            env,
            prev_obs: None,
            step_processor,
            episode_return: 0.,
            episode_steps: 0,
            n_frames: 0,
            time: SystemTime::now(),
        }
    }

    /// Samples a transition and pushes it into the replay buffer.
    ///
    /// On the first call, and after every episode end, the environment is
    /// reset and the step processor is re-seeded with the initial
    /// observation. Episode return and length are added to the returned
    /// record when an episode ends.
    pub fn sample_and_push<A, R>(&mut self, policy: &mut A, buffer: &mut R) -> Result<Record>
    where
        A: Policy<E>,
        R: ExperienceBufferBase<Item = P::Output>,
    {
        if self.prev_obs.is_none() {
            let init_obs = self.env.reset()?;
            self.step_processor.reset(init_obs.clone());
            self.prev_obs = Some(init_obs);
        }

        let (step, mut record) = {
            let act = policy.sample(self.prev_obs.as_ref().unwrap());
            self.env.step(&act)
        };
        let is_done = step.is_done;

        self.episode_return += step.reward;
        self.episode_steps += 1;
        self.n_frames += 1;

        self.prev_obs = match is_done {
            true => None,
            false => Some(step.obs.clone()),
        };

        let transition = self.step_processor.process(step);
        buffer.push(transition)?;

        if is_done {
            record.insert("episode_return", Scalar(self.episode_return));
            record.insert("episode_steps", Scalar(self.episode_steps as f32));
            self.episode_return = 0.;
            self.episode_steps = 0;

            // Seed the next episode before the next sample.
            let init_obs = self.env.reset()?;
            self.step_processor.reset(init_obs.clone());
            self.prev_obs = Some(init_obs);
        }

        Ok(record)
    }

    /// Returns frames per second since the last counter reset.
    pub fn fps(&self) -> f32 {
        match self.time.elapsed() {
            Ok(elapsed) => 1000. * self.n_frames as f32 / elapsed.as_millis().max(1) as f32,
            Err(_) => 0.,
        }
    }

    /// Resets the frames-per-second counter.
    pub fn reset_fps_counter(&mut self) {
        self.n_frames = 0;
        self.time = SystemTime::now();
    }
}
