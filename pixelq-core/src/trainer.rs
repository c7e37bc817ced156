//! Train an [`Agent`].
mod config;
mod sampler;
use std::time::{Duration, SystemTime};

use crate::{
    error::PixelqError,
    record::{Record, RecordValue::Scalar, Recorder},
    Agent, Env, Evaluator, ExperienceBufferBase, ReplayBufferBase, StepProcessor,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::info;
pub use sampler::Sampler;

/// Phase of a training run.
///
/// The trainer is an explicit finite-state loop. Making the phases named
/// values keeps their invariants auditable: the replay buffer and the
/// network weights are only mutated in [`TrainerPhase::Training`], and
/// evaluation runs on its own environment with its own step counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainerPhase {
    /// Filling the replay buffer; no optimization steps yet.
    Warmup,

    /// Interleaved environment stepping and optimization.
    Training,

    /// Periodic greedy rollout; no buffer or weight mutation.
    Evaluating,

    /// The optimization step budget is exhausted.
    Terminal,
}

/// Manages the training loop and the objects it couples.
///
/// # Training loop
///
/// 1. Reset the training environment and seed the step processor.
/// 2. Perform an environment step with the agent's current policy and push
///    the resulting transition into the replay buffer.
/// 3. After the warmup period, every `opt_interval` environment steps,
///    perform an optimization step (the agent may still skip it while its
///    own warmup threshold is not reached).
/// 4. Every `eval_interval` optimization steps, switch the agent to
///    evaluation mode, run the evaluator and save the best model so far.
/// 5. Every `save_interval` optimization steps, save the model parameters.
/// 6. Stop once `max_opts` optimization steps were performed.
///
/// Everything runs on a single logical thread: environment stepping, buffer
/// mutation and optimization are strictly sequential, so no transition or
/// weight update is ever observable half-applied.
pub struct Trainer<E, P, R>
where
    E: Env,
    P: StepProcessor<E>,
    R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
{
    /// Configuration of the environment for training.
    env_config: E::Config,

    /// Configuration of the transition producer.
    step_proc_config: P::Config,

    /// Configuration of the replay buffer.
    replay_buffer_config: R::Config,

    /// Where to save the trained model.
    model_dir: Option<String>,

    /// Interval of optimization in environment steps.
    opt_interval: usize,

    /// Interval of recording computational cost in optimization steps.
    record_compute_cost_interval: usize,

    /// Interval of flushing records in optimization steps.
    flush_records_interval: usize,

    /// Interval of evaluation in optimization steps.
    eval_interval: usize,

    /// Interval of saving the model in optimization steps.
    save_interval: usize,

    /// The maximal number of optimization steps.
    max_opts: usize,

    /// Warmup period, for filling the replay buffer, in environment steps.
    warmup_period: usize,

    /// Seed for the training environment.
    seed: u64,

    /// Environment steps taken so far.
    env_steps: usize,

    /// Optimization steps taken so far.
    opt_steps: usize,

    /// Optimization steps since the last compute-cost record.
    opt_steps_for_ops: usize,

    /// Accumulated optimization time since the last compute-cost record.
    timer_for_ops: Duration,

    /// Current phase of the run.
    phase: TrainerPhase,
}

impl<E, P, R> Trainer<E, P, R>
where
    E: Env,
    P: StepProcessor<E>,
    R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
{
    /// Constructs a trainer.
    pub fn build(
        config: TrainerConfig,
        env_config: E::Config,
        step_proc_config: P::Config,
        replay_buffer_config: R::Config,
    ) -> Self {
        Self {
            env_config,
            step_proc_config,
            replay_buffer_config,
            model_dir: config.model_dir,
            opt_interval: config.opt_interval,
            record_compute_cost_interval: config.record_compute_cost_interval,
            flush_records_interval: config.flush_record_interval,
            eval_interval: config.eval_interval,
            save_interval: config.save_interval,
            max_opts: config.max_opts,
            warmup_period: config.warmup_period,
            seed: config.seed,
            env_steps: 0,
            opt_steps: 0,
            opt_steps_for_ops: 0,
            timer_for_ops: Duration::new(0, 0),
            phase: TrainerPhase::Warmup,
        }
    }

    /// Returns the current phase of the run.
    pub fn phase(&self) -> TrainerPhase {
        self.phase
    }

    /// Returns the number of environment steps taken so far.
    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    /// Returns the number of optimization steps taken so far.
    pub fn opt_steps(&self) -> usize {
        self.opt_steps
    }

    fn save_model<A: Agent<E, R>>(agent: &A, model_dir: String) {
        match agent.save_params(model_dir.as_ref()) {
            Ok(()) => info!("Saved the model in {:?}", &model_dir),
            Err(_) => info!("Failed to save model in {:?}", &model_dir),
        }
    }

    fn save_best_model<A: Agent<E, R>>(agent: &A, model_dir: String) {
        let model_dir = model_dir + "/best";
        Self::save_model(agent, model_dir);
    }

    fn save_model_with_steps<A: Agent<E, R>>(agent: &A, model_dir: String, steps: usize) {
        let model_dir = model_dir + format!("/{}", steps).as_str();
        Self::save_model(agent, model_dir);
    }

    /// Returns optimization steps per second, then resets the counters.
    fn opt_steps_per_sec(&mut self) -> f32 {
        let osps =
            1000. * self.opt_steps_for_ops as f32 / (self.timer_for_ops.as_millis().max(1) as f32);
        self.opt_steps_for_ops = 0;
        self.timer_for_ops = Duration::new(0, 0);
        osps
    }

    /// Performs a training step.
    ///
    /// First performs an environment step and pushes the transition into
    /// the buffer. Then, past the warmup period and on the optimization
    /// interval, performs an optimization step.
    ///
    /// Fails if the agent skips optimization while the buffer has stopped
    /// growing: the buffer is at capacity, so the agent's warmup threshold
    /// can never be reached and the loop would spin forever.
    ///
    /// The second return value is `true` if an optimization step was done.
    pub fn train_step<A>(
        &mut self,
        agent: &mut A,
        buffer: &mut R,
        sampler: &mut Sampler<E, P>,
    ) -> Result<(Record, bool)>
    where
        A: Agent<E, R>,
    {
        let len_before_push = buffer.len();
        let mut record = sampler.sample_and_push(agent, buffer)?;
        self.env_steps += 1;

        if self.env_steps < self.warmup_period {
            return Ok((record, false));
        }

        if self.phase == TrainerPhase::Warmup {
            info!(
                "Warmup finished with {} transitions in the buffer",
                buffer.len()
            );
            self.phase = TrainerPhase::Training;
        }

        if self.env_steps % self.opt_interval != 0 {
            return Ok((record, false));
        }

        let timer = SystemTime::now();
        match agent.opt(buffer)? {
            None => {
                if buffer.len() == len_before_push {
                    return Err(PixelqError::InvalidConfig(format!(
                        "the agent skipped optimization with the replay buffer at \
                         capacity ({} transitions); its warmup threshold exceeds \
                         the buffer capacity",
                        buffer.len()
                    ))
                    .into());
                }
                Ok((record, false))
            }
            Some(record_agent) => {
                self.opt_steps += 1;
                self.timer_for_ops += timer.elapsed()?;
                self.opt_steps_for_ops += 1;
                record = record.merge(record_agent);
                Ok((record, true))
            }
        }
    }

    /// Trains the agent until `max_opts` optimization steps are done.
    pub fn train<A, D>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<()>
    where
        A: Agent<E, R>,
        D: Evaluator<E>,
    {
        if self.max_opts == 0 {
            // Nothing to optimize; the caller may still evaluate the agent.
            self.phase = TrainerPhase::Terminal;
            return Ok(());
        }

        let env = E::build(&self.env_config, self.seed)?;
        let producer = P::build(&self.step_proc_config);
        let mut buffer = R::build(&self.replay_buffer_config);
        let mut sampler = Sampler::new(env, producer);
        let mut max_eval_reward = f32::MIN;
        sampler.reset_fps_counter();
        agent.train();
        self.phase = TrainerPhase::Warmup;

        loop {
            let (mut record, is_opt) = self.train_step(agent, &mut buffer, &mut sampler)?;

            if is_opt {
                if self.opt_steps % self.record_compute_cost_interval == 0 {
                    record.insert("fps", Scalar(sampler.fps()));
                    record.insert("opt_steps_per_sec", Scalar(self.opt_steps_per_sec()));
                    sampler.reset_fps_counter();
                }

                if self.opt_steps % self.eval_interval == 0 {
                    info!("Starts evaluation of the trained model");
                    self.phase = TrainerPhase::Evaluating;
                    agent.eval();
                    let eval_record = evaluator.evaluate(agent)?;
                    agent.train();
                    self.phase = TrainerPhase::Training;

                    let eval_reward = eval_record.get_scalar("eval_return_avg")?;
                    record.merge_inplace(eval_record);

                    // Save the best model up to the current iteration
                    if eval_reward > max_eval_reward {
                        max_eval_reward = eval_reward;
                        if let Some(model_dir) = self.model_dir.as_ref() {
                            Self::save_best_model(agent, model_dir.clone());
                        }
                    }
                }

                if self.save_interval > 0 && self.opt_steps % self.save_interval == 0 {
                    if let Some(model_dir) = self.model_dir.as_ref() {
                        Self::save_model_with_steps(agent, model_dir.clone(), self.opt_steps);
                    }
                }
            }

            if !record.is_empty() {
                recorder.store(record);
            }

            if is_opt && self.opt_steps % self.flush_records_interval == 0 {
                recorder.flush(self.opt_steps as _);
            }

            if is_opt && self.opt_steps == self.max_opts {
                self.phase = TrainerPhase::Terminal;
                break;
            }
        }

        if let Some(model_dir) = self.model_dir.as_ref() {
            Self::save_model_with_steps(agent, model_dir.clone(), self.opt_steps);
        }
        recorder.flush(self.opt_steps as _);

        Ok(())
    }
}
