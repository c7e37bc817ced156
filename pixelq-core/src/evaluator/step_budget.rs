//! Fixed-step-budget evaluator.
use super::Evaluator;
use crate::{
    record::{Record, RecordValue::Scalar},
    Env, Policy,
};
use anyhow::Result;
use log::info;

/// Episode returns collected during one evaluation run.
#[derive(Clone, Debug)]
pub struct EvalReport {
    /// Average return over completed episodes.
    pub return_avg: f32,

    /// Smallest episode return.
    pub return_min: f32,

    /// Largest episode return.
    pub return_max: f32,

    /// Number of completed episodes.
    pub episodes: usize,
}

/// Runs a policy for a fixed number of environment steps and reports the
/// average, minimum and maximum episode return.
///
/// Unlike an episode-count evaluator, the step budget bounds the wall-clock
/// cost of an evaluation regardless of how long the policy survives. Only
/// episodes that complete within the budget contribute to the statistics;
/// if none completes, the return of the single partial episode is reported
/// so that the result is always finite.
pub struct StepBudgetEvaluator<E: Env> {
    /// The environment instance used for evaluation.
    env: E,

    /// The number of environment steps per evaluation run.
    eval_steps: usize,
}

impl<E: Env> StepBudgetEvaluator<E> {
    /// Constructs the evaluator with its own environment instance.
    pub fn new(config: &E::Config, seed: u64, eval_steps: usize) -> Result<Self> {
        Ok(Self {
            env: E::build(config, seed)?,
            eval_steps,
        })
    }

    /// Runs one evaluation and returns the collected episode returns.
    pub fn run<P: Policy<E>>(&mut self, policy: &mut P) -> Result<EvalReport> {
        let mut episodes = 0usize;
        let mut return_sum = 0f32;
        let mut return_min = f32::INFINITY;
        let mut return_max = f32::NEG_INFINITY;

        let mut prev_obs = self.env.reset()?;
        let mut episode_return = 0f32;
        let mut episode_steps = 0usize;

        for _ in 0..self.eval_steps {
            let act = policy.sample(&prev_obs);
            let (step, _) = self.env.step(&act);
            episode_return += step.reward;
            episode_steps += 1;

            if step.is_done {
                info!(
                    "eval episode {} steps {} return {}",
                    episodes, episode_steps, episode_return
                );
                episodes += 1;
                return_sum += episode_return;
                return_min = return_min.min(episode_return);
                return_max = return_max.max(episode_return);
                episode_return = 0.;
                episode_steps = 0;
                prev_obs = self.env.reset()?;
            } else {
                prev_obs = step.obs;
            }
        }

        if episodes == 0 {
            // The budget ended inside the first episode.
            return Ok(EvalReport {
                return_avg: episode_return,
                return_min: episode_return,
                return_max: episode_return,
                episodes: 0,
            });
        }

        Ok(EvalReport {
            return_avg: return_sum / episodes as f32,
            return_min,
            return_max,
            episodes,
        })
    }
}

impl<E: Env> Evaluator<E> for StepBudgetEvaluator<E> {
    fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record> {
        let report = self.run(policy)?;

        Ok(Record::from_slice(&[
            ("eval_return_avg", Scalar(report.return_avg)),
            ("eval_return_min", Scalar(report.return_min)),
            ("eval_return_max", Scalar(report.return_max)),
            ("eval_episodes", Scalar(report.episodes as f32)),
        ]))
    }
}
