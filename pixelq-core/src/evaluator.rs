//! Evaluate a policy.
use crate::{record::Record, Env, Policy};
use anyhow::Result;
mod step_budget;
pub use step_budget::{EvalReport, StepBudgetEvaluator};

/// Evaluates a policy.
pub trait Evaluator<E: Env> {
    /// Runs the policy on the evaluation environment and reports returns.
    ///
    /// The caller of this method needs to handle the internal state of the
    /// policy, like switching an agent between training and evaluation mode.
    /// Implementations must not mutate any training state: evaluation owns
    /// its own environment and its own step counters.
    fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record>;
}
