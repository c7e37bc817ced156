use anyhow::Result;
use clap::Parser;
use log::info;
use pixelq::{CatcherAgent, CatcherEnv, CatcherEvaluator, CatcherReplayBuffer, CatcherStepProc};
use pixelq_agent::{DoubleDqnConfig, EpsilonGreedy, LinearQNet, LinearQNetConfig};
use pixelq_core::{
    error::PixelqError,
    record::CsvRecorder,
    replay::{RingReplayBufferConfig, SimpleStepProcessorConfig},
    Agent, Configurable, Trainer, TrainerConfig,
};
use pixelq_pixels::{Catcher, CatcherConfig, PixelEnvConfig, FRAME_LEN};

const NUM_ACTIONS: usize = 3;
const NUM_STACK: usize = 4;
const FRAME_SKIP: usize = 4;
const LEARNING_RATE: f32 = 1e-3;
const DISCOUNT_FACTOR: f32 = 0.99;
const BATCH_SIZE: usize = 32;
const WARMUP: usize = 1_000;
const REPLAY_BUFFER_CAPACITY: usize = 10_000;
const SYNC_INTERVAL: usize = 1_000;
const OPT_INTERVAL: usize = 1;
const EPS_DECAY_STEPS: usize = 50_000;
const EVAL_EPSILON: f64 = 0.02;
const MAX_OPTS: usize = 50_000;
const EVAL_INTERVAL: usize = 5_000;
const EVAL_STEPS: usize = 2_000;
const SAVE_INTERVAL: usize = 10_000;
const FLUSH_INTERVAL: usize = 500;
const SEED: u64 = 42;

/// Trains and evaluates a Double DQN agent on the bundled Catcher game.
#[derive(Parser)]
#[command(name = "train", version)]
struct Cli {
    /// Do training only.
    #[arg(long)]
    train: bool,

    /// Do evaluation only.
    #[arg(long)]
    eval: bool,

    /// Directory for model checkpoints and metrics.
    #[arg(long, default_value = "./model/catcher")]
    model_dir: String,

    /// The maximum number of optimization steps.
    #[arg(long, default_value_t = MAX_OPTS)]
    max_opts: usize,
}

/// Rejects hyperparameter combinations that cannot work before the run
/// starts.
fn check_hyperparameters(
    batch_size: usize,
    warmup: usize,
    capacity: usize,
    opt_interval: usize,
    sync_interval: usize,
) -> Result<()> {
    if batch_size > warmup {
        return Err(PixelqError::InvalidConfig(format!(
            "warmup ({}) must hold at least one batch ({})",
            warmup, batch_size
        ))
        .into());
    }
    if warmup > capacity {
        return Err(PixelqError::InvalidConfig(format!(
            "replay buffer capacity ({}) is below the warmup period ({})",
            capacity, warmup
        ))
        .into());
    }
    // The target sync cadence must align with the optimization cadence,
    // otherwise syncs drift off their intended step positions.
    if opt_interval == 0 || sync_interval % opt_interval != 0 {
        return Err(PixelqError::InvalidConfig(format!(
            "sync_interval ({}) must be a multiple of opt_interval ({})",
            sync_interval, opt_interval
        ))
        .into());
    }
    Ok(())
}

fn env_config(train: bool) -> PixelEnvConfig<Catcher> {
    PixelEnvConfig::new(CatcherConfig::default())
        .frame_skip(FRAME_SKIP)
        .num_stack(NUM_STACK)
        .train(train)
}

fn create_agent() -> Result<CatcherAgent> {
    let qnet_config = LinearQNetConfig::default()
        .in_dim(NUM_STACK * FRAME_LEN)
        .out_dim(NUM_ACTIONS)
        .learning_rate(LEARNING_RATE)
        .seed(SEED);
    let qnet = LinearQNet::build(qnet_config.clone());
    let qnet_tgt = LinearQNet::build(qnet_config);

    let config = DoubleDqnConfig::default()
        .batch_size(BATCH_SIZE)
        .min_transitions_warmup(WARMUP)
        .discount_factor(DISCOUNT_FACTOR)
        .sync_interval(SYNC_INTERVAL)
        .explorer(EpsilonGreedy::default().decay_steps(EPS_DECAY_STEPS))
        .eval_epsilon(EVAL_EPSILON)
        .seed(SEED);

    CatcherAgent::new(config, qnet, qnet_tgt)
}

fn create_evaluator() -> Result<CatcherEvaluator> {
    CatcherEvaluator::new(&env_config(false), SEED + 1, EVAL_STEPS)
}

fn train(max_opts: usize, model_dir: &str) -> Result<()> {
    let trainer_config = TrainerConfig::default()
        .max_opts(max_opts)
        .opt_interval(OPT_INTERVAL)
        .eval_interval(EVAL_INTERVAL)
        .flush_record_interval(FLUSH_INTERVAL)
        .record_compute_cost_interval(FLUSH_INTERVAL)
        .warmup_period(WARMUP)
        .save_interval(SAVE_INTERVAL)
        .model_dir(model_dir)
        .seed(SEED);
    trainer_config.validate()?;

    let mut trainer = Trainer::<CatcherEnv, CatcherStepProc, CatcherReplayBuffer>::build(
        trainer_config,
        env_config(true),
        SimpleStepProcessorConfig::default(),
        RingReplayBufferConfig::default()
            .capacity(REPLAY_BUFFER_CAPACITY)
            .seed(SEED),
    );

    std::fs::create_dir_all(model_dir)?;
    let mut agent = create_agent()?;
    let mut recorder = CsvRecorder::new(format!("{}/metrics.csv", model_dir))?;
    let mut evaluator = create_evaluator()?;

    trainer.train(&mut agent, &mut recorder, &mut evaluator)?;
    info!(
        "Finished after {} env steps and {} opt steps",
        trainer.env_steps(),
        trainer.opt_steps()
    );

    Ok(())
}

fn eval(model_dir: &str) -> Result<()> {
    let mut agent = create_agent()?;
    agent.load_params(model_dir.as_ref())?;
    agent.eval();

    let report = create_evaluator()?.run(&mut agent)?;
    info!(
        "avg return {} (min {}, max {}) over {} episodes",
        report.return_avg, report.return_min, report.return_max, report.episodes
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_hyperparameters_pass_the_checks() {
        assert!(check_hyperparameters(
            BATCH_SIZE,
            WARMUP,
            REPLAY_BUFFER_CAPACITY,
            OPT_INTERVAL,
            SYNC_INTERVAL,
        )
        .is_ok());
    }

    #[test]
    fn warmup_below_batch_size_is_rejected() {
        assert!(check_hyperparameters(64, 32, 1_000, 1, 100).is_err());
    }

    #[test]
    fn capacity_below_warmup_is_rejected() {
        assert!(check_hyperparameters(32, 2_000, 1_000, 1, 100).is_err());
    }

    #[test]
    fn indivisible_sync_interval_is_rejected() {
        assert!(check_hyperparameters(32, 100, 1_000, 4, 10).is_err());
        assert!(check_hyperparameters(32, 100, 1_000, 4, 100).is_ok());
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    check_hyperparameters(
        BATCH_SIZE,
        WARMUP,
        REPLAY_BUFFER_CAPACITY,
        OPT_INTERVAL,
        SYNC_INTERVAL,
    )?;

    let do_train = cli.train || !cli.eval;
    let do_eval = cli.eval || !cli.train;

    if do_train {
        train(cli.max_opts, &cli.model_dir)?;
    }
    if do_eval {
        eval(&format!("{}/best", cli.model_dir))?;
    }

    Ok(())
}
