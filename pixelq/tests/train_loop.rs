use anyhow::Result;
use pixelq::{CatcherAgent, CatcherEnv, CatcherReplayBuffer, CatcherStepProc};
use pixelq_agent::{DoubleDqnConfig, EpsilonGreedy, LinearQNet, LinearQNetConfig};
use pixelq_core::{
    record::{CsvRecorder, NullRecorder},
    replay::{RingReplayBufferConfig, SimpleStepProcessorConfig},
    Agent, Configurable, StepBudgetEvaluator, Trainer, TrainerConfig, TrainerPhase,
};
use pixelq_pixels::{Catcher, CatcherConfig, PixelEnvConfig, FRAME_LEN};
use tempdir::TempDir;

const NUM_STACK: usize = 2;

fn env_config(train: bool) -> PixelEnvConfig<Catcher> {
    PixelEnvConfig::new(CatcherConfig::default().size(24).max_steps(50))
        .frame_skip(2)
        .num_stack(NUM_STACK)
        .train(train)
}

fn agent() -> CatcherAgent {
    let qnet_config = LinearQNetConfig::default()
        .in_dim(NUM_STACK * FRAME_LEN)
        .out_dim(3)
        .learning_rate(1e-3)
        .seed(0);
    let qnet = LinearQNet::build(qnet_config.clone());
    let qnet_tgt = LinearQNet::build(qnet_config);

    let config = DoubleDqnConfig::default()
        .batch_size(4)
        .min_transitions_warmup(8)
        .sync_interval(2)
        .explorer(EpsilonGreedy::default().decay_steps(100))
        .seed(0);

    CatcherAgent::new(config, qnet, qnet_tgt).unwrap()
}

fn trainer(config: TrainerConfig) -> Trainer<CatcherEnv, CatcherStepProc, CatcherReplayBuffer> {
    Trainer::build(
        config,
        env_config(true),
        SimpleStepProcessorConfig::default(),
        RingReplayBufferConfig::default().capacity(64).seed(0),
    )
}

#[test]
fn zero_opt_budget_terminates_immediately() -> Result<()> {
    let mut trainer = trainer(TrainerConfig::default().max_opts(0));
    let mut agent = agent();
    let mut recorder = NullRecorder {};
    let mut evaluator = StepBudgetEvaluator::<CatcherEnv>::new(&env_config(false), 1, 20)?;

    trainer.train(&mut agent, &mut recorder, &mut evaluator)?;

    assert_eq!(trainer.phase(), TrainerPhase::Terminal);
    assert_eq!(trainer.env_steps(), 0);
    assert_eq!(trainer.opt_steps(), 0);

    // The untrained agent can still be evaluated.
    agent.eval();
    let report = evaluator.run(&mut agent)?;
    assert!(report.return_avg.is_finite());
    Ok(())
}

#[test]
fn warmup_threshold_beyond_capacity_fails_instead_of_spinning() -> Result<()> {
    // The agent wants 32 transitions before optimizing, but the buffer can
    // never hold more than 16; the loop must fail instead of running
    // forever without an optimization step.
    let qnet_config = LinearQNetConfig::default()
        .in_dim(NUM_STACK * FRAME_LEN)
        .out_dim(3)
        .seed(0);
    let qnet = LinearQNet::build(qnet_config.clone());
    let qnet_tgt = LinearQNet::build(qnet_config);
    let config = DoubleDqnConfig::default()
        .batch_size(4)
        .min_transitions_warmup(32)
        .seed(0);
    let mut agent = CatcherAgent::new(config, qnet, qnet_tgt)?;

    let mut trainer = Trainer::<CatcherEnv, CatcherStepProc, CatcherReplayBuffer>::build(
        TrainerConfig::default()
            .max_opts(1)
            .opt_interval(1)
            .warmup_period(1)
            .seed(0),
        env_config(true),
        SimpleStepProcessorConfig::default(),
        RingReplayBufferConfig::default().capacity(16).seed(0),
    );
    let mut recorder = NullRecorder {};
    let mut evaluator = StepBudgetEvaluator::<CatcherEnv>::new(&env_config(false), 1, 20)?;

    let result = trainer.train(&mut agent, &mut recorder, &mut evaluator);
    assert!(result.is_err());
    assert_eq!(trainer.opt_steps(), 0);
    Ok(())
}

#[test]
fn short_run_trains_evaluates_and_checkpoints() -> Result<()> {
    let dir = TempDir::new("pixelq_train")?;
    let model_dir = dir.path().join("model");
    std::fs::create_dir_all(&model_dir)?;
    let model_dir = model_dir.to_str().unwrap().to_string();

    let config = TrainerConfig::default()
        .max_opts(4)
        .opt_interval(1)
        .eval_interval(2)
        .flush_record_interval(2)
        .record_compute_cost_interval(2)
        .warmup_period(8)
        .save_interval(4)
        .model_dir(model_dir.clone())
        .seed(0);
    config.validate()?;

    let mut trainer = trainer(config);
    let mut agent = agent();
    let metrics_path = format!("{}/metrics.csv", model_dir);
    let mut recorder = CsvRecorder::new(&metrics_path)?;
    let mut evaluator = StepBudgetEvaluator::<CatcherEnv>::new(&env_config(false), 1, 30)?;

    trainer.train(&mut agent, &mut recorder, &mut evaluator)?;
    drop(recorder);

    assert_eq!(trainer.phase(), TrainerPhase::Terminal);
    assert_eq!(trainer.opt_steps(), 4);
    // 7 warmup steps plus one per optimization step.
    assert_eq!(trainer.env_steps(), 11);

    // The evaluation at opt step 2 saved the best model so far, the
    // save interval and the final save wrote a step checkpoint.
    assert!(dir.path().join("model/best/qnet.bincode").exists());
    assert!(dir.path().join("model/best/qnet_tgt.bincode").exists());
    assert!(dir.path().join("model/4/qnet.bincode").exists());

    let metrics = std::fs::read_to_string(&metrics_path)?;
    let mut lines = metrics.lines();
    assert_eq!(lines.next(), Some("step,key,value"));
    assert!(metrics.contains("loss"));
    assert!(metrics.contains("eval_return_avg"));

    // A fresh agent can restore the checkpoint.
    let mut restored = self::agent();
    restored.load_params(dir.path().join("model/best").as_path())?;
    Ok(())
}
