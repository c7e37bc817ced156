//! Double DQN agent.
use super::{argmax, DoubleDqnConfig, EpsilonGreedy};
use crate::model::{QFunction, QWeights};
use anyhow::Result;
use log::info;
use ndarray::{Array1, Array2};
use pixelq_core::{
    record::{Record, RecordValue::Scalar},
    Agent, Env, ExperienceBufferBase, Policy, ReplayBufferBase, TransitionBatch,
};
use rand::{rngs::SmallRng, SeedableRng};
use std::{fs, marker::PhantomData, path::Path};

/// Bootstrapped target values for a batch of transitions.
///
/// For terminal transitions the target is the reward alone. Otherwise the
/// online network selects the next action and the target network evaluates
/// it, which is the Double DQN correction against the maximization bias of
/// vanilla Q-learning.
pub fn compute_targets(
    q_next_online: &Array2<f32>,
    q_next_tgt: &Array2<f32>,
    reward: &[f32],
    is_done: &[i8],
    discount_factor: f32,
) -> Array1<f32> {
    let mut targets = Array1::zeros(reward.len());
    for i in 0..reward.len() {
        targets[i] = if is_done[i] == 1 {
            reward[i]
        } else {
            let a = argmax(&q_next_online.row(i));
            reward[i] + discount_factor * q_next_tgt[[i, a]]
        };
    }
    targets
}

/// Double DQN agent.
///
/// Owns two independent parameter snapshots: the online network, updated on
/// every optimization step, and the target network, overwritten by a full
/// copy of the online parameters every `sync_interval` optimization steps
/// and frozen in between.
pub struct DoubleDqn<E, Q, R>
where
    E: Env,
    Q: QFunction,
    R: ReplayBufferBase,
{
    qnet: Q,
    qnet_tgt: Q,
    batch_size: usize,
    min_transitions_warmup: usize,
    discount_factor: f32,
    sync_interval: usize,
    explorer: EpsilonGreedy,
    eval_epsilon: f64,
    train: bool,
    env_step: usize,
    n_opts: usize,
    rng: SmallRng,
    phantom: PhantomData<(E, R)>,
}

impl<E, Q, R> DoubleDqn<E, Q, R>
where
    E: Env,
    Q: QFunction,
    R: ReplayBufferBase,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Array2<f32>>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Vec<u32>>,
    E::Obs: Into<Array2<f32>>,
    E::Act: From<u32>,
{
    /// Constructs the agent from a validated configuration and two
    /// Q-functions of identical shape.
    ///
    /// The target network is synchronized with the online network right
    /// away, so both snapshots start out equal.
    pub fn new(config: DoubleDqnConfig, qnet: Q, qnet_tgt: Q) -> Result<Self> {
        config.validate()?;

        let mut agent = DoubleDqn {
            qnet,
            qnet_tgt,
            batch_size: config.batch_size,
            min_transitions_warmup: config.min_transitions_warmup,
            discount_factor: config.discount_factor,
            sync_interval: config.sync_interval,
            explorer: config.explorer,
            eval_epsilon: config.eval_epsilon,
            train: false,
            env_step: 0,
            n_opts: 0,
            rng: SmallRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        };
        agent.sync_target()?;

        Ok(agent)
    }

    /// Copies the online parameters into the target network, fully.
    pub fn sync_target(&mut self) -> Result<()> {
        self.qnet_tgt.set_weights(&self.qnet.weights())
    }

    /// Returns the number of optimization steps performed so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Returns the target network.
    pub fn qnet_tgt(&self) -> &Q {
        &self.qnet_tgt
    }

    /// Returns the online network.
    pub fn qnet(&self) -> &Q {
        &self.qnet
    }

    fn update_critic(&mut self, buffer: &mut R) -> Result<f32> {
        let batch = buffer.batch(self.batch_size)?;
        let (obs, act, next_obs, reward, is_done) = batch.unpack();
        let obs: Array2<f32> = obs.into();
        let next_obs: Array2<f32> = next_obs.into();
        let act: Vec<u32> = act.into();

        let q_next_online = self.qnet.forward(&next_obs);
        let q_next_tgt = self.qnet_tgt.forward(&next_obs);
        let targets = compute_targets(
            &q_next_online,
            &q_next_tgt,
            &reward,
            &is_done,
            self.discount_factor,
        );

        let mut masks = Array2::<f32>::zeros((act.len(), self.qnet.num_actions()));
        for (i, a) in act.iter().enumerate() {
            masks[[i, *a as usize]] = 1.;
        }

        // The loss is reported unmodified; divergence detection is the
        // caller's concern.
        Ok(self.qnet.train_step(&obs, &targets, &masks))
    }

    fn opt_(&mut self, buffer: &mut R) -> Result<Record> {
        let loss = self.update_critic(buffer)?;

        self.n_opts += 1;
        if self.n_opts % self.sync_interval == 0 {
            self.sync_target()?;
            info!("Synchronized the target network at opt step {}", self.n_opts);
        }

        Ok(Record::from_slice(&[
            ("loss", Scalar(loss)),
            (
                "epsilon",
                Scalar(self.explorer.epsilon(self.env_step) as f32),
            ),
        ]))
    }
}

impl<E, Q, R> Policy<E> for DoubleDqn<E, Q, R>
where
    E: Env,
    Q: QFunction,
    R: ReplayBufferBase,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Array2<f32>>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Vec<u32>>,
    E::Obs: Into<Array2<f32>>,
    E::Act: From<u32>,
{
    /// In training mode, epsilon follows the linear schedule over the
    /// agent's elapsed training steps. In evaluation mode, a small fixed
    /// epsilon keeps a residue of behavioral stochasticity.
    fn sample(&mut self, obs: &E::Obs) -> E::Act {
        let obs: Array2<f32> = obs.clone().into();
        let q = self.qnet.forward(&obs);

        let epsilon = if self.train {
            let eps = self.explorer.epsilon(self.env_step);
            self.env_step += 1;
            eps
        } else {
            self.eval_epsilon
        };

        let a = self.explorer.select(&q.row(0), epsilon, &mut self.rng);
        a.into()
    }
}

impl<E, Q, R> Agent<E, R> for DoubleDqn<E, Q, R>
where
    E: Env,
    Q: QFunction,
    R: ReplayBufferBase + ExperienceBufferBase,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Array2<f32>>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Vec<u32>>,
    E::Obs: Into<Array2<f32>>,
    E::Act: From<u32>,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt(&mut self, buffer: &mut R) -> Result<Option<Record>> {
        if buffer.len() >= self.min_transitions_warmup {
            Ok(Some(self.opt_(buffer)?))
        } else {
            Ok(None)
        }
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.weights().save(&path.join("qnet.bincode"))?;
        self.qnet_tgt
            .weights()
            .save(&path.join("qnet_tgt.bincode"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet
            .set_weights(&QWeights::load(&path.join("qnet.bincode"))?)?;
        self.qnet_tgt
            .set_weights(&QWeights::load(&path.join("qnet_tgt.bincode"))?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearQNet, LinearQNetConfig};
    use ndarray::arr2;
    use pixelq_core::{
        replay::{BatchBase, RingReplayBuffer, RingReplayBufferConfig, RingTransitionBatch},
        Act, Configurable, ExperienceBufferBase, Obs, Step,
    };

    const OBS_DIM: usize = 2;

    #[derive(Clone, Debug)]
    struct VecObs(Vec<f32>);

    impl Obs for VecObs {
        fn dummy() -> Self {
            Self(vec![0.; OBS_DIM])
        }
    }

    impl From<VecObs> for Array2<f32> {
        fn from(obs: VecObs) -> Self {
            Array2::from_shape_vec((1, OBS_DIM), obs.0).unwrap()
        }
    }

    #[derive(Clone, Debug)]
    struct DiscreteAct(u32);

    impl Act for DiscreteAct {}

    impl From<u32> for DiscreteAct {
        fn from(a: u32) -> Self {
            Self(a)
        }
    }

    struct TestEnv;

    impl Env for TestEnv {
        type Config = ();
        type Obs = VecObs;
        type Act = DiscreteAct;
        type Info = ();

        fn build(_config: &Self::Config, _seed: u64) -> Result<Self> {
            Ok(Self)
        }

        fn step(&mut self, a: &Self::Act) -> (Step<Self>, Record) {
            let step = Step::new(VecObs::dummy(), a.clone(), 0., false, ());
            (step, Record::empty())
        }

        fn reset(&mut self) -> Result<Self::Obs> {
            Ok(VecObs::dummy())
        }

        fn num_actions(&self) -> usize {
            2
        }
    }

    #[derive(Clone, Debug)]
    struct ObsStore(Vec<f32>);

    impl BatchBase for ObsStore {
        fn new(capacity: usize) -> Self {
            Self(vec![0.; capacity * OBS_DIM])
        }

        fn push(&mut self, ix: usize, data: Self) {
            let capacity = self.0.len() / OBS_DIM;
            let mut j = ix;
            for row in data.0.chunks(OBS_DIM) {
                self.0[j * OBS_DIM..(j + 1) * OBS_DIM].copy_from_slice(row);
                j += 1;
                if j == capacity {
                    j = 0;
                }
            }
        }

        fn sample(&self, ixs: &[usize]) -> Self {
            let mut data = Vec::with_capacity(ixs.len() * OBS_DIM);
            for ix in ixs.iter() {
                data.extend_from_slice(&self.0[ix * OBS_DIM..(ix + 1) * OBS_DIM]);
            }
            Self(data)
        }
    }

    impl From<ObsStore> for Array2<f32> {
        fn from(store: ObsStore) -> Self {
            let n = store.0.len() / OBS_DIM;
            Array2::from_shape_vec((n, OBS_DIM), store.0).unwrap()
        }
    }

    #[derive(Clone, Debug)]
    struct ActStore(Vec<u32>);

    impl BatchBase for ActStore {
        fn new(capacity: usize) -> Self {
            Self(vec![0; capacity])
        }

        fn push(&mut self, ix: usize, data: Self) {
            let capacity = self.0.len();
            let mut j = ix;
            for a in data.0.iter() {
                self.0[j] = *a;
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

    impl From<ActStore> for Vec<u32> {
        fn from(store: ActStore) -> Self {
            store.0
        }
    }

    type TestBuffer = RingReplayBuffer<ObsStore, ActStore>;
    type TestAgent = DoubleDqn<TestEnv, LinearQNet, TestBuffer>;

    fn agent(config: DoubleDqnConfig) -> TestAgent {
        let qnet_config = LinearQNetConfig::default()
            .in_dim(OBS_DIM)
            .out_dim(2)
            .learning_rate(0.1);
        let qnet = LinearQNet::build(qnet_config.clone());
        let qnet_tgt = LinearQNet::build(qnet_config.seed(7));
        DoubleDqn::new(config, qnet, qnet_tgt).unwrap()
    }

    fn filled_buffer(n: usize) -> TestBuffer {
        let mut buffer = TestBuffer::build(&RingReplayBufferConfig::default().capacity(16));
        for i in 0..n {
            buffer
                .push(RingTransitionBatch {
                    obs: ObsStore(vec![i as f32, 1.]),
                    act: ActStore(vec![(i % 2) as u32]),
                    next_obs: ObsStore(vec![i as f32 + 1., 1.]),
                    reward: vec![1.],
                    is_done: vec![0],
                })
                .unwrap();
        }
        buffer
    }

    #[test]
    fn no_optimization_before_warmup() {
        let mut agent = agent(
            DoubleDqnConfig::default()
                .batch_size(4)
                .min_transitions_warmup(8),
        );
        let mut buffer = filled_buffer(7);

        assert!(agent.opt(&mut buffer).unwrap().is_none());
        assert_eq!(agent.n_opts(), 0);

        buffer
            .push(RingTransitionBatch {
                obs: ObsStore(vec![0., 1.]),
                act: ActStore(vec![0]),
                next_obs: ObsStore(vec![1., 1.]),
                reward: vec![1.],
                is_done: vec![0],
            })
            .unwrap();
        assert!(agent.opt(&mut buffer).unwrap().is_some());
        assert_eq!(agent.n_opts(), 1);
    }

    #[test]
    fn target_frozen_between_syncs() {
        let mut agent = agent(
            DoubleDqnConfig::default()
                .batch_size(4)
                .min_transitions_warmup(4)
                .sync_interval(3),
        );
        let mut buffer = filled_buffer(8);

        // The constructor synchronizes the two networks.
        assert_eq!(agent.qnet().weights(), agent.qnet_tgt().weights());
        let initial_tgt = agent.qnet_tgt().weights();

        agent.train();
        agent.opt(&mut buffer).unwrap();
        agent.opt(&mut buffer).unwrap();

        // Two opt steps moved the online network; the target kept the
        // snapshot taken at construction.
        assert_ne!(agent.qnet().weights(), initial_tgt);
        assert_eq!(agent.qnet_tgt().weights(), initial_tgt);

        // The third opt step triggers a full hard copy.
        agent.opt(&mut buffer).unwrap();
        assert_eq!(agent.qnet().weights(), agent.qnet_tgt().weights());

        // And the next one leaves the fresh snapshot frozen again.
        let synced = agent.qnet_tgt().weights();
        agent.opt(&mut buffer).unwrap();
        assert_ne!(agent.qnet().weights(), synced);
        assert_eq!(agent.qnet_tgt().weights(), synced);
    }

    #[test]
    fn save_load_restores_both_networks() -> Result<()> {
        let dir = tempdir::TempDir::new("double_dqn")?;
        let mut a = agent(
            DoubleDqnConfig::default()
                .batch_size(4)
                .min_transitions_warmup(4)
                .sync_interval(100),
        );
        let mut buffer = filled_buffer(8);
        a.train();
        for _ in 0..5 {
            a.opt(&mut buffer)?;
        }
        a.save_params(dir.path())?;

        let mut b = agent(DoubleDqnConfig::default().seed(99));
        b.load_params(dir.path())?;
        assert_eq!(a.qnet().weights(), b.qnet().weights());
        assert_eq!(a.qnet_tgt().weights(), b.qnet_tgt().weights());
        Ok(())
    }

    #[test]
    fn terminal_target_is_reward_alone() {
        let q_next_online = arr2(&[[5., 50.], [1., 2.]]);
        let q_next_tgt = arr2(&[[100., 200.], [3., 4.]]);
        let reward = vec![1.5, 0.];
        let is_done = vec![1, 1];

        for gamma in [0.5f32, 0.9, 0.99].iter() {
            let targets =
                compute_targets(&q_next_online, &q_next_tgt, &reward, &is_done, *gamma);
            assert_eq!(targets[0], 1.5);
            assert_eq!(targets[1], 0.);
        }
    }

    #[test]
    fn online_selects_target_evaluates() {
        // Online argmax is action 1; the target's own maximum sits at
        // action 0 and must be ignored.
        let q_next_online = arr2(&[[0.1, 0.9]]);
        let q_next_tgt = arr2(&[[100., 2.]]);
        let reward = vec![1.];
        let is_done = vec![0];

        let targets = compute_targets(&q_next_online, &q_next_tgt, &reward, &is_done, 0.5);
        assert!((targets[0] - (1. + 0.5 * 2.)).abs() < 1e-6);
    }
}
