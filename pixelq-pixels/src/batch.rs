//! Replay buffer storage for stacked frames and discrete actions.
use crate::{PixelAct, StackedObs};
use ndarray::Array2;
use pixelq_core::replay::BatchBase;

/// Replay storage for stacked frame observations, kept as `u8`.
///
/// The observation length is not known when the buffer is created, so the
/// backing store is allocated lazily on the first push. A batch sampled
/// from a 100k-capacity buffer of 4x84x84 observations would occupy eight
/// times the memory as `f32`; keeping bytes here and converting at the
/// network boundary is what makes that capacity affordable.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    buf: Vec<u8>,
    capacity: usize,
    obs_len: usize,
}

impl FrameBatch {
    fn items(&self) -> usize {
        if self.obs_len == 0 {
            0
        } else {
            self.buf.len() / self.obs_len
        }
    }
}

impl From<StackedObs> for FrameBatch {
    fn from(obs: StackedObs) -> Self {
        let buf = obs.as_slice().to_vec();
        let obs_len = buf.len();
        Self {
            buf,
            capacity: 1,
            obs_len,
        }
    }
}

impl BatchBase for FrameBatch {
    fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
            obs_len: 0,
        }
    }

    fn push(&mut self, ix: usize, data: Self) {
        if self.obs_len == 0 {
            self.obs_len = data.obs_len;
            self.buf = vec![0; self.capacity * self.obs_len];
        }
        assert_eq!(data.obs_len, self.obs_len);

        let n = self.obs_len;
        let mut j = ix;
        for item in data.buf.chunks(n) {
            self.buf[j * n..(j + 1) * n].copy_from_slice(item);
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        let n = self.obs_len;
        let mut buf = Vec::with_capacity(ixs.len() * n);
        for ix in ixs.iter() {
            buf.extend_from_slice(&self.buf[ix * n..(ix + 1) * n]);
        }
        Self {
            buf,
            capacity: ixs.len(),
            obs_len: n,
        }
    }
}

impl From<FrameBatch> for Array2<f32> {
    fn from(batch: FrameBatch) -> Self {
        let (items, obs_len) = (batch.items(), batch.obs_len);
        let data = batch.buf.iter().map(|&p| p as f32 / 255.).collect();
        Array2::from_shape_vec((items, obs_len), data)
            .expect("the store holds a whole number of observations")
    }
}

/// Replay storage for discrete action indices.
#[derive(Debug, Clone)]
pub struct DiscreteActBatch {
    acts: Vec<u32>,
}

impl From<PixelAct> for DiscreteActBatch {
    fn from(act: PixelAct) -> Self {
        Self {
            acts: vec![act.act],
        }
    }
}

impl BatchBase for DiscreteActBatch {
    fn new(capacity: usize) -> Self {
        Self {
            acts: vec![0; capacity],
        }
    }

    fn push(&mut self, ix: usize, data: Self) {
        let capacity = self.acts.len();
        let mut j = ix;
        for a in data.acts.iter() {
            self.acts[j] = *a;
            j += 1;
            if j == capacity {
                j = 0;
            }
        }
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        Self {
            acts: ixs.iter().map(|ix| self.acts[*ix]).collect(),
        }
    }
}

impl From<DiscreteActBatch> for Vec<u32> {
    fn from(batch: DiscreteActBatch) -> Self {
        batch.acts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(v: u8, len: usize) -> StackedObs {
        StackedObs::from(vec![v; len])
    }

    #[test]
    fn frame_store_allocates_on_first_push() {
        let mut store = FrameBatch::new(3);
        assert_eq!(store.items(), 0);

        store.push(0, FrameBatch::from(obs(1, 8)));
        store.push(1, FrameBatch::from(obs(2, 8)));
        assert_eq!(store.items(), 3);

        let sampled = store.sample(&[1, 0, 1]);
        let arr: Array2<f32> = sampled.into();
        assert_eq!(arr.dim(), (3, 8));
        assert!((arr[[0, 0]] - 2. / 255.).abs() < 1e-6);
        assert!((arr[[1, 0]] - 1. / 255.).abs() < 1e-6);
    }

    #[test]
    fn frame_store_wraps_at_capacity() {
        let mut store = FrameBatch::new(2);
        store.push(0, FrameBatch::from(obs(1, 4)));
        store.push(1, FrameBatch::from(obs(2, 4)));
        store.push(0, FrameBatch::from(obs(3, 4)));

        let sampled = store.sample(&[0, 1]);
        assert_eq!(sampled.buf[0], 3);
        assert_eq!(sampled.buf[4], 2);
    }

    #[test]
    fn act_store_roundtrip() {
        let mut store = DiscreteActBatch::new(4);
        for (i, a) in [3u32, 1, 2].iter().enumerate() {
            store.push(i, DiscreteActBatch::from(PixelAct::new(*a)));
        }

        let acts: Vec<u32> = store.sample(&[2, 0]).into();
        assert_eq!(acts, vec![2, 3]);
    }
}
