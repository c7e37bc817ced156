//! Stacked frame observation.
use crate::FRAME_LEN;
use ndarray::Array2;
use pixelq_core::Obs;

/// An observation of stacked 84x84 grayscale frames, flat and `u8`.
///
/// Conversion to `f32` and scaling to `[0, 1]` happens only when the
/// observation crosses into a Q-function.
#[derive(Debug, Clone)]
pub struct StackedObs {
    frames: Vec<u8>,
}

impl StackedObs {
    /// The raw stacked frames, oldest first.
    pub fn as_slice(&self) -> &[u8] {
        &self.frames
    }
}

impl From<Vec<u8>> for StackedObs {
    fn from(frames: Vec<u8>) -> Self {
        Self { frames }
    }
}

impl Obs for StackedObs {
    fn dummy() -> Self {
        Self {
            frames: vec![0; 4 * FRAME_LEN],
        }
    }
}

impl From<StackedObs> for Array2<f32> {
    fn from(obs: StackedObs) -> Self {
        let data = obs.frames.iter().map(|&p| p as f32 / 255.).collect();
        Array2::from_shape_vec((1, obs.frames.len()), data)
            .expect("a flat buffer always reshapes to one row")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_normalizes_to_unit_range() {
        let obs = StackedObs::from(vec![0u8, 51, 255]);
        let arr: Array2<f32> = obs.into();
        assert_eq!(arr.dim(), (1, 3));
        assert_eq!(arr[[0, 0]], 0.);
        assert_eq!(arr[[0, 1]], 0.2);
        assert_eq!(arr[[0, 2]], 1.);
    }
}
