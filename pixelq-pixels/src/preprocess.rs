//! Frame preprocessing.
//!
//! The preprocessing matches the classic DQN pipeline: each RGB frame is
//! resized to 84x84 with bilinear filtering and reduced to a single
//! luminance channel.
use crate::{FRAME_LEN, FRAME_SIZE};
use anyhow::Result;
use image::{
    imageops::{grayscale, resize, FilterType::Triangle},
    ImageBuffer, Luma, Rgb,
};
use pixelq_core::error::PixelqError;

/// Warps a `w` x `h` RGB frame to an 84x84 grayscale frame.
///
/// `rgb` holds `w * h * 3` bytes in row-major RGB order; anything else is a
/// fatal mismatch between the game's reported dimensions and its render
/// buffer.
pub fn warp_and_grayscale(w: u32, h: u32, rgb: Vec<u8>) -> Result<Vec<u8>> {
    let got = rgb.len();
    let img = ImageBuffer::<Rgb<u8>, _>::from_vec(w, h, rgb).ok_or(
        PixelqError::FrameShapeMismatch {
            expected: (w * h * 3) as usize,
            got,
        },
    )?;
    let img = resize(&img, FRAME_SIZE as u32, FRAME_SIZE as u32, Triangle);
    let img: ImageBuffer<Luma<u8>, _> = grayscale(&img);
    let buf = img.into_vec();
    debug_assert_eq!(buf.len(), FRAME_LEN);
    Ok(buf)
}

/// Pixel-wise maximum of two frames of equal length.
///
/// Taking the maximum over the last two frames of a skip window removes the
/// flicker of games that draw sprites on alternating frames only.
pub fn max_pool(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(&a, &b)| a.max(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warp_produces_84x84_luminance() {
        let (w, h) = (64u32, 48u32);
        let rgb = vec![255u8; (w * h * 3) as usize];

        let frame = warp_and_grayscale(w, h, rgb).unwrap();
        assert_eq!(frame.len(), FRAME_LEN);
        // A uniformly white input stays white after warping.
        assert!(frame.iter().all(|&p| p == 255));
    }

    #[test]
    fn warp_rejects_wrong_buffer_size() {
        assert!(warp_and_grayscale(64, 48, vec![0u8; 10]).is_err());
    }

    #[test]
    fn max_pool_is_elementwise() {
        let a = vec![0u8, 200, 7, 7];
        let b = vec![100u8, 100, 7, 8];
        assert_eq!(max_pool(&a, &b), vec![100, 200, 7, 8]);
    }
}
