// SPDX-License-Identifier: MPL-2.0
//! Deterministic film-grain synthesis.
//!
//! Grain is generated from a per-pixel integer hash rather than an RNG, so
//! the same input always produces the same output and concurrent calls need
//! no shared state.

use crate::error::EnhanceResult;
use crate::image::ImageBuffer;
use crate::kernels::check_strength;

/// Peak grain amplitude at `amount = 1`.
const BASE_AMPLITUDE: f32 = 0.03;

/// Fixed seed folded into the coordinate hash.
const SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Adds monochrome grain with amplitude `BASE_AMPLITUDE * amount`.
///
/// The same offset is applied to every channel of a pixel, which reads as
/// luminance grain rather than chroma noise.
///
/// # Errors
///
/// Returns [`crate::error::EnhanceError::InvalidParameter`] if `amount` is
/// outside `[0, 2]`.
pub fn grain(image: &ImageBuffer, amount: f32) -> EnhanceResult<ImageBuffer> {
    check_strength("grain_amount", amount)?;
    if amount == 0.0 {
        return Ok(image.clone());
    }

    let amplitude = BASE_AMPLITUDE * amount;
    let channels = image.channels() as usize;
    let width = image.width() as usize;

    let mut out = Vec::with_capacity(image.data().len());
    for (i, px) in image.data().chunks_exact(channels).enumerate() {
        let x = (i % width) as u64;
        let y = (i / width) as u64;
        let offset = amplitude * noise_at(x, y);
        for &v in px {
            out.push(v + offset);
        }
    }
    ImageBuffer::from_unclamped(image.width(), image.height(), image.channels(), out)
}

/// Hash of pixel coordinates mapped to `[-1, 1]` (splitmix64 finalizer).
fn noise_at(x: u64, y: u64) -> f32 {
    let mut z = x.wrapping_mul(0x85eb_ca6b_ed1a_7b99) ^ y.wrapping_mul(0xc2b2_ae3d_27d4_eb4f);
    z = z.wrapping_add(SEED);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    // Take the top 24 bits for a uniform mantissa.
    let unit = (z >> 40) as f32 / (1u64 << 24) as f32;
    unit * 2.0 - 1.0
}
