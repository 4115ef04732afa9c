// SPDX-License-Identifier: MPL-2.0
//! Primitive image operators.
//!
//! Every kernel here is a pure function over an [`ImageBuffer`]: no I/O, no
//! shared state, output shape identical to input shape, and a freshly
//! allocated result buffer (inputs are never modified, even partially).
//! All arithmetic is clamped back into `[0, 1]` before a buffer is returned.
//!
//! Strength-style parameters accept `[0, 2]`, where 0 is the identity
//! transform. Out-of-range values fail with
//! [`EnhanceError::InvalidParameter`] before any pixel work happens.

mod color;
mod denoise;
mod equalize;
mod grain;
mod morphology;
mod sharpen;
mod tone;

pub use color::{color_balance, desaturate, vintage_tone};
pub use denoise::denoise;
pub use equalize::equalize_adaptive;
pub use grain::grain;
pub use morphology::{morphological_clean, MorphOp};
pub use sharpen::sharpen;
pub use tone::{auto_contrast, gamma_correct, tone_map};

use crate::error::{EnhanceError, EnhanceResult};
use crate::image::ImageBuffer;

/// Inclusive upper bound for strength-style parameters.
pub const MAX_STRENGTH: f32 = 2.0;

/// Validates a strength parameter against `[0, MAX_STRENGTH]`.
pub(crate) fn check_strength(name: &'static str, value: f32) -> EnhanceResult<()> {
    if !value.is_finite() || !(0.0..=MAX_STRENGTH).contains(&value) {
        return Err(EnhanceError::InvalidParameter {
            name,
            reason: format!("{value} is outside [0, {MAX_STRENGTH}]"),
        });
    }
    Ok(())
}

/// Builds normalized 1D Gaussian taps for the given sigma.
///
/// The radius is `ceil(3 * sigma)`, which captures >99% of the mass.
pub(crate) fn gaussian_taps(sigma: f32) -> Vec<f32> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (sigma * 3.0).ceil().max(1.0) as i64;
    let mut taps = Vec::with_capacity((2 * radius + 1) as usize);
    let denom = 2.0 * sigma * sigma;
    for i in -radius..=radius {
        let d = i as f32;
        taps.push((-d * d / denom).exp());
    }
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

/// Separable Gaussian blur over a single plane with border replication.
pub(crate) fn gaussian_blur_plane(plane: &[f32], width: u32, height: u32, sigma: f32) -> Vec<f32> {
    let taps = gaussian_taps(sigma);
    let radius = (taps.len() / 2) as i64;
    let w = width as usize;
    let h = height as usize;

    // Horizontal pass.
    let mut tmp = vec![0.0f32; plane.len()];
    for y in 0..h {
        let row = &plane[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (i, &t) in taps.iter().enumerate() {
                let sx = (x as i64 + i as i64 - radius).clamp(0, w as i64 - 1) as usize;
                acc += t * row[sx];
            }
            tmp[y * w + x] = acc;
        }
    }

    // Vertical pass.
    let mut out = vec![0.0f32; plane.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, &t) in taps.iter().enumerate() {
                let sy = (y as i64 + i as i64 - radius).clamp(0, h as i64 - 1) as usize;
                acc += t * tmp[sy * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// Gaussian blur over every channel of an image.
pub(crate) fn gaussian_blur(image: &ImageBuffer, sigma: f32) -> EnhanceResult<ImageBuffer> {
    let w = image.width();
    let h = image.height();
    let channels = image.channels();
    let plane_len = image.pixel_count();

    let mut out = vec![0.0f32; image.data().len()];
    for c in 0..channels {
        let mut plane = Vec::with_capacity(plane_len);
        for y in 0..h {
            for x in 0..w {
                plane.push(image.sample(x, y, c));
            }
        }
        let blurred = gaussian_blur_plane(&plane, w, h, sigma);
        for (i, v) in blurred.into_iter().enumerate() {
            out[i * channels as usize + c as usize] = v;
        }
    }
    ImageBuffer::from_unclamped(w, h, channels, out)
}

/// Rescales every channel of a pixel by `new_luma / old_luma`.
///
/// This is how luma-space corrections (CLAHE, auto-contrast) are folded back
/// into color images without shifting hue.
pub(crate) fn apply_luma_gain(
    image: &ImageBuffer,
    old_luma: &[f32],
    new_luma: &[f32],
) -> EnhanceResult<ImageBuffer> {
    let channels = image.channels() as usize;
    let mut out = Vec::with_capacity(image.data().len());
    for (i, px) in image.data().chunks_exact(channels).enumerate() {
        // Guard against division by zero in pure black regions.
        let gain = if old_luma[i] > 1e-6 {
            new_luma[i] / old_luma[i]
        } else {
            1.0
        };
        for &v in px {
            out.push(v * gain);
        }
    }
    ImageBuffer::from_unclamped(image.width(), image.height(), image.channels(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_range_is_enforced() {
        assert!(check_strength("denoise_strength", 0.0).is_ok());
        assert!(check_strength("denoise_strength", 2.0).is_ok());
        assert!(check_strength("denoise_strength", -0.1).is_err());
        assert!(check_strength("denoise_strength", 2.1).is_err());
        assert!(check_strength("denoise_strength", f32::NAN).is_err());
    }

    #[test]
    fn gaussian_taps_are_normalized() {
        for sigma in [0.5, 1.0, 2.5] {
            let taps = gaussian_taps(sigma);
            let sum: f32 = taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert_eq!(taps.len() % 2, 1);
        }
    }

    #[test]
    fn blur_preserves_flat_plane() {
        let plane = vec![0.3f32; 8 * 8];
        let blurred = gaussian_blur_plane(&plane, 8, 8, 1.5);
        for v in blurred {
            assert!((v - 0.3).abs() < 1e-5);
        }
    }

    #[test]
    fn blur_reduces_contrast_of_impulse() {
        let mut plane = vec![0.0f32; 9 * 9];
        plane[4 * 9 + 4] = 1.0;
        let blurred = gaussian_blur_plane(&plane, 9, 9, 1.0);
        let peak = blurred[4 * 9 + 4];
        assert!(peak < 1.0 && peak > 0.0);
        // Mass is conserved away from borders.
        let sum: f32 = blurred.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn luma_gain_is_identity_for_equal_planes() {
        let image = ImageBuffer::filled(4, 4, 3, 0.5).unwrap();
        let luma = image.luma();
        let result = apply_luma_gain(&image, &luma, &luma).unwrap();
        for (a, b) in result.data().iter().zip(image.data()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
