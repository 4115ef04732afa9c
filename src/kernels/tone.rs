// SPDX-License-Identifier: MPL-2.0
//! Tonal adjustments: gamma, percentile contrast stretch, and tone mapping.

use crate::error::{EnhanceError, EnhanceResult};
use crate::image::ImageBuffer;
use crate::kernels::{apply_luma_gain, check_strength};

/// Applies per-sample gamma correction: `out = in^(1/gamma)`.
///
/// Gamma above 1 brightens midtones, below 1 darkens them; 1 is identity.
///
/// # Errors
///
/// Returns [`EnhanceError::InvalidParameter`] unless `gamma` is finite and
/// strictly positive.
pub fn gamma_correct(image: &ImageBuffer, gamma: f32) -> EnhanceResult<ImageBuffer> {
    if !gamma.is_finite() || gamma <= 0.0 {
        return Err(EnhanceError::InvalidParameter {
            name: "gamma",
            reason: format!("{gamma} is not strictly positive"),
        });
    }

    let inv = 1.0 / gamma;
    let out: Vec<f32> = image.data().iter().map(|&v| v.powf(inv)).collect();
    ImageBuffer::from_unclamped(image.width(), image.height(), image.channels(), out)
}

/// Stretches luma so the 1st/99th percentiles land on 0 and 1.
///
/// Flat images (percentile spread below noise floor) are returned unchanged
/// instead of being blown out.
///
/// # Errors
///
/// Propagates buffer construction errors.
pub fn auto_contrast(image: &ImageBuffer) -> EnhanceResult<ImageBuffer> {
    let luma = image.luma();

    let mut sorted = luma.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pick = |q: f32| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = ((sorted.len() - 1) as f32 * q).round() as usize;
        sorted[idx]
    };
    let low = pick(0.01);
    let high = pick(0.99);

    if high - low < 1e-4 {
        return Ok(image.clone());
    }

    let scale = 1.0 / (high - low);
    let new_luma: Vec<f32> = luma
        .iter()
        .map(|&v| ((v - low) * scale).clamp(0.0, 1.0))
        .collect();
    apply_luma_gain(image, &luma, &new_luma)
}

/// Reinhard-style tone compression followed by a gamma lift.
///
/// `intensity` in `[0, 2]` controls the post-compression exponent.
///
/// # Errors
///
/// Returns [`EnhanceError::InvalidParameter`] if `intensity` is outside
/// `[0, 2]`.
pub fn tone_map(image: &ImageBuffer, intensity: f32) -> EnhanceResult<ImageBuffer> {
    check_strength("hdr_intensity", intensity)?;

    let exponent = 1.0 / (intensity + 1.0);
    let out: Vec<f32> = image
        .data()
        .iter()
        .map(|&v| {
            let compressed = v / (1.0 + v);
            // Renormalize so white maps back to white before the lift.
            (compressed * 2.0).powf(exponent)
        })
        .collect();
    ImageBuffer::from_unclamped(image.width(), image.height(), image.channels(), out)
}
