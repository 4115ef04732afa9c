// SPDX-License-Identifier: MPL-2.0
//! Color corrections: gray-world balance, desaturation, and the vintage
//! color transform.

use crate::error::EnhanceResult;
use crate::image::ImageBuffer;

/// Sepia mixing matrix rows (r, g, b contributions per output channel).
const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Black lift applied by the vintage fade.
const FADE_LIFT: f32 = 0.04;

/// Corrects channel-wise gray-world bias.
///
/// Each channel is scaled so its mean matches the global mean, which
/// neutralizes uniform color casts. Single-channel images are returned
/// unchanged, since there is no cast to correct.
///
/// # Errors
///
/// Propagates buffer construction errors.
pub fn color_balance(image: &ImageBuffer) -> EnhanceResult<ImageBuffer> {
    if image.channels() == 1 {
        return Ok(image.clone());
    }

    let mut sums = [0.0f64; 3];
    for px in image.data().chunks_exact(3) {
        for (c, &v) in px.iter().enumerate() {
            sums[c] += f64::from(v);
        }
    }
    let count = image.pixel_count() as f64;
    let means = [sums[0] / count, sums[1] / count, sums[2] / count];
    let gray = (means[0] + means[1] + means[2]) / 3.0;

    let gains: Vec<f32> = means
        .iter()
        .map(|&m| if m > 1e-6 { (gray / m) as f32 } else { 1.0 })
        .collect();

    let out: Vec<f32> = image
        .data()
        .chunks_exact(3)
        .flat_map(|px| [px[0] * gains[0], px[1] * gains[1], px[2] * gains[2]])
        .collect();
    ImageBuffer::from_unclamped(image.width(), image.height(), 3, out)
}

/// Replaces every channel with the pixel's luma, preserving shape.
///
/// Three-channel inputs stay three-channel so the mode contract
/// (`enhanced.shape == original.shape`) holds for monochrome conversions.
///
/// # Errors
///
/// Propagates buffer construction errors.
pub fn desaturate(image: &ImageBuffer) -> EnhanceResult<ImageBuffer> {
    if image.channels() == 1 {
        return Ok(image.clone());
    }
    let luma = image.luma();
    let out: Vec<f32> = luma.iter().flat_map(|&l| [l, l, l]).collect();
    ImageBuffer::from_unclamped(image.width(), image.height(), 3, out)
}

/// Applies the vintage look: sepia mix blended with the original, plus a
/// faded black point.
///
/// Single-channel images receive the fade only.
///
/// # Errors
///
/// Propagates buffer construction errors.
pub fn vintage_tone(image: &ImageBuffer) -> EnhanceResult<ImageBuffer> {
    let out: Vec<f32> = if image.channels() == 1 {
        image
            .data()
            .iter()
            .map(|&v| v * (1.0 - FADE_LIFT) + FADE_LIFT)
            .collect()
    } else {
        image
            .data()
            .chunks_exact(3)
            .flat_map(|px| {
                let mut mixed = [0.0f32; 3];
                for (c, row) in SEPIA.iter().enumerate() {
                    let sepia = row[0] * px[0] + row[1] * px[1] + row[2] * px[2];
                    // 70/30 blend keeps some of the original color alive.
                    let blended = 0.7 * sepia + 0.3 * px[c];
                    mixed[c] = blended * (1.0 - FADE_LIFT) + FADE_LIFT;
                }
                mixed
            })
            .collect()
    };
    ImageBuffer::from_unclamped(image.width(), image.height(), image.channels(), out)
}
