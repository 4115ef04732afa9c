// SPDX-License-Identifier: MPL-2.0
//! Bicubic resampling.
//!
//! One deterministic interpolation path serves three callers: the input
//! upsampling stage of the super-resolution model, the pure-bicubic fallback,
//! and the comparison resize performed before scoring. Keeping them on the
//! same kernel makes fallback output and scoring reproducible.

use crate::error::EnhanceResult;
use crate::image::ImageBuffer;

/// Catmull-Rom spline coefficient (the classic `a = -0.5` cubic).
const CUBIC_A: f32 = -0.5;

/// Cubic convolution weight for a sample at distance `t` (|t| < 2).
fn cubic_weight(t: f32) -> f32 {
    let t = t.abs();
    if t < 1.0 {
        (CUBIC_A + 2.0) * t * t * t - (CUBIC_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        CUBIC_A * t * t * t - 5.0 * CUBIC_A * t * t + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Resizes an image to `target_width` x `target_height` using cubic
/// convolution over a 4x4 neighborhood with border replication.
///
/// Output samples are clamped back into `[0, 1]` (cubic lobes can overshoot
/// near hard edges).
///
/// # Errors
///
/// Returns [`crate::error::EnhanceError::InvalidInput`] if the target shape
/// is empty.
pub fn resize_bicubic(
    image: &ImageBuffer,
    target_width: u32,
    target_height: u32,
) -> EnhanceResult<ImageBuffer> {
    if target_width == image.width() && target_height == image.height() {
        return Ok(image.clone());
    }

    let channels = image.channels();
    let scale_x = f64::from(image.width()) / f64::from(target_width);
    let scale_y = f64::from(image.height()) / f64::from(target_height);

    let mut out =
        Vec::with_capacity(target_width as usize * target_height as usize * channels as usize);

    for oy in 0..target_height {
        // Pixel-center mapping keeps the result aligned with the source grid.
        let src_y = (f64::from(oy) + 0.5) * scale_y - 0.5;
        #[allow(clippy::cast_possible_truncation)]
        let y0 = src_y.floor() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let fy = (src_y - src_y.floor()) as f32;

        let wy: [f32; 4] = [
            cubic_weight(fy + 1.0),
            cubic_weight(fy),
            cubic_weight(fy - 1.0),
            cubic_weight(fy - 2.0),
        ];

        for ox in 0..target_width {
            let src_x = (f64::from(ox) + 0.5) * scale_x - 0.5;
            #[allow(clippy::cast_possible_truncation)]
            let x0 = src_x.floor() as i64;
            #[allow(clippy::cast_possible_truncation)]
            let fx = (src_x - src_x.floor()) as f32;

            let wx: [f32; 4] = [
                cubic_weight(fx + 1.0),
                cubic_weight(fx),
                cubic_weight(fx - 1.0),
                cubic_weight(fx - 2.0),
            ];

            for c in 0..channels {
                let mut acc = 0.0f32;
                for (j, &row_weight) in wy.iter().enumerate() {
                    let sy = y0 - 1 + j as i64;
                    for (i, &col_weight) in wx.iter().enumerate() {
                        let sx = x0 - 1 + i as i64;
                        acc += row_weight * col_weight * image.sample_clamped(sx, sy, c);
                    }
                }
                out.push(acc);
            }
        }
    }

    ImageBuffer::from_unclamped(target_width, target_height, channels, out)
}
