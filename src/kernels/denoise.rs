// SPDX-License-Identifier: MPL-2.0
//! Edge-preserving bilateral denoise.

use crate::error::EnhanceResult;
use crate::image::ImageBuffer;
use crate::kernels::check_strength;

/// Spatial radius of the bilateral window.
const RADIUS: i64 = 3;

/// Applies edge-preserving smoothing with a bilateral filter.
///
/// Weights combine spatial proximity and intensity similarity, so flat
/// regions are smoothed while edges survive. `strength` in `[0, 2]` scales
/// both falloffs; 0 returns an identical copy.
///
/// # Errors
///
/// Returns [`crate::error::EnhanceError::InvalidParameter`] if `strength` is
/// outside `[0, 2]`.
pub fn denoise(image: &ImageBuffer, strength: f32) -> EnhanceResult<ImageBuffer> {
    check_strength("denoise_strength", strength)?;
    if strength == 0.0 {
        return Ok(image.clone());
    }

    // Falloffs widen with strength; the range sigma stays small enough that
    // strong edges keep near-zero weight.
    let sigma_space = 0.8 + strength;
    let sigma_range = 0.04 + 0.06 * strength;
    let space_denom = 2.0 * sigma_space * sigma_space;
    let range_denom = 2.0 * sigma_range * sigma_range;

    // Spatial weights are shift-invariant; precompute the window once.
    let mut spatial = [[0.0f32; (2 * RADIUS + 1) as usize]; (2 * RADIUS + 1) as usize];
    for dy in -RADIUS..=RADIUS {
        for dx in -RADIUS..=RADIUS {
            let d2 = (dx * dx + dy * dy) as f32;
            spatial[(dy + RADIUS) as usize][(dx + RADIUS) as usize] = (-d2 / space_denom).exp();
        }
    }

    let channels = image.channels();
    let mut out = Vec::with_capacity(image.data().len());

    for y in 0..image.height() {
        for x in 0..image.width() {
            for c in 0..channels {
                let center = image.sample(x, y, c);
                let mut acc = 0.0f32;
                let mut norm = 0.0f32;
                for dy in -RADIUS..=RADIUS {
                    for dx in -RADIUS..=RADIUS {
                        let neighbor =
                            image.sample_clamped(i64::from(x) + dx, i64::from(y) + dy, c);
                        let diff = neighbor - center;
                        let weight = spatial[(dy + RADIUS) as usize][(dx + RADIUS) as usize]
                            * (-(diff * diff) / range_denom).exp();
                        acc += weight * neighbor;
                        norm += weight;
                    }
                }
                out.push(acc / norm);
            }
        }
    }

    ImageBuffer::from_unclamped(image.width(), image.height(), channels, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnhanceError;

    #[test]
    fn zero_strength_is_identity() {
        let data: Vec<f32> = (0..48).map(|i| (i % 7) as f32 / 6.0).collect();
        let image = ImageBuffer::new(4, 4, 3, data).unwrap();
        let result = denoise(&image, 0.0).unwrap();
        assert_eq!(result.data(), image.data());
    }

    #[test]
    fn out_of_range_strength_fails() {
        let image = ImageBuffer::filled(4, 4, 3, 0.5).unwrap();
        assert!(matches!(
            denoise(&image, -1.0),
            Err(EnhanceError::InvalidParameter { name: "denoise_strength", .. })
        ));
        assert!(denoise(&image, 2.5).is_err());
    }

    #[test]
    fn flat_image_is_unchanged() {
        let image = ImageBuffer::filled(8, 8, 3, 0.5).unwrap();
        let result = denoise(&image, 1.0).unwrap();
        for (&a, &b) in result.data().iter().zip(image.data()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn smooths_isolated_speck() {
        let mut data = vec![0.5f32; 9 * 9];
        data[4 * 9 + 4] = 1.0;
        let image = ImageBuffer::new(9, 9, 1, data).unwrap();
        let result = denoise(&image, 1.5).unwrap();
        // The speck should move toward its neighborhood.
        assert!(result.sample(4, 4, 0) < 1.0);
    }

    #[test]
    fn preserves_hard_edge() {
        // Left half dark, right half bright.
        let mut data = vec![0.1f32; 8 * 8];
        for y in 0..8 {
            for x in 4..8 {
                data[y * 8 + x] = 0.9;
            }
        }
        let image = ImageBuffer::new(8, 8, 1, data).unwrap();
        let result = denoise(&image, 1.0).unwrap();
        // Samples away from the edge keep their side's level.
        assert!(result.sample(1, 4, 0) < 0.3);
        assert!(result.sample(6, 4, 0) > 0.7);
    }

    #[test]
    fn input_is_not_mutated() {
        let image = ImageBuffer::filled(6, 6, 3, 0.4).unwrap();
        let before = image.data().to_vec();
        let _ = denoise(&image, 1.0).unwrap();
        assert_eq!(image.data(), before.as_slice());
    }
}
