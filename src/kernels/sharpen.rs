// SPDX-License-Identifier: MPL-2.0
//! Unsharp-mask sharpening.

use crate::error::EnhanceResult;
use crate::image::ImageBuffer;
use crate::kernels::{check_strength, gaussian_blur};

/// Blur radius driving the unsharp mask.
const BLUR_SIGMA: f32 = 1.0;

/// Sharpens by amplifying the difference between the image and a
/// Gaussian-blurred copy: `out = in + strength * (in - blur(in))`.
///
/// `strength` in `[0, 2]`; 0 returns an identical copy. High strengths can
/// clip highlights and shadows against the `[0, 1]` range; that is the
/// expected behavior of unsharp masking, not a defect.
///
/// # Errors
///
/// Returns [`crate::error::EnhanceError::InvalidParameter`] if `strength` is
/// outside `[0, 2]`.
pub fn sharpen(image: &ImageBuffer, strength: f32) -> EnhanceResult<ImageBuffer> {
    check_strength("sharpen_strength", strength)?;
    if strength == 0.0 {
        return Ok(image.clone());
    }

    let blurred = gaussian_blur(image, BLUR_SIGMA)?;
    let out: Vec<f32> = image
        .data()
        .iter()
        .zip(blurred.data())
        .map(|(&orig, &blur)| orig + strength * (orig - blur))
        .collect();

    ImageBuffer::from_unclamped(image.width(), image.height(), image.channels(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_strength_is_identity() {
        let data: Vec<f32> = (0..27).map(|i| i as f32 / 26.0).collect();
        let image = ImageBuffer::new(3, 3, 3, data).unwrap();
        let result = sharpen(&image, 0.0).unwrap();
        assert_eq!(result.data(), image.data());
    }

    #[test]
    fn rejects_out_of_range_strength() {
        let image = ImageBuffer::filled(4, 4, 3, 0.5).unwrap();
        assert!(sharpen(&image, -0.5).is_err());
        assert!(sharpen(&image, 3.0).is_err());
    }

    #[test]
    fn flat_image_is_unchanged() {
        let image = ImageBuffer::filled(8, 8, 3, 0.5).unwrap();
        let result = sharpen(&image, 1.5).unwrap();
        for (&a, &b) in result.data().iter().zip(image.data()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn increases_edge_contrast() {
        let mut data = vec![0.3f32; 8 * 8];
        for y in 0..8 {
            for x in 4..8 {
                data[y * 8 + x] = 0.7;
            }
        }
        let image = ImageBuffer::new(8, 8, 1, data).unwrap();
        let result = sharpen(&image, 1.0).unwrap();

        // Adjacent to the edge, dark gets darker and bright gets brighter.
        assert!(result.sample(3, 4, 0) < 0.3);
        assert!(result.sample(4, 4, 0) > 0.7);
    }

    #[test]
    fn output_stays_in_range_at_max_strength() {
        let data: Vec<f32> = (0..64)
            .map(|i| if (i / 8 + i % 8) % 2 == 0 { 0.0 } else { 1.0 })
            .collect();
        let image = ImageBuffer::new(8, 8, 1, data).unwrap();
        let result = sharpen(&image, 2.0).unwrap();
        for &v in result.data() {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
