// SPDX-License-Identifier: MPL-2.0
//! Objective quality metrics.
//!
//! PSNR and SSIM between two equal-shaped images, plus the MSE/RMSE,
//! histogram-similarity, and edge-preservation values the report carries
//! alongside them. All functions are pure and symmetric in their arguments;
//! unequal shapes fail with [`EnhanceError::ShapeMismatch`] rather than
//! silently resizing.

use crate::error::{EnhanceError, EnhanceResult};
use crate::image::ImageBuffer;
use crate::kernels::gaussian_blur_plane;

/// SSIM window: Gaussian with sigma 1.5 (11 taps).
const SSIM_SIGMA: f32 = 1.5;

/// SSIM stabilizing constants for a `[0, 1]` value range.
const SSIM_C1: f32 = 0.01 * 0.01;
const SSIM_C2: f32 = 0.03 * 0.03;

/// Histogram resolution for [`histogram_similarity`].
const HIST_BINS: usize = 256;

/// Quality metrics computed between an original and an enhanced image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsReport {
    /// Peak signal-to-noise ratio in dB; `f32::INFINITY` for identical images.
    pub psnr: f32,
    /// Structural similarity in `[-1, 1]`, typically `[0, 1]`.
    pub ssim: f32,
    /// Mean squared error over all samples.
    pub mse: f32,
    /// Root mean squared error.
    pub rmse: f32,
    /// Brightness-histogram correlation mapped to `[0, 1]`.
    pub histogram_similarity: f32,
    /// Structural similarity between gradient maps, typically `[0, 1]`.
    pub edge_preservation: f32,
}

impl MetricsReport {
    /// Computes all metrics between two equal-shaped images.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::ShapeMismatch`] if the shapes differ.
    pub fn compute(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<Self> {
        let mse_value = mse(a, b)?;
        Ok(Self {
            psnr: psnr_from_mse(mse_value),
            ssim: ssim(a, b)?,
            mse: mse_value,
            rmse: mse_value.sqrt(),
            histogram_similarity: histogram_similarity(a, b)?,
            edge_preservation: edge_preservation(a, b)?,
        })
    }
}

fn check_shapes(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<()> {
    if a.shape() != b.shape() {
        return Err(EnhanceError::ShapeMismatch {
            a: a.shape(),
            b: b.shape(),
        });
    }
    Ok(())
}

/// Mean squared error per sample across all channels.
///
/// # Errors
///
/// Returns [`EnhanceError::ShapeMismatch`] if the shapes differ.
pub fn mse(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<f32> {
    check_shapes(a, b)?;
    let sum: f64 = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    #[allow(clippy::cast_possible_truncation)]
    Ok((sum / a.data().len() as f64) as f32)
}

fn psnr_from_mse(mse: f32) -> f32 {
    if mse == 0.0 {
        // Identical images: defined maximal sentinel instead of a division error.
        f32::INFINITY
    } else {
        // MAX is 1.0 for normalized buffers, so the numerator term vanishes.
        10.0 * (1.0 / mse).log10()
    }
}

/// Peak signal-to-noise ratio in dB (`10 * log10(MAX^2 / MSE)` with MAX = 1).
///
/// Identical images yield `f32::INFINITY`.
///
/// # Errors
///
/// Returns [`EnhanceError::ShapeMismatch`] if the shapes differ.
pub fn psnr(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<f32> {
    Ok(psnr_from_mse(mse(a, b)?))
}

/// Windowed structural similarity over the luma plane.
///
/// Local means, variances, and covariance are computed with a Gaussian
/// window (sigma 1.5, 11 taps) and combined with the standard
/// luminance/contrast/structure formula, then averaged over all windows.
/// Multi-channel images are converted to luma first (Rec. 601).
///
/// # Errors
///
/// Returns [`EnhanceError::ShapeMismatch`] if the shapes differ.
pub fn ssim(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<f32> {
    check_shapes(a, b)?;
    Ok(ssim_plane(&a.luma(), &b.luma(), a.width(), a.height()))
}

#[allow(clippy::cast_possible_truncation)]
fn ssim_plane(la: &[f32], lb: &[f32], w: u32, h: u32) -> f32 {
    let mu_a = gaussian_blur_plane(la, w, h, SSIM_SIGMA);
    let mu_b = gaussian_blur_plane(lb, w, h, SSIM_SIGMA);

    let sq_a: Vec<f32> = la.iter().map(|&v| v * v).collect();
    let sq_b: Vec<f32> = lb.iter().map(|&v| v * v).collect();
    let ab: Vec<f32> = la.iter().zip(lb).map(|(&x, &y)| x * y).collect();

    let e_sq_a = gaussian_blur_plane(&sq_a, w, h, SSIM_SIGMA);
    let e_sq_b = gaussian_blur_plane(&sq_b, w, h, SSIM_SIGMA);
    let e_ab = gaussian_blur_plane(&ab, w, h, SSIM_SIGMA);

    let mut sum = 0.0f64;
    for i in 0..la.len() {
        let var_a = e_sq_a[i] - mu_a[i] * mu_a[i];
        let var_b = e_sq_b[i] - mu_b[i] * mu_b[i];
        let cov = e_ab[i] - mu_a[i] * mu_b[i];

        let numerator = (2.0 * mu_a[i] * mu_b[i] + SSIM_C1) * (2.0 * cov + SSIM_C2);
        let denominator = (mu_a[i] * mu_a[i] + mu_b[i] * mu_b[i] + SSIM_C1)
            * (var_a + var_b + SSIM_C2);
        sum += f64::from(numerator / denominator);
    }
    (sum / la.len() as f64) as f32
}

/// Brightness-histogram correlation mapped to `[0, 1]`.
///
/// Both luma planes are binned into 256-bin histograms whose Pearson
/// correlation is rescaled from `[-1, 1]` to `[0, 1]`, so 1 means identical
/// brightness distributions and 0.5 means uncorrelated ones. The histogram
/// discards spatial structure; combine with [`ssim`] for that.
///
/// # Errors
///
/// Returns [`EnhanceError::ShapeMismatch`] if the shapes differ.
pub fn histogram_similarity(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<f32> {
    check_shapes(a, b)?;
    let ha = luma_histogram(&a.luma());
    let hb = luma_histogram(&b.luma());
    Ok((correlation(&ha, &hb) + 1.0) / 2.0)
}

fn luma_histogram(luma: &[f32]) -> [f32; HIST_BINS] {
    let mut hist = [0.0f32; HIST_BINS];
    for &v in luma {
        // Values are invariant-bounded; the cast cannot truncate past the
        // last bin.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin = ((v * (HIST_BINS - 1) as f32).round() as usize).min(HIST_BINS - 1);
        hist[bin] += 1.0;
    }
    hist
}

fn correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len() as f64;
    let mean_a: f64 = a.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean_b: f64 = b.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = f64::from(x) - mean_a;
        let dy = f64::from(y) - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        // A zero-variance histogram carries no distribution to compare;
        // equal inputs still count as perfectly correlated.
        return if a == b { 1.0 } else { 0.0 };
    }
    #[allow(clippy::cast_possible_truncation)]
    let r = (cov / denom) as f32;
    r.clamp(-1.0, 1.0)
}

/// Structural similarity between the two images' gradient-magnitude maps.
///
/// Gradients are 3x3 Sobel over luma with border replication, normalized
/// into `[0, 1]`, then compared with the SSIM formula. Blurring away edges
/// lowers the score; identical images score 1.
///
/// # Errors
///
/// Returns [`EnhanceError::ShapeMismatch`] if the shapes differ.
pub fn edge_preservation(a: &ImageBuffer, b: &ImageBuffer) -> EnhanceResult<f32> {
    check_shapes(a, b)?;
    let ga = sobel_magnitude(&a.luma(), a.width(), a.height());
    let gb = sobel_magnitude(&b.luma(), b.width(), b.height());
    Ok(ssim_plane(&ga, &gb, a.width(), a.height()))
}

/// Sobel gradient magnitude, normalized so the steepest possible edge maps
/// to 1.
fn sobel_magnitude(plane: &[f32], width: u32, height: u32) -> Vec<f32> {
    const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
    // Each axis response peaks at 4 on unit-range input.
    const NORM: f32 = 4.0 * std::f32::consts::SQRT_2;

    let w = width as usize;
    let h = height as usize;
    let at = |x: i64, y: i64| {
        let x = x.clamp(0, w as i64 - 1) as usize;
        let y = y.clamp(0, h as i64 - 1) as usize;
        plane[y * w + x]
    };

    let mut out = Vec::with_capacity(plane.len());
    for y in 0..h {
        for x in 0..w {
            let mut gx = 0.0f32;
            let mut gy = 0.0f32;
            for (j, (row_x, row_y)) in SOBEL_X.iter().zip(&SOBEL_Y).enumerate() {
                for (i, (&wx, &wy)) in row_x.iter().zip(row_y).enumerate() {
                    let v = at(x as i64 + i as i64 - 1, y as i64 + j as i64 - 1);
                    gx += wx * v;
                    gy += wy * v;
                }
            }
            out.push((gx * gx + gy * gy).sqrt() / NORM);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(width: u32, height: u32) -> ImageBuffer {
        let data: Vec<f32> = (0..width * height)
            .map(|i| ((i * 37) % 211) as f32 / 210.0)
            .collect();
        ImageBuffer::new(width, height, 1, data).unwrap()
    }

    #[test]
    fn psnr_of_identical_images_is_infinite() {
        let image = textured(32, 32);
        assert_eq!(psnr(&image, &image).unwrap(), f32::INFINITY);
    }

    #[test]
    fn ssim_of_identical_images_is_one() {
        let image = textured(32, 32);
        let value = ssim(&image, &image).unwrap();
        assert!((value - 1.0).abs() < 1e-5);
    }

    #[test]
    fn metrics_are_symmetric() {
        let a = textured(32, 32);
        let b = ImageBuffer::filled(32, 32, 1, 0.5).unwrap();

        assert_eq!(psnr(&a, &b).unwrap(), psnr(&b, &a).unwrap());
        assert!((ssim(&a, &b).unwrap() - ssim(&b, &a).unwrap()).abs() < 1e-6);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = textured(32, 32);
        let b = textured(16, 16);
        assert!(matches!(psnr(&a, &b), Err(EnhanceError::ShapeMismatch { .. })));
        assert!(matches!(ssim(&a, &b), Err(EnhanceError::ShapeMismatch { .. })));
        assert!(matches!(mse(&a, &b), Err(EnhanceError::ShapeMismatch { .. })));
    }

    #[test]
    fn channel_mismatch_is_a_shape_mismatch() {
        let a = ImageBuffer::filled(8, 8, 1, 0.5).unwrap();
        let b = ImageBuffer::filled(8, 8, 3, 0.5).unwrap();
        assert!(psnr(&a, &b).is_err());
    }

    #[test]
    fn psnr_matches_known_mse() {
        let a = ImageBuffer::filled(16, 16, 1, 0.5).unwrap();
        let b = ImageBuffer::filled(16, 16, 1, 0.6).unwrap();
        // MSE = 0.01, PSNR = 10 * log10(1 / 0.01) = 20 dB.
        let value = psnr(&a, &b).unwrap();
        assert!((value - 20.0).abs() < 0.05);
    }

    #[test]
    fn ssim_drops_for_structural_damage() {
        let a = textured(32, 32);
        let b = ImageBuffer::filled(32, 32, 1, 0.5).unwrap();
        let value = ssim(&a, &b).unwrap();
        assert!(value < 0.9);
    }

    #[test]
    fn report_is_internally_consistent() {
        let a = textured(32, 32);
        let b = ImageBuffer::filled(32, 32, 1, 0.5).unwrap();
        let report = MetricsReport::compute(&a, &b).unwrap();

        assert!((report.rmse - report.mse.sqrt()).abs() < 1e-6);
        let expected_psnr = 10.0 * (1.0 / report.mse).log10();
        assert!((report.psnr - expected_psnr).abs() < 1e-3);
    }

    #[test]
    fn report_for_identical_images() {
        let image = textured(24, 24);
        let report = MetricsReport::compute(&image, &image).unwrap();
        assert_eq!(report.psnr, f32::INFINITY);
        assert!((report.ssim - 1.0).abs() < 1e-5);
        assert_eq!(report.mse, 0.0);
        assert!((report.histogram_similarity - 1.0).abs() < 1e-5);
        assert!((report.edge_preservation - 1.0).abs() < 1e-5);
    }

    #[test]
    fn histogram_similarity_of_identical_images_is_one() {
        let image = textured(32, 32);
        let value = histogram_similarity(&image, &image).unwrap();
        assert!((value - 1.0).abs() < 1e-5);
    }

    #[test]
    fn histogram_similarity_drops_for_shifted_brightness() {
        let image = textured(32, 32);
        let brightened = crate::kernels::gamma_correct(&image, 2.0).unwrap();
        let value = histogram_similarity(&image, &brightened).unwrap();
        assert!(value < 0.999, "value = {value}");
        assert!((0.0..=1.0).contains(&value));
    }

    #[test]
    fn histogram_similarity_ignores_spatial_layout() {
        // Same samples, mirrored: identical distribution, full score.
        let data: Vec<f32> = (0..64).map(|i| i as f32 / 63.0).collect();
        let mut mirrored = data.clone();
        mirrored.reverse();
        let a = ImageBuffer::new(8, 8, 1, data).unwrap();
        let b = ImageBuffer::new(8, 8, 1, mirrored).unwrap();
        let value = histogram_similarity(&a, &b).unwrap();
        assert!((value - 1.0).abs() < 1e-5);
    }

    #[test]
    fn histogram_similarity_of_flat_images_handles_zero_variance() {
        let a = ImageBuffer::filled(16, 16, 1, 0.5).unwrap();
        let b = ImageBuffer::filled(16, 16, 1, 0.5).unwrap();
        assert!((histogram_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn edge_preservation_of_identical_images_is_one() {
        let image = textured(32, 32);
        let value = edge_preservation(&image, &image).unwrap();
        assert!((value - 1.0).abs() < 1e-5);
    }

    #[test]
    fn edge_preservation_penalizes_lost_edges() {
        // Hard vertical edge versus a ramp carrying the same endpoints.
        let mut hard = vec![0.1f32; 32 * 32];
        let mut soft = vec![0.1f32; 32 * 32];
        for y in 0..32 {
            for x in 0..32 {
                if x >= 16 {
                    hard[y * 32 + x] = 0.9;
                }
                soft[y * 32 + x] = 0.1 + 0.8 * (x as f32 / 31.0);
            }
        }
        let sharp = ImageBuffer::new(32, 32, 1, hard).unwrap();
        let ramp = ImageBuffer::new(32, 32, 1, soft).unwrap();

        let same = edge_preservation(&sharp, &sharp).unwrap();
        let degraded = edge_preservation(&sharp, &ramp).unwrap();
        assert!((same - 1.0).abs() < 1e-5);
        assert!(degraded < same - 0.01, "degraded = {degraded}");
    }

    #[test]
    fn histogram_and_edge_metrics_reject_shape_mismatch() {
        let a = textured(32, 32);
        let b = textured(16, 16);
        assert!(matches!(
            histogram_similarity(&a, &b),
            Err(EnhanceError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            edge_preservation(&a, &b),
            Err(EnhanceError::ShapeMismatch { .. })
        ));
    }
}
