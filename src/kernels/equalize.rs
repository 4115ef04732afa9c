// SPDX-License-Identifier: MPL-2.0
//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! Works on the luma plane with a fixed tile grid; the per-pixel luma gain
//! is then re-applied to every channel so color images keep their hue.

use crate::error::EnhanceResult;
use crate::image::ImageBuffer;
use crate::kernels::apply_luma_gain;

/// Tiles per axis.
const TILE_GRID: usize = 8;

/// Histogram resolution.
const BINS: usize = 256;

/// Clip limit as a multiple of the mean bin height.
const CLIP_LIMIT: f32 = 2.0;

/// Equalizes local contrast with a fixed 8x8 tile grid and clip limit 2.0.
///
/// Each tile gets a clipped, renormalized histogram CDF; per-pixel mappings
/// are bilinearly interpolated between the four nearest tile mappings to
/// avoid visible tile seams.
///
/// # Errors
///
/// Propagates buffer construction errors; the operator itself has no
/// parameters to validate.
pub fn equalize_adaptive(image: &ImageBuffer) -> EnhanceResult<ImageBuffer> {
    let w = image.width() as usize;
    let h = image.height() as usize;
    let luma = image.luma();

    // Tile size first, then the count it implies, so every tile is
    // non-empty even when a dimension is not a multiple of the grid.
    let tile_w = w.div_ceil(TILE_GRID.min(w));
    let tile_h = h.div_ceil(TILE_GRID.min(h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    // Build one clipped-CDF lookup table per tile.
    let mut luts = vec![[0.0f32; BINS]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[bin_of(luma[y * w + x])] += 1;
                }
            }

            let count = ((x1 - x0) * (y1 - y0)) as f32;
            let clip = (CLIP_LIMIT * count / BINS as f32).max(1.0);

            // Clip peaks and spread the excess uniformly over all bins.
            let mut excess = 0.0f32;
            let mut clipped = [0.0f32; BINS];
            for (i, &v) in hist.iter().enumerate() {
                let v = v as f32;
                if v > clip {
                    excess += v - clip;
                    clipped[i] = clip;
                } else {
                    clipped[i] = v;
                }
            }
            let bonus = excess / BINS as f32;

            let lut = &mut luts[ty * tiles_x + tx];
            let mut cum = 0.0f32;
            for i in 0..BINS {
                cum += clipped[i] + bonus;
                lut[i] = cum / count;
            }
        }
    }

    // Bilinear interpolation between tile mappings.
    let mut new_luma = Vec::with_capacity(luma.len());
    for y in 0..h {
        let gy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = gy.floor().max(0.0) as usize;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let ty0 = ty0.min(tiles_y - 1);
        let fy = (gy - gy.floor()).clamp(0.0, 1.0);

        for x in 0..w {
            let gx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = gx.floor().max(0.0) as usize;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let tx0 = tx0.min(tiles_x - 1);
            let fx = (gx - gx.floor()).clamp(0.0, 1.0);

            let bin = bin_of(luma[y * w + x]);
            let v00 = luts[ty0 * tiles_x + tx0][bin];
            let v01 = luts[ty0 * tiles_x + tx1][bin];
            let v10 = luts[ty1 * tiles_x + tx0][bin];
            let v11 = luts[ty1 * tiles_x + tx1][bin];

            let top = v00 + (v01 - v00) * fx;
            let bottom = v10 + (v11 - v10) * fx;
            new_luma.push((top + (bottom - top) * fy).clamp(0.0, 1.0));
        }
    }

    apply_luma_gain(image, &luma, &new_luma)
}

fn bin_of(value: f32) -> usize {
    // Values are invariant-bounded; the cast cannot truncate past BINS - 1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bin = (value * (BINS - 1) as f32).round() as usize;
    bin.min(BINS - 1)
}
