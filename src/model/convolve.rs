// SPDX-License-Identifier: MPL-2.0
//! 2D convolution over CHW activation tensors.

use ndarray::Array3;

use crate::model::weights::ConvLayer;

/// Applies a convolution layer with same-size zero padding.
///
/// Input shape `[in_channels, H, W]`, output shape `[out_channels, H, W]`.
///
/// # Panics
///
/// Panics if the input channel count does not match the layer; the engine
/// validates this before inference.
#[must_use]
pub fn conv2d(input: &Array3<f32>, layer: &ConvLayer) -> Array3<f32> {
    let (in_channels, height, width) = input.dim();
    assert_eq!(in_channels, layer.in_channels(), "channel mismatch");

    let out_channels = layer.out_channels();
    let k = layer.weights.shape()[2];
    let pad = (k / 2) as i64;

    let mut out = Array3::<f32>::zeros((out_channels, height, width));

    for o in 0..out_channels {
        let bias = layer.bias[o];
        for y in 0..height {
            for x in 0..width {
                let mut acc = bias;
                for i in 0..in_channels {
                    for ky in 0..k {
                        let sy = y as i64 + ky as i64 - pad;
                        if sy < 0 || sy >= height as i64 {
                            continue;
                        }
                        for kx in 0..k {
                            let sx = x as i64 + kx as i64 - pad;
                            if sx < 0 || sx >= width as i64 {
                                continue;
                            }
                            acc += layer.weights[[o, i, ky, kx]]
                                * input[[i, sy as usize, sx as usize]];
                        }
                    }
                }
                out[[o, y, x]] = acc;
            }
        }
    }
    out
}

/// Rectified-linear activation, in place.
pub fn relu(tensor: &mut Array3<f32>) {
    tensor.mapv_inplace(|v| v.max(0.0));
}
