// SPDX-License-Identifier: MPL-2.0
//! Stub weight fixtures for tests and callers that need a working model
//! without trained tensors.

use crate::model::weights::{LayerBlob, SrWeights, WeightsBlob, BLOB_VERSION};

/// Builds an identity pass-through layer blob (`channels` in and out).
#[must_use]
pub fn identity_layer(channels: usize, kernel_size: usize) -> LayerBlob {
    let k = kernel_size;
    let mut weights = vec![0.0f32; channels * channels * k * k];
    let center = (k / 2) * k + k / 2;
    for c in 0..channels {
        weights[(c * channels + c) * k * k + center] = 1.0;
    }
    LayerBlob {
        out_channels: channels,
        in_channels: channels,
        kernel_size: k,
        weights,
        bias: vec![0.0; channels],
    }
}

/// A valid 3-channel weight blob whose network is the identity function,
/// so super-resolution output equals plain bicubic upsampling.
#[must_use]
pub fn identity_blob(scales: &[u32]) -> WeightsBlob {
    WeightsBlob {
        version: BLOB_VERSION,
        scales: scales.to_vec(),
        first: identity_layer(3, 3),
        mid: identity_layer(3, 1),
        last: identity_layer(3, 3),
    }
}

/// Decoded identity weights, ready to hand to `SrEngine::with_weights`.
///
/// # Panics
///
/// Panics if the fixture blob fails its own validation (a bug in the fixture).
#[must_use]
pub fn identity_weights(scales: &[u32]) -> SrWeights {
    let bytes = identity_blob(scales)
        .encode()
        .expect("fixture blob must encode");
    SrWeights::decode(&bytes).expect("fixture blob must decode")
}
