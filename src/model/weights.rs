// SPDX-License-Identifier: MPL-2.0
//! Weight tensors for the super-resolution network.
//!
//! Weights travel as an opaque versioned CBOR blob supplied by an external
//! [`WeightSource`]. The blob is checksum-verified with BLAKE3 before
//! decoding, then validated structurally (layer chain compatibility) before
//! the engine will run inference with it.

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, EnhanceResult};

/// Current weight blob format version.
pub const BLOB_VERSION: u32 = 1;

/// Supplies the serialized weight blob.
///
/// This is the boundary to the external model-weight store. Implementations
/// may read disk or network; the core itself never does. Implementations
/// must be `Send + Sync` because the engine shares them across concurrent
/// calls.
pub trait WeightSource: Send + Sync {
    /// Fetches the serialized blob bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::ModelUnavailable`] if the blob cannot be
    /// produced.
    fn fetch(&self) -> EnhanceResult<Vec<u8>>;

    /// Expected BLAKE3 hex digest of the blob, if the store publishes one.
    ///
    /// Returning `None` skips verification.
    fn checksum(&self) -> Option<String> {
        None
    }
}

/// A [`WeightSource`] over bytes already held in memory.
pub struct StaticWeightSource {
    bytes: Vec<u8>,
    checksum: Option<String>,
}

impl StaticWeightSource {
    /// Wraps pre-fetched blob bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            checksum: None,
        }
    }

    /// Attaches an expected BLAKE3 hex digest.
    #[must_use]
    pub fn with_checksum(mut self, hex: impl Into<String>) -> Self {
        self.checksum = Some(hex.into());
        self
    }
}

impl WeightSource for StaticWeightSource {
    fn fetch(&self) -> EnhanceResult<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn checksum(&self) -> Option<String> {
        self.checksum.clone()
    }
}

/// A `WeightSource` that always fails; used where no store is configured.
pub struct NoWeightSource;

impl WeightSource for NoWeightSource {
    fn fetch(&self) -> EnhanceResult<Vec<u8>> {
        Err(EnhanceError::ModelUnavailable(
            "no weight store configured".to_string(),
        ))
    }
}

/// Serialized form of one convolution layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerBlob {
    /// Output channel count.
    pub out_channels: usize,
    /// Input channel count.
    pub in_channels: usize,
    /// Square kernel side length (odd).
    pub kernel_size: usize,
    /// Weights, `out * in * k * k` values in row-major order.
    pub weights: Vec<f32>,
    /// One bias per output channel.
    pub bias: Vec<f32>,
}

/// Serialized form of the full weight set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsBlob {
    /// Format version; blobs with an unknown version are rejected.
    pub version: u32,
    /// Integer scale factors these weights were trained for.
    pub scales: Vec<u32>,
    /// Wide feature-extraction layer (9x9 in the reference architecture).
    pub first: LayerBlob,
    /// Pointwise nonlinear mapping layer (1x1).
    pub mid: LayerBlob,
    /// Narrow reconstruction layer (5x5).
    pub last: LayerBlob,
}

impl WeightsBlob {
    /// Encodes the blob to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::ModelUnavailable`] if serialization fails.
    pub fn encode(&self) -> EnhanceResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| EnhanceError::ModelUnavailable(format!("encode failed: {e}")))?;
        Ok(bytes)
    }
}

/// One decoded convolution layer.
#[derive(Debug, Clone)]
pub struct ConvLayer {
    /// Kernel tensor, shape `[out, in, k, k]`.
    pub weights: Array4<f32>,
    /// Per-output-channel bias.
    pub bias: Vec<f32>,
}

impl ConvLayer {
    fn from_blob(name: &str, blob: &LayerBlob) -> EnhanceResult<Self> {
        let k = blob.kernel_size;
        if k == 0 || k % 2 == 0 {
            return Err(EnhanceError::ModelUnavailable(format!(
                "layer `{name}`: kernel size {k} must be odd"
            )));
        }
        let expected = blob.out_channels * blob.in_channels * k * k;
        if blob.weights.len() != expected {
            return Err(EnhanceError::ModelUnavailable(format!(
                "layer `{name}`: expected {expected} weights, got {}",
                blob.weights.len()
            )));
        }
        if blob.bias.len() != blob.out_channels {
            return Err(EnhanceError::ModelUnavailable(format!(
                "layer `{name}`: expected {} biases, got {}",
                blob.out_channels,
                blob.bias.len()
            )));
        }
        if blob.weights.iter().chain(&blob.bias).any(|v| !v.is_finite()) {
            return Err(EnhanceError::ModelUnavailable(format!(
                "layer `{name}`: non-finite weight values"
            )));
        }

        let weights = Array4::from_shape_vec(
            (blob.out_channels, blob.in_channels, k, k),
            blob.weights.clone(),
        )
        .map_err(|e| EnhanceError::ModelUnavailable(format!("layer `{name}`: {e}")))?;

        Ok(Self {
            weights,
            bias: blob.bias.clone(),
        })
    }

    /// Output channel count.
    #[must_use]
    pub fn out_channels(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Input channel count.
    #[must_use]
    pub fn in_channels(&self) -> usize {
        self.weights.shape()[1]
    }
}

/// Decoded, validated weight set shared read-only across calls.
#[derive(Debug, Clone)]
pub struct SrWeights {
    /// Scale factors the weights support.
    pub scales: Vec<u32>,
    /// Feature extraction stage.
    pub first: ConvLayer,
    /// Nonlinear mapping stage.
    pub mid: ConvLayer,
    /// Reconstruction stage.
    pub last: ConvLayer,
}

impl SrWeights {
    /// Decodes and validates a CBOR weight blob.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::ModelUnavailable`] for undecodable bytes,
    /// unknown versions, shape-inconsistent tensors, or an incompatible
    /// layer chain.
    pub fn decode(bytes: &[u8]) -> EnhanceResult<Self> {
        let blob: WeightsBlob = ciborium::from_reader(bytes)
            .map_err(|e| EnhanceError::ModelUnavailable(format!("decode failed: {e}")))?;

        if blob.version != BLOB_VERSION {
            return Err(EnhanceError::ModelUnavailable(format!(
                "unsupported blob version {}",
                blob.version
            )));
        }
        if blob.scales.is_empty() {
            return Err(EnhanceError::ModelUnavailable(
                "blob declares no supported scales".to_string(),
            ));
        }

        let first = ConvLayer::from_blob("first", &blob.first)?;
        let mid = ConvLayer::from_blob("mid", &blob.mid)?;
        let last = ConvLayer::from_blob("last", &blob.last)?;

        if first.out_channels() != mid.in_channels() || mid.out_channels() != last.in_channels() {
            return Err(EnhanceError::ModelUnavailable(
                "layer chain channel mismatch".to_string(),
            ));
        }
        if first.in_channels() != last.out_channels() {
            return Err(EnhanceError::ModelUnavailable(
                "reconstruction must project back to the input channel count".to_string(),
            ));
        }

        Ok(Self {
            scales: blob.scales,
            first,
            mid,
            last,
        })
    }

    /// Whether these weights were trained for the requested scale factor.
    #[must_use]
    pub fn supports_scale(&self, scale: u32) -> bool {
        self.scales.contains(&scale)
    }
}

/// Verifies blob bytes against an expected BLAKE3 hex digest.
///
/// # Errors
///
/// Returns [`EnhanceError::ModelUnavailable`] on mismatch.
pub fn verify_checksum(bytes: &[u8], expected_hex: &str) -> EnhanceResult<()> {
    let actual = blake3::hash(bytes).to_hex().to_string();
    if actual != expected_hex {
        return Err(EnhanceError::ModelUnavailable(format!(
            "checksum mismatch: expected {expected_hex}, got {actual}"
        )));
    }
    Ok(())
}
