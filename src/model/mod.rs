// SPDX-License-Identifier: MPL-2.0
//! Learned super-resolution.
//!
//! The network is three cascaded convolutions over a bicubic-upsampled
//! input: a wide feature-extraction stage, a pointwise nonlinear mapping
//! stage, and a narrow reconstruction stage projecting back to the input
//! channel count. ReLU follows the first two stages; the last is linear and
//! the output is clamped to `[0, 1]`. Because the input is upsampled before
//! the network runs, the convolutions learn a residual detail correction,
//! not the upsampling itself.
//!
//! Weights load lazily and at most once per engine; concurrent first
//! requests block on the single load. Inference is a pure function of the
//! input and the loaded weights.

mod convolve;
pub mod test_support;
mod weights;

pub use weights::{
    verify_checksum, ConvLayer, LayerBlob, NoWeightSource, SrWeights, StaticWeightSource,
    WeightSource, WeightsBlob, BLOB_VERSION,
};

use std::sync::{Arc, OnceLock};

use ndarray::Array3;

use crate::error::{EnhanceError, EnhanceResult};
use crate::image::{resize_bicubic, ImageBuffer};
use crate::model::convolve::{conv2d, relu};

/// Reference architecture widths (feature extraction / mapping stages).
pub const FEATURE_CHANNELS: usize = 64;
/// Pointwise mapping stage width.
pub const MAPPING_CHANNELS: usize = 32;

/// Super-resolution engine with lazily loaded, process-shared weights.
///
/// The engine owns its [`WeightSource`] and decodes the blob on the first
/// call that needs it. The decoded weights (or the load failure) are cached
/// for the engine's lifetime; callers that hit [`EnhanceError::ModelUnavailable`]
/// are expected to fall back to bicubic upsampling, which the pipeline does
/// automatically.
pub struct SrEngine {
    source: Box<dyn WeightSource>,
    weights: OnceLock<Result<Arc<SrWeights>, EnhanceError>>,
}

impl SrEngine {
    /// Creates an engine over a weight source; nothing is loaded yet.
    #[must_use]
    pub fn new(source: Box<dyn WeightSource>) -> Self {
        Self {
            source,
            weights: OnceLock::new(),
        }
    }

    /// Creates an engine with no weight store: every learned-inference
    /// request degrades to the caller's fallback path.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Box::new(NoWeightSource))
    }

    /// Creates an engine around already-decoded weights (no lazy load).
    ///
    /// Lets tests and callers substitute a stub model without touching any
    /// global state.
    #[must_use]
    pub fn with_weights(weights: SrWeights) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(Arc::new(weights)));
        Self {
            source: Box::new(NoWeightSource),
            weights: cell,
        }
    }

    /// Returns `true` once weights have been loaded successfully.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.weights.get(), Some(Ok(_)))
    }

    /// Fetches, verifies, decodes, and caches the weights (at most once).
    fn weights(&self) -> EnhanceResult<Arc<SrWeights>> {
        self.weights
            .get_or_init(|| {
                let bytes = self.source.fetch()?;
                if let Some(expected) = self.source.checksum() {
                    verify_checksum(&bytes, &expected)?;
                }
                Ok(Arc::new(SrWeights::decode(&bytes)?))
            })
            .clone()
    }

    /// Produces a higher-resolution estimate at `scale` times the input size.
    ///
    /// The input is first upsampled bicubically to the target size, then
    /// refined by the three convolution stages. Output values are clamped to
    /// `[0, 1]`.
    ///
    /// # Errors
    ///
    /// - [`EnhanceError::ModelUnavailable`] if weights are missing/corrupt,
    ///   were not trained for `scale`, or expect a different channel count;
    ///   callers should degrade to bicubic.
    /// - [`EnhanceError::InvalidParameter`] if `scale` is zero.
    pub fn super_resolve(&self, image: &ImageBuffer, scale: u32) -> EnhanceResult<ImageBuffer> {
        if scale == 0 {
            return Err(EnhanceError::InvalidParameter {
                name: "scale_factor",
                reason: "scale must be at least 1".to_string(),
            });
        }

        let weights = self.weights()?;
        if !weights.supports_scale(scale) {
            return Err(EnhanceError::ModelUnavailable(format!(
                "weights not trained for scale {scale}"
            )));
        }
        if weights.first.in_channels() != image.channels() as usize {
            return Err(EnhanceError::ModelUnavailable(format!(
                "weights expect {} channels, image has {}",
                weights.first.in_channels(),
                image.channels()
            )));
        }

        let upsampled = resize_bicubic(image, image.width() * scale, image.height() * scale)?;
        let mut tensor = to_chw(&upsampled);

        tensor = conv2d(&tensor, &weights.first);
        relu(&mut tensor);
        tensor = conv2d(&tensor, &weights.mid);
        relu(&mut tensor);
        tensor = conv2d(&tensor, &weights.last);

        from_chw(&tensor, upsampled.width(), upsampled.height())
    }
}

fn to_chw(image: &ImageBuffer) -> Array3<f32> {
    let channels = image.channels() as usize;
    let (h, w) = (image.height() as usize, image.width() as usize);
    Array3::from_shape_fn((channels, h, w), |(c, y, x)| {
        image.sample(x as u32, y as u32, c as u8)
    })
}

fn from_chw(tensor: &Array3<f32>, width: u32, height: u32) -> EnhanceResult<ImageBuffer> {
    let (channels, h, w) = tensor.dim();
    debug_assert_eq!((h, w), (height as usize, width as usize));

    let mut data = Vec::with_capacity(channels * h * w);
    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                data.push(tensor[[c, y, x]]);
            }
        }
    }
    // channels came from a validated layer chain, so 1 or 3 is guaranteed.
    #[allow(clippy::cast_possible_truncation)]
    ImageBuffer::from_unclamped(width, height, channels as u8, data)
}
