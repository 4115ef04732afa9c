// SPDX-License-Identifier: MPL-2.0
//! Core image buffer for the enhancement pipeline.
//!
//! [`ImageBuffer`] is the domain representation of an image: normalized
//! `f32` samples in `[0, 1]`, interleaved, 1 or 3 channels. It carries no
//! presentation or codec dependencies; decode/encode belongs to the caller,
//! which converts through [`ImageBuffer::from_dynamic`] / [`ImageBuffer::to_dynamic`].
//!
//! All pipeline operators treat buffers as immutable-at-rest: they read one
//! buffer and produce a new one, which makes concurrent calls safe by
//! construction.

mod resize;

pub use resize::resize_bicubic;

use crate::error::{EnhanceError, EnhanceResult};

/// Luma weights (Rec. 601), matching the conversion used when scoring and
/// equalizing multi-channel images.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// An owned pixel buffer with normalized `f32` samples.
///
/// Invariants (enforced on construction):
/// - `width > 0` and `height > 0`
/// - `channels` is 1 or 3
/// - `data.len() == width * height * channels`
/// - every sample is finite and within `[0, 1]`
///
/// # Example
///
/// ```
/// use relumin::image::ImageBuffer;
///
/// let gray = ImageBuffer::filled(64, 64, 3, 0.5).unwrap();
/// assert_eq!(gray.shape(), (64, 64, 3));
/// ```
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<f32>,
}

impl ImageBuffer {
    /// Creates a buffer from interleaved sample data, validating all invariants.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::InvalidInput`] if the dimensions are zero, the
    /// channel count is not 1 or 3, the data length does not match the shape,
    /// or any sample is non-finite or outside `[0, 1]`.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<f32>) -> EnhanceResult<Self> {
        if width == 0 || height == 0 {
            return Err(EnhanceError::InvalidInput(format!(
                "empty image: {width}x{height}"
            )));
        }
        if channels != 1 && channels != 3 {
            return Err(EnhanceError::InvalidInput(format!(
                "unsupported channel count: {channels}"
            )));
        }
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(EnhanceError::InvalidInput(format!(
                "sample data length mismatch: expected {expected}, got {}",
                data.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
            return Err(EnhanceError::InvalidInput(
                "samples must be finite and within [0, 1]".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Creates a buffer from raw sample data, clamping each sample into `[0, 1]`.
    ///
    /// Non-finite samples become 0. Used by kernels to re-enter the valid
    /// range after unclamped arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::InvalidInput`] if the shape itself is invalid.
    pub fn from_unclamped(
        width: u32,
        height: u32,
        channels: u8,
        mut data: Vec<f32>,
    ) -> EnhanceResult<Self> {
        for v in &mut data {
            *v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        }
        Self::new(width, height, channels, data)
    }

    /// Creates a buffer with every sample set to `value` (clamped to `[0, 1]`).
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::InvalidInput`] if the shape is invalid.
    pub fn filled(width: u32, height: u32, channels: u8, value: f32) -> EnhanceResult<Self> {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(width, height, channels, vec![value.clamp(0.0, 1.0); len])
    }

    /// Returns the image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the channel count (1 or 3).
    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Returns the shape as `(height, width, channels)`.
    #[must_use]
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.height, self.width, self.channels)
    }

    /// Returns the total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the interleaved sample data.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the sample at `(x, y)` in channel `c`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates or channel are out of bounds.
    #[must_use]
    pub fn sample(&self, x: u32, y: u32, c: u8) -> f32 {
        assert!(x < self.width && y < self.height && c < self.channels);
        self.data[self.index(x, y, c)]
    }

    /// Returns the sample at `(x, y)`, clamping coordinates to the border.
    ///
    /// Border replication is the edge policy shared by every spatial kernel.
    #[must_use]
    pub fn sample_clamped(&self, x: i64, y: i64, c: u8) -> f32 {
        let x = x.clamp(0, i64::from(self.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.height) - 1) as u32;
        self.data[self.index(x, y, c)]
    }

    fn index(&self, x: u32, y: u32, c: u8) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * (self.channels as usize)
            + (c as usize)
    }

    /// Extracts the luma plane (`height * width` samples).
    ///
    /// Single-channel images return their only plane; three-channel images
    /// use the Rec. 601 weights.
    #[must_use]
    pub fn luma(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.data.clone();
        }
        self.data
            .chunks_exact(3)
            .map(|px| {
                px[0] * LUMA_WEIGHTS[0] + px[1] * LUMA_WEIGHTS[1] + px[2] * LUMA_WEIGHTS[2]
            })
            .collect()
    }

    /// Converts a decoded [`image_rs::DynamicImage`] into a normalized buffer.
    ///
    /// Gray inputs become single-channel; everything else becomes RGB. The
    /// alpha channel, if present, is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::InvalidInput`] if the decoded image is empty.
    pub fn from_dynamic(image: &image_rs::DynamicImage) -> EnhanceResult<Self> {
        match image {
            image_rs::DynamicImage::ImageLuma8(gray) => {
                let (width, height) = gray.dimensions();
                let data = gray.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
                Self::new(width, height, 1, data)
            }
            other => {
                let rgb = other.to_rgb8();
                let (width, height) = rgb.dimensions();
                let data = rgb.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
                Self::new(width, height, 3, data)
            }
        }
    }

    /// Converts the buffer back to an 8-bit [`image_rs::DynamicImage`] for encoding.
    ///
    /// Samples are denormalized to `0..=255` with rounding.
    #[must_use]
    pub fn to_dynamic(&self) -> image_rs::DynamicImage {
        // Samples are invariant-bounded to [0, 1], so the u8 cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bytes: Vec<u8> = self
            .data
            .iter()
            .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();

        if self.channels == 1 {
            let gray = image_rs::GrayImage::from_raw(self.width, self.height, bytes)
                .expect("shape invariant guarantees the byte length");
            image_rs::DynamicImage::ImageLuma8(gray)
        } else {
            let rgb = image_rs::RgbImage::from_raw(self.width, self.height, bytes)
                .expect("shape invariant guarantees the byte length");
            image_rs::DynamicImage::ImageRgb8(rgb)
        }
    }
}
