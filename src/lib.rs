// SPDX-License-Identifier: MPL-2.0
//! `relumin` is an image enhancement core: a library of deterministic filter
//! kernels, quality metrics, and a learned super-resolution model, composed
//! into named enhancement pipelines.
//!
//! The crate is pure computation. Images enter and leave as [`ImageBuffer`]
//! values (normalized `f32`, interleaved channels); decoding, encoding, and
//! fetching model weights are the caller's concern, the latter through the
//! [`model::WeightSource`] trait. Every public operation is deterministic:
//! the same input and parameters produce the same output, byte for byte.
//!
//! ```no_run
//! use relumin::{EnhancementMode, ImageBuffer, Parameters, Pipeline};
//!
//! # fn main() -> Result<(), relumin::EnhanceError> {
//! let image = ImageBuffer::filled(64, 64, 3, 0.5)?;
//! let pipeline = Pipeline::without_model();
//! let params = Parameters::defaults_for(EnhancementMode::Restore);
//! let result = pipeline.enhance(&image, EnhancementMode::Restore, params)?;
//! println!("psnr = {:.1} dB", result.metrics.psnr);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/relumin/0.1.0")]

pub mod config;
pub mod error;
pub mod image;
pub mod kernels;
pub mod metrics;
pub mod model;
pub mod pipeline;

pub use error::{EnhanceError, EnhanceResult};
pub use image::{resize_bicubic, ImageBuffer};
pub use metrics::MetricsReport;
pub use model::SrEngine;
pub use pipeline::{EnhancementMode, EnhancementResult, Parameters, Pipeline, SrMethod};
