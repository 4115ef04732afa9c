// SPDX-License-Identifier: MPL-2.0
//! Error types for the enhancement core.
//!
//! All failures surface as typed values; the core never logs or retries.
//! `ModelUnavailable` is degradable: the pipeline recovers from it via the
//! bicubic fallback and reports it as a flag on the result, not a failure.

use std::fmt;

/// Result type used throughout the enhancement core.
pub type EnhanceResult<T> = Result<T, EnhanceError>;

/// Errors that can occur during enhancement.
#[derive(Debug, Clone, PartialEq)]
pub enum EnhanceError {
    /// The input image is malformed (empty, bad channel count, or
    /// pixel data inconsistent with its declared shape).
    InvalidInput(String),

    /// A parameter is out of range or unrecognized.
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Description of why the value was rejected.
        reason: String,
    },

    /// Two images passed to a metric have different shapes.
    ShapeMismatch {
        /// Shape of the first image as `(height, width, channels)`.
        a: (u32, u32, u8),
        /// Shape of the second image as `(height, width, channels)`.
        b: (u32, u32, u8),
    },

    /// The super-resolution weights are missing or corrupt.
    ///
    /// The pipeline never surfaces this to the caller directly; it falls
    /// back to bicubic upsampling and sets the `degraded` flag instead.
    ModelUnavailable(String),

    /// A kernel or model step failed during execution.
    PipelineExecutionFailed {
        /// Name of the failing step.
        step: &'static str,
        /// Underlying failure description.
        reason: String,
    },
}

impl fmt::Display for EnhanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhanceError::InvalidInput(msg) => write!(f, "invalid input image: {msg}"),
            EnhanceError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter `{name}`: {reason}")
            }
            EnhanceError::ShapeMismatch { a, b } => {
                write!(
                    f,
                    "shape mismatch: {}x{}x{} vs {}x{}x{}",
                    a.0, a.1, a.2, b.0, b.1, b.2
                )
            }
            EnhanceError::ModelUnavailable(msg) => {
                write!(f, "super-resolution model unavailable: {msg}")
            }
            EnhanceError::PipelineExecutionFailed { step, reason } => {
                write!(f, "pipeline step `{step}` failed: {reason}")
            }
        }
    }
}

impl std::error::Error for EnhanceError {}
