// SPDX-License-Identifier: MPL-2.0
//! Enhancement pipeline.
//!
//! Maps an [`EnhancementMode`] plus [`Parameters`] onto a fixed, documented
//! chain of kernel/model steps, executes it, scores the result against the
//! original, and returns an [`EnhancementResult`].
//!
//! A call moves through Validating -> Executing -> Scoring -> Done (or the
//! terminal Failed). No state survives a call: the pipeline holds only the
//! shared read-only [`SrEngine`], so calls may run concurrently.
//!
//! # Step ordering
//!
//! Chain orders are semantic (sharpening before or after resizing changes
//! the artifacts) and fixed per mode:
//!
//! | mode               | chain                                                                     |
//! |--------------------|---------------------------------------------------------------------------|
//! | `restore`          | color_balance, denoise, morphological_clean, equalize_adaptive, sharpen, auto_contrast |
//! | `super-resolution` | color_balance, equalize_adaptive, super_resolve, sharpen                  |
//! | `bw-pro`           | desaturate, equalize_adaptive, gamma_correct, sharpen                     |
//! | `perfect`          | color_balance, denoise, equalize_adaptive, sharpen, tone_map              |
//! | `facial-beauty`    | denoise, color_balance, gamma_correct, sharpen                            |
//! | `vintage`          | vintage_tone, grain, morphological_clean                                  |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, EnhanceResult};
use crate::image::{resize_bicubic, ImageBuffer};
use crate::kernels::{self, MorphOp, MAX_STRENGTH};
use crate::metrics::MetricsReport;
use crate::model::SrEngine;

/// Gamma applied by the `bw-pro` chain.
const BW_GAMMA: f32 = 1.1;
/// Gamma lift applied by the `facial-beauty` chain.
const BEAUTY_GAMMA: f32 = 1.15;
/// Denoise boost for `facial-beauty` (skin smoothing).
const BEAUTY_DENOISE_BOOST: f32 = 1.5;
/// Tone-mapping intensity for `perfect`.
const PERFECT_TONE_INTENSITY: f32 = 0.5;
/// Grain amount for `vintage`.
const VINTAGE_GRAIN: f32 = 1.0;

/// Named enhancement mode selecting the filter chain.
///
/// A closed set of tagged variants, each bound to a fixed ordered step list
/// (see the module docs); dispatch never compares strings at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EnhancementMode {
    /// General restoration: denoise, balance, local contrast, sharpen.
    #[default]
    Restore,
    /// Upscaling with detail recovery.
    SuperResolution,
    /// Monochrome conversion with tonal shaping.
    BwPro,
    /// Restoration plus tone mapping for a polished look.
    Perfect,
    /// Portrait smoothing with a gentle brightness lift.
    FacialBeauty,
    /// Warm faded look with film grain.
    Vintage,
}

impl EnhancementMode {
    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restore => "restore",
            Self::SuperResolution => "super-resolution",
            Self::BwPro => "bw-pro",
            Self::Perfect => "perfect",
            Self::FacialBeauty => "facial-beauty",
            Self::Vintage => "vintage",
        }
    }
}

/// Interpolation/model choice for the super-resolution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SrMethod {
    /// Pure bicubic interpolation, always available.
    Bicubic,
    /// Learned three-stage network with bicubic fallback.
    #[default]
    Srcnn,
}

/// Per-call configuration carried alongside the mode.
///
/// Validated as a whole before any kernel runs; defaults differ per mode
/// (see [`Parameters::defaults_for`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Parameters {
    /// Integer upscale factor; 1, 2, or 4. Only `super-resolution` scales.
    pub scale_factor: u32,
    /// Unsharp-mask strength in `[0, 2]`.
    pub sharpen_strength: f32,
    /// Bilateral denoise strength in `[0, 2]`.
    pub denoise_strength: f32,
    /// Super-resolution method.
    pub method: SrMethod,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::defaults_for(EnhancementMode::default())
    }
}

impl Parameters {
    /// Default parameters for the given mode.
    #[must_use]
    pub fn defaults_for(mode: EnhancementMode) -> Self {
        match mode {
            EnhancementMode::Restore => Self {
                scale_factor: 1,
                sharpen_strength: 0.5,
                denoise_strength: 0.3,
                method: SrMethod::Srcnn,
            },
            EnhancementMode::SuperResolution => Self {
                scale_factor: 2,
                sharpen_strength: 0.3,
                denoise_strength: 0.0,
                method: SrMethod::Srcnn,
            },
            EnhancementMode::BwPro => Self {
                scale_factor: 1,
                sharpen_strength: 0.6,
                denoise_strength: 0.0,
                method: SrMethod::Srcnn,
            },
            EnhancementMode::Perfect => Self {
                scale_factor: 1,
                sharpen_strength: 0.5,
                denoise_strength: 0.4,
                method: SrMethod::Srcnn,
            },
            EnhancementMode::FacialBeauty => Self {
                scale_factor: 1,
                sharpen_strength: 0.2,
                denoise_strength: 0.8,
                method: SrMethod::Srcnn,
            },
            EnhancementMode::Vintage => Self {
                scale_factor: 1,
                sharpen_strength: 0.0,
                denoise_strength: 0.0,
                method: SrMethod::Srcnn,
            },
        }
    }

    /// Validates every field against its declared range.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::InvalidParameter`] naming the first offending
    /// field.
    pub fn validate(&self) -> EnhanceResult<()> {
        if !matches!(self.scale_factor, 1 | 2 | 4) {
            return Err(EnhanceError::InvalidParameter {
                name: "scale_factor",
                reason: format!("{} is not one of 1, 2, 4", self.scale_factor),
            });
        }
        kernels::check_strength("sharpen_strength", self.sharpen_strength)?;
        kernels::check_strength("denoise_strength", self.denoise_strength)?;
        Ok(())
    }
}

/// Final product of a pipeline call.
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// The untouched input.
    pub original: ImageBuffer,
    /// The enhanced output.
    pub enhanced: ImageBuffer,
    /// Quality metrics between original and enhanced.
    pub metrics: MetricsReport,
    /// The mode that produced this result.
    pub mode: EnhancementMode,
    /// True when the learned super-resolution model was unavailable and the
    /// deterministic bicubic fallback was used instead.
    pub degraded: bool,
}

/// Observer invoked with each step's name just before it runs.
///
/// Used for instrumentation and by tests asserting that validation
/// failures execute no steps.
pub type StepObserver = Arc<dyn Fn(&'static str) + Send + Sync>;

/// The enhancement pipeline.
///
/// Owns a shared [`SrEngine`]; everything else is per-call. Cloning the
/// `Arc` and calling [`Pipeline::enhance`] from multiple threads is safe.
pub struct Pipeline {
    engine: Arc<SrEngine>,
    observer: Option<StepObserver>,
}

impl Pipeline {
    /// Creates a pipeline around a super-resolution engine.
    #[must_use]
    pub fn new(engine: Arc<SrEngine>) -> Self {
        Self {
            engine,
            observer: None,
        }
    }

    /// Creates a pipeline with no super-resolution weights configured; the
    /// `super-resolution` mode degrades to bicubic.
    #[must_use]
    pub fn without_model() -> Self {
        Self::new(Arc::new(SrEngine::disabled()))
    }

    /// Attaches a step observer.
    #[must_use]
    pub fn with_observer(mut self, observer: StepObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enhances an image with the given mode and parameters.
    ///
    /// # Errors
    ///
    /// - [`EnhanceError::InvalidParameter`] if a parameter is out of range
    ///   (detected before any pixel computation).
    /// - [`EnhanceError::PipelineExecutionFailed`] if a step fails, naming
    ///   the step; no partially processed image is ever returned.
    pub fn enhance(
        &self,
        image: &ImageBuffer,
        mode: EnhancementMode,
        params: Parameters,
    ) -> EnhanceResult<EnhancementResult> {
        // Validating. ImageBuffer construction already enforces the image
        // invariants, so only the parameters can still be rejected here.
        params.validate()?;

        // Executing.
        let mut run = Execution {
            engine: &self.engine,
            observer: self.observer.as_ref(),
            current: image.clone(),
            degraded: false,
        };

        match mode {
            EnhancementMode::Restore => {
                run.step("color_balance", kernels::color_balance)?;
                run.step("denoise", |img| kernels::denoise(img, params.denoise_strength))?;
                run.step("morphological_clean", |img| {
                    kernels::morphological_clean(img, MorphOp::Opening)
                })?;
                run.step("equalize_adaptive", kernels::equalize_adaptive)?;
                run.step("sharpen", |img| kernels::sharpen(img, params.sharpen_strength))?;
                run.step("auto_contrast", kernels::auto_contrast)?;
            }
            EnhancementMode::SuperResolution => {
                run.step("color_balance", kernels::color_balance)?;
                run.step("equalize_adaptive", kernels::equalize_adaptive)?;
                run.super_resolve_step(params)?;
                run.step("sharpen", |img| kernels::sharpen(img, params.sharpen_strength))?;
            }
            EnhancementMode::BwPro => {
                run.step("desaturate", kernels::desaturate)?;
                run.step("equalize_adaptive", kernels::equalize_adaptive)?;
                run.step("gamma_correct", |img| kernels::gamma_correct(img, BW_GAMMA))?;
                run.step("sharpen", |img| kernels::sharpen(img, params.sharpen_strength))?;
            }
            EnhancementMode::Perfect => {
                run.step("color_balance", kernels::color_balance)?;
                run.step("denoise", |img| kernels::denoise(img, params.denoise_strength))?;
                run.step("equalize_adaptive", kernels::equalize_adaptive)?;
                run.step("sharpen", |img| kernels::sharpen(img, params.sharpen_strength))?;
                run.step("tone_map", |img| kernels::tone_map(img, PERFECT_TONE_INTENSITY))?;
            }
            EnhancementMode::FacialBeauty => {
                let smoothing = (params.denoise_strength * BEAUTY_DENOISE_BOOST).min(MAX_STRENGTH);
                run.step("denoise", |img| kernels::denoise(img, smoothing))?;
                run.step("color_balance", kernels::color_balance)?;
                run.step("gamma_correct", |img| kernels::gamma_correct(img, BEAUTY_GAMMA))?;
                run.step("sharpen", |img| kernels::sharpen(img, params.sharpen_strength))?;
            }
            EnhancementMode::Vintage => {
                run.step("vintage_tone", kernels::vintage_tone)?;
                run.step("grain", |img| kernels::grain(img, VINTAGE_GRAIN))?;
                run.step("morphological_clean", |img| {
                    kernels::morphological_clean(img, MorphOp::Closing)
                })?;
            }
        }

        let Execution {
            current: enhanced,
            degraded,
            ..
        } = run;

        // Scoring. After super-resolution the shapes differ; the original is
        // resized up with the same bicubic kernel purely for comparison, and
        // that copy is discarded.
        let metrics = if image.shape() == enhanced.shape() {
            MetricsReport::compute(image, &enhanced)?
        } else {
            let reference = resize_bicubic(image, enhanced.width(), enhanced.height())?;
            MetricsReport::compute(&reference, &enhanced)?
        };

        // Done.
        Ok(EnhancementResult {
            original: image.clone(),
            enhanced,
            metrics,
            mode,
            degraded,
        })
    }
}

/// Per-call execution state: the rolling buffer and the degraded flag.
struct Execution<'a> {
    engine: &'a SrEngine,
    observer: Option<&'a StepObserver>,
    current: ImageBuffer,
    degraded: bool,
}

impl Execution<'_> {
    /// Runs one kernel step; its output becomes the next step's input.
    fn step(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&ImageBuffer) -> EnhanceResult<ImageBuffer>,
    ) -> EnhanceResult<()> {
        if let Some(observer) = self.observer {
            observer(name);
        }
        self.current = op(&self.current).map_err(|e| EnhanceError::PipelineExecutionFailed {
            step: name,
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Runs the super-resolution step, degrading to bicubic when the model
    /// is unavailable.
    fn super_resolve_step(&mut self, params: Parameters) -> EnhanceResult<()> {
        if params.scale_factor == 1 {
            // Nothing to scale; the chain continues at native resolution.
            return Ok(());
        }
        if let Some(observer) = self.observer {
            observer("super_resolve");
        }

        let target_w = self.current.width() * params.scale_factor;
        let target_h = self.current.height() * params.scale_factor;

        match params.method {
            SrMethod::Bicubic => {
                self.current = resize_bicubic(&self.current, target_w, target_h).map_err(|e| {
                    EnhanceError::PipelineExecutionFailed {
                        step: "super_resolve",
                        reason: e.to_string(),
                    }
                })?;
            }
            SrMethod::Srcnn => {
                match self.engine.super_resolve(&self.current, params.scale_factor) {
                    Ok(image) => self.current = image,
                    Err(EnhanceError::ModelUnavailable(_)) => {
                        // Degradable: fall back deterministically and flag it.
                        self.degraded = true;
                        self.current =
                            resize_bicubic(&self.current, target_w, target_h).map_err(|e| {
                                EnhanceError::PipelineExecutionFailed {
                                    step: "super_resolve",
                                    reason: e.to_string(),
                                }
                            })?;
                    }
                    Err(e) => {
                        return Err(EnhanceError::PipelineExecutionFailed {
                            step: "super_resolve",
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::identity_weights;
    use std::sync::Mutex;

    fn recording_pipeline(engine: SrEngine) -> (Pipeline, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let pipeline = Pipeline::new(Arc::new(engine))
            .with_observer(Arc::new(move |name| sink.lock().unwrap().push(name)));
        (pipeline, log)
    }

    fn mid_gray(size: u32) -> ImageBuffer {
        ImageBuffer::filled(size, size, 3, 0.5).unwrap()
    }

    #[test]
    fn restore_chain_order_is_fixed() {
        let (pipeline, log) = recording_pipeline(SrEngine::disabled());
        let params = Parameters::defaults_for(EnhancementMode::Restore);
        pipeline
            .enhance(&mid_gray(32), EnhancementMode::Restore, params)
            .unwrap();

        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[
                "color_balance",
                "denoise",
                "morphological_clean",
                "equalize_adaptive",
                "sharpen",
                "auto_contrast",
            ]
        );
    }

    #[test]
    fn invalid_parameter_fires_no_steps() {
        let (pipeline, log) = recording_pipeline(SrEngine::disabled());
        let params = Parameters {
            sharpen_strength: -1.0,
            ..Parameters::defaults_for(EnhancementMode::Restore)
        };

        let result = pipeline.enhance(&mid_gray(16), EnhancementMode::Restore, params);
        assert!(matches!(
            result,
            Err(EnhanceError::InvalidParameter { name: "sharpen_strength", .. })
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_scale_factor_is_rejected() {
        let pipeline = Pipeline::without_model();
        let params = Parameters {
            scale_factor: 3,
            ..Parameters::defaults_for(EnhancementMode::SuperResolution)
        };
        let result = pipeline.enhance(&mid_gray(16), EnhancementMode::SuperResolution, params);
        assert!(matches!(
            result,
            Err(EnhanceError::InvalidParameter { name: "scale_factor", .. })
        ));
    }

    #[test]
    fn restoration_modes_preserve_shape() {
        let pipeline = Pipeline::without_model();
        let image = mid_gray(32);
        for mode in [
            EnhancementMode::Restore,
            EnhancementMode::BwPro,
            EnhancementMode::Perfect,
            EnhancementMode::FacialBeauty,
            EnhancementMode::Vintage,
        ] {
            let result = pipeline
                .enhance(&image, mode, Parameters::defaults_for(mode))
                .unwrap();
            assert_eq!(result.enhanced.shape(), image.shape(), "mode {mode:?}");
            assert!(!result.degraded);
        }
    }

    #[test]
    fn super_resolution_scales_output() {
        let engine = SrEngine::with_weights(identity_weights(&[2, 4]));
        let pipeline = Pipeline::new(Arc::new(engine));
        let image = mid_gray(16);

        let params = Parameters {
            scale_factor: 2,
            ..Parameters::defaults_for(EnhancementMode::SuperResolution)
        };
        let result = pipeline
            .enhance(&image, EnhancementMode::SuperResolution, params)
            .unwrap();
        assert_eq!(result.enhanced.shape(), (32, 32, 3));
        assert!(!result.degraded);
    }

    #[test]
    fn missing_weights_degrade_to_bicubic() {
        let pipeline = Pipeline::without_model();
        let image = mid_gray(16);
        let params = Parameters::defaults_for(EnhancementMode::SuperResolution);

        let result = pipeline
            .enhance(&image, EnhancementMode::SuperResolution, params)
            .unwrap();
        assert_eq!(result.enhanced.shape(), (32, 32, 3));
        assert!(result.degraded);
    }

    #[test]
    fn bicubic_method_is_not_degraded() {
        let pipeline = Pipeline::without_model();
        let params = Parameters {
            method: SrMethod::Bicubic,
            ..Parameters::defaults_for(EnhancementMode::SuperResolution)
        };
        let result = pipeline
            .enhance(&mid_gray(16), EnhancementMode::SuperResolution, params)
            .unwrap();
        assert!(!result.degraded);
    }

    #[test]
    fn scale_one_skips_resizing() {
        let (pipeline, log) = recording_pipeline(SrEngine::disabled());
        let params = Parameters {
            scale_factor: 1,
            ..Parameters::defaults_for(EnhancementMode::SuperResolution)
        };
        let image = mid_gray(16);
        let result = pipeline
            .enhance(&image, EnhancementMode::SuperResolution, params)
            .unwrap();

        assert_eq!(result.enhanced.shape(), image.shape());
        assert!(!log.lock().unwrap().contains(&"super_resolve"));
    }

    #[test]
    fn flat_gray_restore_scores_high() {
        let pipeline = Pipeline::without_model();
        let image = ImageBuffer::filled(64, 64, 3, 0.5).unwrap();
        let params = Parameters::defaults_for(EnhancementMode::Restore);

        let result = pipeline
            .enhance(&image, EnhancementMode::Restore, params)
            .unwrap();

        assert_eq!(result.enhanced.shape(), result.original.shape());
        assert!(result.metrics.psnr > 30.0, "psnr = {}", result.metrics.psnr);
        assert!(result.metrics.ssim >= 0.95, "ssim = {}", result.metrics.ssim);
    }

    #[test]
    fn result_carries_mode_and_untouched_original() {
        let pipeline = Pipeline::without_model();
        let image = mid_gray(16);
        let result = pipeline
            .enhance(
                &image,
                EnhancementMode::Vintage,
                Parameters::defaults_for(EnhancementMode::Vintage),
            )
            .unwrap();

        assert_eq!(result.mode, EnhancementMode::Vintage);
        assert_eq!(result.original.data(), image.data());
    }

    #[test]
    fn parameters_serde_round_trip() {
        let params = Parameters {
            scale_factor: 4,
            sharpen_strength: 0.7,
            denoise_strength: 0.2,
            method: SrMethod::Bicubic,
        };
        let serialized = toml::to_string(&params).expect("serialize");
        let deserialized: Parameters = toml::from_str(&serialized).expect("deserialize");
        assert_eq!(params, deserialized);
    }

    #[test]
    fn mode_serializes_kebab_case() {
        #[derive(Serialize)]
        struct Wrapper {
            mode: EnhancementMode,
        }
        let serialized = toml::to_string(&Wrapper {
            mode: EnhancementMode::SuperResolution,
        })
        .expect("serialize");
        assert!(serialized.contains("super-resolution"));
        assert_eq!(EnhancementMode::SuperResolution.as_str(), "super-resolution");
    }

    #[test]
    fn defaults_differ_per_mode() {
        let sr = Parameters::defaults_for(EnhancementMode::SuperResolution);
        let restore = Parameters::defaults_for(EnhancementMode::Restore);
        assert_eq!(sr.scale_factor, 2);
        assert_eq!(restore.scale_factor, 1);
        assert!(restore.denoise_strength > 0.0);
    }
}
