//! Single-image pipeline: decode, orient, detect, crop, encode.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, LimitsConfig};
use crate::detect::FaceDetector;
use crate::error::{PipelineError, PipelineResult};
use crate::faces::{faces_in_frame, filter_faces, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::geometry::compute_crop;
use crate::types::{AspectRatio, CropRect, ImageKind, OrientationMode};

use super::compositor::{CompositeInput, Compositor, CompositorOptions, DEFAULT_JPEG_QUALITY};
use super::decode::ImageDecoder;
use super::orientation::{normalize, Orientation};
use super::overlay::OverlayStyle;
use super::validate::Validator;

/// What to do when the detector itself fails on an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetectorFailurePolicy {
    /// Surface the error; the image fails.
    #[default]
    Fail,
    /// Log a warning and crop as if no faces were found.
    Degrade,
}

/// Per-run crop options.
#[derive(Debug, Clone, PartialEq)]
pub struct CropOptions {
    pub ratio: AspectRatio,
    pub confidence_threshold: f32,
    /// Draw detected faces into the output when set
    pub overlay: Option<OverlayStyle>,
    pub orientation_mode: OrientationMode,
    pub jpeg_quality: u8,
    pub detector_failure: DetectorFailurePolicy,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            ratio: AspectRatio::SQUARE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            overlay: None,
            orientation_mode: OrientationMode::Bake,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            detector_failure: DetectorFailurePolicy::Fail,
        }
    }
}

impl CropOptions {
    /// Options as configured, before any CLI overrides.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        Ok(Self {
            ratio: config.crop.aspect_ratio()?,
            confidence_threshold: config.detection.confidence_threshold,
            overlay: config
                .overlay
                .enabled
                .then(|| OverlayStyle::from(&config.overlay)),
            orientation_mode: config.crop.orientation,
            jpeg_quality: config.crop.jpeg_quality,
            detector_failure: DetectorFailurePolicy::Fail,
        })
    }
}

/// Result of cropping one image.
#[derive(Debug, Clone)]
pub struct CropOutcome {
    /// Encoded output
    pub bytes: Vec<u8>,
    /// Faces that passed the confidence filter
    pub face_count: usize,
    pub crop: CropRect,
    /// Upright source width
    pub width: u32,
    /// Upright source height
    pub height: u32,
    /// Orientation the source was stored in
    pub orientation: Orientation,
    pub kind: ImageKind,
    /// The detector failed and the crop fell back to no-face mode
    pub detector_degraded: bool,
}

/// Runs the crop pipeline for single images.
///
/// Stateless between calls. The detector is shared and may be called from
/// several threads at once.
pub struct CropProcessor {
    decoder: ImageDecoder,
    validator: Validator,
    detector: Arc<dyn FaceDetector>,
}

impl CropProcessor {
    pub fn new(config: &Config, detector: Arc<dyn FaceDetector>) -> Self {
        Self::with_limits(config.limits.clone(), detector)
    }

    pub fn with_limits(limits: LimitsConfig, detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            decoder: ImageDecoder::new(limits.clone()),
            validator: Validator::new(limits),
            detector,
        }
    }

    /// Crop one encoded image.
    pub fn process_image(&self, bytes: &[u8], options: &CropOptions) -> PipelineResult<CropOutcome> {
        let start = Instant::now();

        let decoded = self.decoder.decode(bytes)?;
        tracing::trace!("  Decode: {:?}", start.elapsed());

        let (upright, orientation) = normalize(bytes, decoded.image);
        let (width, height) = (upright.width(), upright.height());

        let detect_start = Instant::now();
        let (raw, detector_degraded) = match self.detector.detect(&upright) {
            Ok(raw) => (raw, false),
            Err(e) => match options.detector_failure {
                DetectorFailurePolicy::Fail => return Err(e),
                DetectorFailurePolicy::Degrade => {
                    tracing::warn!("Face detection failed, cropping without faces: {e}");
                    (Vec::new(), true)
                }
            },
        };
        tracing::trace!("  Detect: {:?}", detect_start.elapsed());

        let faces = faces_in_frame(
            &filter_faces(&raw, options.confidence_threshold),
            width,
            height,
        );
        let crop = compute_crop(width, height, &faces, options.ratio)?;

        let encode_start = Instant::now();
        let bytes = Compositor::compose(
            &CompositeInput {
                upright: &upright,
                crop,
                orientation,
                faces: &faces,
                source: bytes,
                kind: decoded.kind,
            },
            &CompositorOptions {
                overlay: options.overlay,
                orientation_mode: options.orientation_mode,
                jpeg_quality: options.jpeg_quality,
            },
        )?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        tracing::debug!(
            "Cropped {}x{} {} to {}x{} at ({}, {}) with {} face(s) in {:?}",
            width,
            height,
            decoded.kind,
            crop.width,
            crop.height,
            crop.x,
            crop.y,
            faces.len(),
            start.elapsed()
        );

        Ok(CropOutcome {
            bytes,
            face_count: faces.len(),
            crop,
            width,
            height,
            orientation,
            kind: decoded.kind,
            detector_degraded,
        })
    }

    /// Validate, read and crop a file. Nothing is written.
    pub fn process_file(&self, path: &Path, options: &CropOptions) -> PipelineResult<CropOutcome> {
        self.validator.validate(path)?;
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::FileNotFound(path.to_path_buf())
            } else {
                PipelineError::Decode(format!("cannot read {}: {e}", path.display()))
            }
        })?;
        self.process_image(&bytes, options)
    }
}
