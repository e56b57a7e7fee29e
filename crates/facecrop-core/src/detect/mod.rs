//! Face detection.
//!
//! The pipeline only depends on the [`FaceDetector`] trait, so tests and
//! alternative backends can plug in without touching the crop logic.
//!
//! ```rust,ignore
//! use facecrop_core::detect::{FaceDetector, YuNetDetector};
//! use facecrop_core::Config;
//!
//! let config = Config::default();
//! let detector = YuNetDetector::load(&config.model_path(), &config.detection, 4)?;
//! let faces = detector.detect(&image)?;
//! ```

mod session;
pub mod yunet;

pub use session::YuNetDetector;

use image::DynamicImage;

use crate::error::PipelineError;
use crate::types::RawDetection;

/// Finds faces in an upright image.
///
/// Returned boxes are in the pixel coordinates of the image passed in. An
/// empty result means no faces were found; a failed detector returns
/// `PipelineError::Detector` instead.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PipelineError>;
}

/// Detector that never finds a face. Every crop is centered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

impl FaceDetector for NullDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<RawDetection>, PipelineError> {
        Ok(Vec::new())
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for std::sync::Arc<D> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PipelineError> {
        (**self).detect(image)
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PipelineError> {
        (**self).detect(image)
    }
}
