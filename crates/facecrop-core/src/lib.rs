//! Facecrop Core - face-aware aspect-ratio cropping.
//!
//! Takes a JPEG or PNG, finds the faces in it and cuts out the largest
//! rectangle of the requested aspect ratio that keeps those faces in frame.
//!
//! # Architecture
//!
//! ```text
//! Bytes → Decode → EXIF Orientation → Detect (YuNet) → Filter → Crop Geometry → Encode
//! ```
//!
//! The crop geometry is pure and lives in [`geometry`]; face detection sits
//! behind the [`FaceDetector`] trait so the pipeline can run with any
//! backend, including a fake one in tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use facecrop_core::{Config, CropOptions, CropProcessor, YuNetDetector};
//!
//! fn main() -> facecrop_core::Result<()> {
//!     let config = Config::load()?;
//!     let detector = YuNetDetector::load(&config.model_path(), &config.detection, 1)?;
//!     let processor = CropProcessor::new(&config, Arc::new(detector));
//!
//!     let options = CropOptions::from_config(&config)?;
//!     let outcome = processor.process_file("./portrait.jpg".as_ref(), &options)?;
//!     std::fs::write("./portrait-cropped.jpg", &outcome.bytes)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod faces;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::Config;
pub use detect::{FaceDetector, NullDetector, YuNetDetector};
pub use error::{ConfigError, FaceCropError, PipelineError, PipelineResult, Result};
pub use faces::filter_faces;
pub use geometry::compute_crop;
pub use output::{ReportFormat, ReportWriter};
pub use pipeline::{CropOptions, CropOutcome, CropProcessor, DetectorFailurePolicy, Orientation};
pub use types::{
    AspectRatio, CropRecord, CropRect, FaceBox, ImageKind, OrientationMode, RawDetection,
    RecordStatus,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_options_match_default_config() {
        let options = CropOptions::from_config(&Config::default()).unwrap();
        assert_eq!(options, CropOptions::default());
    }
}
