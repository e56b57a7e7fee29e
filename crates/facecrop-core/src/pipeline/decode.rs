//! Image decoding with content-based format detection and dimension limits.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::ImageKind;

/// Image decoder with configurable limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image, before orientation is applied.
pub struct DecodedImage {
    /// Pixels in stored (not yet upright) orientation
    pub image: DynamicImage,
    /// Container format, detected from content
    pub kind: ImageKind,
    /// Stored width in pixels
    pub width: u32,
    /// Stored height in pixels
    pub height: u32,
    /// Size of the encoded input in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode JPEG or PNG bytes.
    ///
    /// The format comes from the content, not from a file extension. Anything
    /// that is not JPEG or PNG is `UnsupportedFormat`.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, PipelineError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(format!("cannot detect image format: {e}")))?;

        let format = reader
            .format()
            .ok_or_else(|| PipelineError::Decode("unrecognized image data".to_string()))?;
        let kind = ImageKind::from_format(format)
            .ok_or_else(|| PipelineError::UnsupportedFormat(format_to_string(format)))?;

        let image = reader
            .decode()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidInput(format!(
                "image dimensions must be > 0, got {width}x{height}"
            )));
        }
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        Ok(DecodedImage {
            image,
            kind,
            width,
            height,
            file_size: bytes.len() as u64,
        })
    }
}

/// Lowercase name of an image format for messages.
pub fn format_to_string(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| format!("{format:?}").to_lowercase())
}
