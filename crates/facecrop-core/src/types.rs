//! Core value types shared across the crop pipeline.
//!
//! Everything here is created per image and never mutated after creation;
//! transformations return new values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PipelineError;

/// A face as reported by a detector, in upright pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detector score, nominally in [0, 1].
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(x: f32, y: f32, width: f32, height: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }
}

/// A detection that passed the confidence filter.
///
/// Width and height are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f32,
}

impl FaceBox {
    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether any part of the box lies inside `[0, width) x [0, height)`.
    pub fn overlaps(&self, width: u32, height: u32) -> bool {
        self.x < width as f64 && self.y < height as f64 && self.right() > 0.0 && self.bottom() > 0.0
    }
}

/// Target aspect ratio `rw:rh`, stored reduced to lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// Square crops.
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Build a ratio from two positive integers.
    pub fn new(width: u32, height: u32) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidInput(format!(
                "aspect ratio components must be > 0, got {width}:{height}"
            )));
        }
        let divisor = gcd(width, height);
        Ok(Self {
            width: width / divisor,
            height: height / divisor,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::SQUARE
    }
}

impl FromStr for AspectRatio {
    type Err = PipelineError;

    /// Parse `"W:H"` (whitespace around either side is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| PipelineError::InvalidRatio {
            input: s.to_string(),
            message: message.to_string(),
        };

        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected the form W:H, e.g. 16:9"))?;
        let w: i64 = w
            .trim()
            .parse()
            .map_err(|_| invalid("width is not an integer"))?;
        let h: i64 = h
            .trim()
            .parse()
            .map_err(|_| invalid("height is not an integer"))?;

        if w <= 0 || h <= 0 {
            return Err(PipelineError::InvalidInput(format!(
                "aspect ratio components must be > 0, got {w}:{h}"
            )));
        }
        let w = u32::try_from(w).map_err(|_| invalid("width is too large"))?;
        let h = u32::try_from(h).map_err(|_| invalid("height is too large"))?;
        Self::new(w, h)
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Axis-aligned crop rectangle in upright pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the rectangle lies inside a `width x height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Whether the face box is fully inside the rectangle.
    pub fn contains(&self, face: &FaceBox) -> bool {
        face.x >= self.x as f64
            && face.y >= self.y as f64
            && face.right() <= self.right() as f64
            && face.bottom() <= self.bottom() as f64
    }
}

/// Image container formats the pipeline reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Map from the `image` crate's format, if supported.
    pub fn from_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Jpeg => write!(f, "jpeg"),
            ImageKind::Png => write!(f, "png"),
        }
    }
}

/// How the source EXIF orientation is carried into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Upright pixels, orientation tag written as 1.
    #[default]
    Bake,
    /// Pixels turned back to the stored orientation and the source tag kept.
    Restore,
}

impl FromStr for OrientationMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bake" => Ok(Self::Bake),
            "restore" => Ok(Self::Restore),
            other => Err(PipelineError::InvalidInput(format!(
                "unknown orientation mode {other:?} (expected bake or restore)"
            ))),
        }
    }
}

impl fmt::Display for OrientationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrientationMode::Bake => write!(f, "bake"),
            OrientationMode::Restore => write!(f, "restore"),
        }
    }
}

/// Outcome of one file in a batch, as written to the crop report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropRecord {
    /// Source file
    pub file: PathBuf,

    /// Destination file
    pub output: PathBuf,

    pub status: RecordStatus,

    /// Faces that passed the confidence filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faces: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,

    /// Upright source width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Upright source height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// EXIF orientation value of the source (1-8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-file status in a crop report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Cropped,
    Skipped,
    Failed,
}
