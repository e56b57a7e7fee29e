//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PipelineError;
use crate::types::{AspectRatio, OrientationMode};

/// File name of the YuNet model in the model directory.
pub const YUNET_MODEL_FILE: &str = "face_detection_yunet_2023mar.onnx";

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.facecrop/models"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of parallel workers, 0 = available parallelism
    pub parallel_workers: usize,

    /// Supported input extensions (case-insensitive)
    pub supported_formats: Vec<String>,

    /// Walk sub-directories of the input directory
    pub recursive: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 0,
            supported_formats: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            recursive: false,
        }
    }
}

impl ProcessingConfig {
    /// Worker count with 0 resolved to the machine's available parallelism.
    pub fn effective_workers(&self) -> usize {
        if self.parallel_workers > 0 {
            self.parallel_workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
        }
    }
}

/// Face detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum confidence for a detection to count as a face
    pub confidence_threshold: f32,

    /// Score cut applied inside the detector before NMS
    pub score_threshold: f32,

    /// IoU above which overlapping detections are suppressed
    pub nms_threshold: f32,

    /// Longest edge of the copy the detector runs on
    pub max_dimension: u32,

    /// Square network input size
    pub input_size: u32,

    /// Model file name inside `general.model_dir`
    pub model_file: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.95,
            score_threshold: 0.6,
            nms_threshold: 0.3,
            max_dimension: 800,
            input_size: 640,
            model_file: YUNET_MODEL_FILE.to_string(),
        }
    }
}

/// Crop and encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Target aspect ratio as "W:H"
    pub ratio: String,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Output orientation handling
    pub orientation: OrientationMode,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            ratio: "1:1".to_string(),
            jpeg_quality: 95,
            orientation: OrientationMode::Bake,
        }
    }
}

impl CropConfig {
    /// Parsed aspect ratio.
    pub fn aspect_ratio(&self) -> Result<AspectRatio, PipelineError> {
        self.ratio.parse()
    }
}

/// Debug overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Draw detected faces into the output
    pub enabled: bool,

    /// Rectangle line width in pixels
    pub line_width: u32,

    /// Rectangle and label color (RGB)
    pub color: [u8; 3],
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            line_width: 2,
            color: [255, 0, 0],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
