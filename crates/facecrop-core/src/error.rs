//! Error types for the facecrop pipeline.
//!
//! Errors are organized by stage so batch reporting can tell a decode failure
//! apart from a detector failure or an invalid request.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for facecrop operations.
#[derive(Error, Debug)]
pub enum FaceCropError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors (crop reports)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Non-positive dimensions or a degenerate aspect ratio.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A ratio string that is not of the form `W:H`.
    #[error("Invalid aspect ratio {input:?}: {message}")]
    InvalidRatio { input: String, message: String },

    /// Image bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Format is neither JPEG nor PNG
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The face detector failed on this image (distinct from "no faces").
    #[error("Face detector failed: {0}")]
    Detector(String),

    /// The detection model could not be loaded.
    #[error("Model error for {path}: {message}")]
    Model { path: PathBuf, message: String },

    /// Encoding the cropped image failed
    #[error("Encode error: {0}")]
    Encode(String),
}

/// Convenience type alias for facecrop results.
pub type Result<T> = std::result::Result<T, FaceCropError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
