//! Input validation before reading a whole file.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates files before processing.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Quick checks before a full read and decode.
    ///
    /// - File exists and is readable
    /// - File size is within limits
    /// - File starts with JPEG or PNG magic bytes
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| PipelineError::Decode(format!("cannot read metadata: {e}")))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_magic_bytes(path)
    }

    fn check_magic_bytes(&self, path: &Path) -> Result<(), PipelineError> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| PipelineError::Decode(format!("cannot open file: {e}")))?;

        let mut header = [0u8; 8];
        let bytes_read = file.read(&mut header).unwrap_or(0);

        if bytes_read < 4 {
            return Err(PipelineError::Decode(
                "file too small to be a valid image".to_string(),
            ));
        }

        if !Self::is_supported_header(&header[..bytes_read]) {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{} is not a JPEG or PNG file",
                path.display()
            )));
        }

        Ok(())
    }

    fn is_supported_header(header: &[u8]) -> bool {
        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }
        // PNG: 89 50 4E 47
        header.starts_with(&[0x89, b'P', b'N', b'G'])
    }
}
