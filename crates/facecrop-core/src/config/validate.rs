//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "detection.confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.score_threshold) {
            return Err(ConfigError::ValidationError(
                "detection.score_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.nms_threshold) {
            return Err(ConfigError::ValidationError(
                "detection.nms_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.detection.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "detection.max_dimension must be > 0".into(),
            ));
        }
        // YuNet's coarsest stride is 32
        if self.detection.input_size == 0 || self.detection.input_size % 32 != 0 {
            return Err(ConfigError::ValidationError(
                "detection.input_size must be a positive multiple of 32".into(),
            ));
        }
        if self.crop.jpeg_quality == 0 || self.crop.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "crop.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if let Err(e) = self.crop.aspect_ratio() {
            return Err(ConfigError::ValidationError(format!("crop.ratio: {e}")));
        }
        if self.overlay.line_width == 0 {
            return Err(ConfigError::ValidationError(
                "overlay.line_width must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.limits.max_image_dimension = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_image_dimension"));
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut config = Config::default();
        config.detection.confidence_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));

        config.detection.confidence_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = Config::default();
        config.crop.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.crop.jpeg_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut config = Config::default();
        config.crop.ratio = "wide".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("crop.ratio"));
    }

    #[test]
    fn test_validate_rejects_odd_input_size() {
        let mut config = Config::default();
        config.detection.input_size = 100;
        assert!(config.validate().is_err());
    }
}
