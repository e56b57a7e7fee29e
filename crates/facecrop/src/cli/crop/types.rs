//! CLI enum types for the crop command: report format and output orientation.

use clap::ValueEnum;
use facecrop_core::{OrientationMode, ReportFormat};

/// Report file formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormatArg {
    /// One JSON array
    #[default]
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl std::fmt::Display for ReportFormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormatArg::Json => write!(f, "json"),
            ReportFormatArg::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Jsonl => ReportFormat::JsonLines,
        }
    }
}

/// How rotated sources are written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrientationArg {
    /// Upright pixels, orientation tag reset to normal
    Bake,
    /// Original pixel orientation and tag (JPEG only)
    Restore,
}

impl From<OrientationArg> for OrientationMode {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Bake => OrientationMode::Bake,
            OrientationArg::Restore => OrientationMode::Restore,
        }
    }
}
