//! The `facecrop crop` command.

mod batch;
mod setup;
pub mod types;

pub use types::{OrientationArg, ReportFormatArg};

use clap::Args;
use facecrop_core::pipeline::FileDiscovery;
use facecrop_core::{Config, CropOptions, CropProcessor};
use std::path::PathBuf;
use std::sync::Arc;

use batch::{discover_inputs, run_batch};
use setup::setup_cropper;

/// Arguments for the `crop` command.
#[derive(Args, Debug)]
pub struct CropArgs {
    /// Directory containing the photos to crop
    #[arg(long, default_value = "photos")]
    pub input_dir: PathBuf,

    /// Directory the cropped photos are written to (created if missing)
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Target aspect ratio as W:H, e.g. 16:9 or 4:5 [default: 1:1]
    #[arg(long)]
    pub ratio: Option<String>,

    /// Draw detected faces and their confidence onto the outputs
    #[arg(long)]
    pub show_faces: bool,

    /// Number of parallel workers [default: available CPUs]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Re-crop photos whose output already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Minimum detector confidence for a face to count [default: 0.95]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// How rotated photos are written out [default: bake]
    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Walk sub-directories, mirroring them in the output directory
    #[arg(short, long)]
    pub recursive: bool,

    /// Crop without faces when the model is missing or detection fails
    #[arg(long)]
    pub allow_no_detector: bool,

    /// Write a per-photo report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormatArg,
}

/// Manual Default impl for constructing CropArgs outside of clap.
///
/// Values match the clap `default_value` annotations above.
impl Default for CropArgs {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("photos"),
            output_dir: PathBuf::from("output"),
            ratio: None,
            show_faces: false,
            workers: None,
            overwrite: false,
            threshold: None,
            orientation: None,
            recursive: false,
            allow_no_detector: false,
            report: None,
            format: ReportFormatArg::Json,
        }
    }
}

/// Everything a batch run needs, assembled by setup_cropper().
pub(crate) struct CropContext {
    pub processor: Arc<CropProcessor>,
    pub options: CropOptions,
    pub workers: usize,
    pub config: Config,
}

/// Execute the crop command.
pub async fn execute(args: CropArgs) -> anyhow::Result<()> {
    let ctx = setup_cropper(&args)?;

    let files = discover_inputs(&ctx.config, &args);
    if files.is_empty() {
        tracing::info!("No images found in {:?}", args.input_dir);
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) ({:.1} MB) in {:?}",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / (1024.0 * 1024.0),
        args.input_dir
    );

    run_batch(ctx, &args, files).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_args_default_dirs() {
        let args = CropArgs::default();
        assert_eq!(args.input_dir, PathBuf::from("photos"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn crop_args_default_flags_are_off() {
        let args = CropArgs::default();
        assert!(!args.show_faces);
        assert!(!args.overwrite);
        assert!(!args.recursive);
        assert!(!args.allow_no_detector);
    }

    #[test]
    fn crop_args_default_overrides_are_none() {
        let args = CropArgs::default();
        assert!(args.ratio.is_none());
        assert!(args.workers.is_none());
        assert!(args.threshold.is_none());
        assert!(args.orientation.is_none());
        assert!(args.report.is_none());
        assert_eq!(args.format, ReportFormatArg::Json);
    }
}
