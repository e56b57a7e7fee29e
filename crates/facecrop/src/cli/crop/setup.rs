//! Cropper setup: config overrides, detector loading, output directory.

use std::sync::Arc;

use facecrop_core::pipeline::OverlayStyle;
use facecrop_core::{
    AspectRatio, Config, CropOptions, CropProcessor, DetectorFailurePolicy, FaceDetector,
    NullDetector, YuNetDetector,
};

use super::{CropArgs, CropContext};

/// Validate the directories, load config and the detector, and assemble the context.
pub fn setup_cropper(args: &CropArgs) -> anyhow::Result<CropContext> {
    if !args.input_dir.is_dir() {
        anyhow::bail!(
            "Input directory does not exist: {:?}\n\n  Hint: pass --input-dir or create ./photos.",
            args.input_dir
        );
    }

    let mut config = Config::load()?;
    let (options, workers) = apply_overrides(args, &mut config)?;
    let detector = load_detector(&config, workers, args.allow_no_detector)?;

    std::fs::create_dir_all(&args.output_dir)?;

    tracing::info!("Crop ratio: {}", options.ratio);
    tracing::info!("Face confidence threshold: {:.2}", options.confidence_threshold);
    tracing::info!("Orientation: {}", options.orientation_mode);
    if options.overlay.is_some() {
        tracing::info!("Face boxes and confidence scores will be drawn on outputs");
    }
    if args.overwrite {
        tracing::info!("Overwrite enabled: existing outputs will be replaced");
    }
    tracing::info!("Using {} worker(s)", workers);

    Ok(CropContext {
        processor: Arc::new(CropProcessor::new(&config, detector)),
        options,
        workers,
        config,
    })
}

/// Fold CLI flags into the config and build the crop options.
///
/// Returns the options and the worker count.
fn apply_overrides(
    args: &CropArgs,
    config: &mut Config,
) -> anyhow::Result<(CropOptions, usize)> {
    if args.recursive {
        config.processing.recursive = true;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be at least 1");
        }
        config.processing.parallel_workers = workers;
    }

    let mut options = CropOptions::from_config(config)?;

    if let Some(ratio) = &args.ratio {
        options.ratio = ratio.parse::<AspectRatio>()?;
        config.crop.ratio = options.ratio.to_string();
    }
    if let Some(threshold) = args.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("--threshold must be between 0 and 1, got {threshold}");
        }
        options.confidence_threshold = threshold;
    }
    if let Some(orientation) = args.orientation {
        options.orientation_mode = orientation.into();
    }
    if args.show_faces {
        options.overlay = Some(OverlayStyle::from(&config.overlay));
    }
    if args.allow_no_detector {
        options.detector_failure = DetectorFailurePolicy::Degrade;
    }

    Ok((options, config.processing.effective_workers()))
}

/// Load YuNet with one session per worker, or fall back to no detection.
fn load_detector(
    config: &Config,
    workers: usize,
    allow_no_detector: bool,
) -> anyhow::Result<Arc<dyn FaceDetector>> {
    match YuNetDetector::load(&config.model_path(), &config.detection, workers) {
        Ok(detector) => Ok(Arc::new(detector)),
        Err(e) if allow_no_detector => {
            tracing::warn!("{e}");
            tracing::warn!("Continuing without face detection: every crop will be centered");
            Ok(Arc::new(NullDetector))
        }
        Err(e) => anyhow::bail!(
            "{e}\n\n  Hint: pass --allow-no-detector to crop without face detection."
        ),
    }
}
