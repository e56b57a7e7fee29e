//! YuNet ONNX sessions and the detector built on them.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ort::session::Session;
use ort::value::Value;

use super::yunet::{self, Candidate, Tensor, YuNetOutputs};
use super::FaceDetector;
use crate::config::DetectionConfig;
use crate::error::PipelineError;
use crate::types::RawDetection;

/// YuNet face detector.
///
/// Holds a small pool of sessions. `Session::run` needs `&mut self`, so each
/// session sits behind its own `Mutex` and callers are spread round-robin.
pub struct YuNetDetector {
    sessions: Vec<Mutex<Session>>,
    next: AtomicUsize,
    input_name: String,
    input_size: u32,
    score_threshold: f32,
    nms_threshold: f32,
    max_dimension: u32,
}

impl YuNetDetector {
    /// Load `pool_size` sessions of the model at `model_path`.
    pub fn load(
        model_path: &Path,
        config: &DetectionConfig,
        pool_size: usize,
    ) -> Result<Self, PipelineError> {
        if !model_path.exists() {
            return Err(PipelineError::Model {
                path: model_path.to_path_buf(),
                message: "Model not found. Run `facecrop models download` first.".to_string(),
            });
        }

        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            sessions.push(Mutex::new(load_session(model_path)?));
        }

        let input_name = sessions
            .first()
            .and_then(|s| s.lock().ok())
            .and_then(|s| s.inputs().first().map(|i| i.name().to_string()))
            .unwrap_or_else(|| "input".to_string());

        tracing::info!(
            "Loaded YuNet model from {:?} ({} session(s), input {:?})",
            model_path,
            pool_size,
            input_name
        );

        Ok(Self {
            sessions,
            next: AtomicUsize::new(0),
            input_name,
            input_size: config.input_size,
            score_threshold: config.score_threshold,
            nms_threshold: config.nms_threshold,
            max_dimension: config.max_dimension,
        })
    }

    /// Run the network once and copy every output tensor out of the session.
    fn run(
        &self,
        image: &DynamicImage,
    ) -> Result<(Vec<(String, Tensor)>, yunet::Letterbox), PipelineError> {
        let (tensor, letterbox) = yunet::letterbox(image, self.input_size);

        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat: Vec<f32> = tensor.iter().copied().collect();
        let input_value = Value::from_array((shape, flat))
            .map_err(|e| PipelineError::Detector(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[slot]
            .lock()
            .map_err(|e| PipelineError::Detector(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| PipelineError::Detector(format!("ONNX inference failed: {e}")))?;

        let mut copied = Vec::new();
        for (name, value) in outputs.iter() {
            let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                PipelineError::Detector(format!("Failed to extract output {name}: {e}"))
            })?;
            copied.push((
                name.to_string(),
                Tensor {
                    shape: shape.iter().copied().collect(),
                    data: data.to_vec(),
                },
            ));
        }
        Ok((copied, letterbox))
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, PipelineError> {
        // Detect on a reduced copy; boxes are scaled back afterwards.
        let scale = DetectionScale::fit(image.dimensions(), self.max_dimension);
        let work = if scale.is_identity() {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(image.resize_exact(scale.width, scale.height, FilterType::Triangle))
        };

        let start = std::time::Instant::now();
        let (raw, letterbox) = self.run(&work)?;
        let outputs = YuNetOutputs::from_named(raw, self.input_size)?;
        let candidates = yunet::decode(&outputs, self.input_size, self.score_threshold);
        let kept = yunet::nms(candidates, self.nms_threshold);

        tracing::trace!(
            faces = kept.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "YuNet detection"
        );

        Ok(kept
            .iter()
            .map(|c| scale.to_full_resolution(&letterbox.to_source(c)))
            .collect())
    }
}

/// Size of the copy handed to the network, and the factors back to the source.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DetectionScale {
    width: u32,
    height: u32,
    back_x: f32,
    back_y: f32,
}

impl DetectionScale {
    /// Shrink `(width, height)` so the longest edge is at most `max_dimension`.
    ///
    /// Each axis is rounded on its own, so `back_x` and `back_y` can differ
    /// slightly on non-square images.
    fn fit((width, height): (u32, u32), max_dimension: u32) -> Self {
        let longest = width.max(height);
        if longest <= max_dimension {
            return Self {
                width,
                height,
                back_x: 1.0,
                back_y: 1.0,
            };
        }
        let factor = max_dimension as f32 / longest as f32;
        let w = ((width as f32 * factor).round() as u32).max(1);
        let h = ((height as f32 * factor).round() as u32).max(1);
        Self {
            width: w,
            height: h,
            back_x: width as f32 / w as f32,
            back_y: height as f32 / h as f32,
        }
    }

    fn is_identity(&self) -> bool {
        self.back_x == 1.0 && self.back_y == 1.0
    }

    /// Map a box on the reduced copy to source-image pixels.
    fn to_full_resolution(&self, c: &Candidate) -> RawDetection {
        RawDetection::new(
            c.x * self.back_x,
            c.y * self.back_y,
            c.width * self.back_x,
            c.height * self.back_y,
            c.score,
        )
    }
}

fn load_session(model_path: &Path) -> Result<Session, PipelineError> {
    let model_error = |message: String| PipelineError::Model {
        path: PathBuf::from(model_path),
        message,
    };

    Session::builder()
        .map_err(|e| model_error(format!("Failed to create ONNX session builder: {e}")))?
        .with_intra_threads(1)
        .map_err(|e| model_error(format!("Failed to configure ONNX session: {e}")))?
        .commit_from_file(model_path)
        .map_err(|e| model_error(format!("Failed to load ONNX model: {e}")))
}
