//! YuNet pre- and post-processing.
//!
//! YuNet is anchor-free. For each stride (8, 16, 32) the network emits, per
//! grid cell, a class score, an objectness score, box deltas `(dx, dy, dw, dh)`
//! and five landmarks. A cell at `(row, col)` decodes to:
//!
//! ```text
//! cx = (col + dx) * stride      w = exp(dw) * stride
//! cy = (row + dy) * stride      h = exp(dh) * stride
//! score = sqrt(clamp(cls) * clamp(obj))
//! ```
//!
//! Landmarks are not used for cropping and are ignored.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::PipelineError;

pub const STRIDES: [u32; 3] = [8, 16, 32];

/// One output tensor copied out of the session.
#[derive(Debug, Clone)]
pub struct Tensor {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

/// The score and box tensors of one YuNet run, ordered by stride.
#[derive(Debug)]
pub struct YuNetOutputs {
    cls: Vec<Tensor>,
    obj: Vec<Tensor>,
    bbox: Vec<Tensor>,
}

impl YuNetOutputs {
    /// Pick the tensors out of a session's outputs.
    ///
    /// Looks for `cls_8`, `obj_16`, `bbox_32`, ... by name first. Models
    /// exported without those names fall back to the reference ordering
    /// `cls_*, obj_*, bbox_*, kps_*`.
    pub fn from_named(
        outputs: Vec<(String, Tensor)>,
        input_size: u32,
    ) -> Result<Self, PipelineError> {
        let by_name = |prefix: &str, stride: u32| {
            let wanted = format!("{prefix}_{stride}");
            outputs
                .iter()
                .find(|(name, _)| *name == wanted)
                .map(|(_, t)| t.clone())
        };

        let named: Option<Vec<_>> = ["cls", "obj", "bbox"]
            .iter()
            .flat_map(|prefix| STRIDES.iter().map(move |&s| by_name(prefix, s)))
            .collect();

        let mut tensors = match named {
            Some(found) => found,
            None => {
                if outputs.len() < 9 {
                    return Err(PipelineError::Detector(format!(
                        "expected 12 YuNet outputs, got {}",
                        outputs.len()
                    )));
                }
                outputs.into_iter().take(9).map(|(_, t)| t).collect()
            }
        };

        let bbox = tensors.split_off(6);
        let obj = tensors.split_off(3);
        let parsed = Self {
            cls: tensors,
            obj,
            bbox,
        };
        parsed.check_sizes(input_size)?;
        Ok(parsed)
    }

    fn check_sizes(&self, input_size: u32) -> Result<(), PipelineError> {
        for (i, &stride) in STRIDES.iter().enumerate() {
            let cells = grid_cells(input_size, stride);
            for (label, tensor, per_cell) in [
                ("cls", &self.cls[i], 1),
                ("obj", &self.obj[i], 1),
                ("bbox", &self.bbox[i], 4),
            ] {
                if tensor.data.len() != cells * per_cell {
                    return Err(PipelineError::Detector(format!(
                        "{label}_{stride}: expected {} values, got {} (shape {:?})",
                        cells * per_cell,
                        tensor.data.len(),
                        tensor.shape
                    )));
                }
            }
        }
        Ok(())
    }
}

fn grid_cells(input_size: u32, stride: u32) -> usize {
    let side = (input_size / stride) as usize;
    side * side
}

/// A decoded box in network-input pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Decode every cell scoring at least `score_threshold`.
pub fn decode(outputs: &YuNetOutputs, input_size: u32, score_threshold: f32) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for (i, &stride) in STRIDES.iter().enumerate() {
        let cols = (input_size / stride) as usize;
        let cls = &outputs.cls[i].data;
        let obj = &outputs.obj[i].data;
        let bbox = &outputs.bbox[i].data;
        let s = stride as f32;

        for idx in 0..cls.len() {
            let score = (cls[idx].clamp(0.0, 1.0) * obj[idx].clamp(0.0, 1.0)).sqrt();
            if score < score_threshold {
                continue;
            }
            let row = (idx / cols) as f32;
            let col = (idx % cols) as f32;
            let d = &bbox[idx * 4..idx * 4 + 4];

            let cx = (col + d[0]) * s;
            let cy = (row + d[1]) * s;
            let w = d[2].exp() * s;
            let h = d[3].exp() * s;

            candidates.push(Candidate {
                x: cx - w / 2.0,
                y: cy - h / 2.0,
                width: w,
                height: h,
                score,
            });
        }
    }
    candidates
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if keep.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection over union of two boxes.
pub fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }
    let inter = (x2 - x1) * (y2 - y1);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// How an image was fitted into the square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    /// Map a candidate back to the letterboxed image's pixel space.
    pub fn to_source(&self, c: &Candidate) -> Candidate {
        Candidate {
            x: (c.x - self.offset_x) / self.scale,
            y: (c.y - self.offset_y) / self.scale,
            width: c.width / self.scale,
            height: c.height / self.scale,
            score: c.score,
        }
    }
}

/// Resize `img` into a centered `size x size` canvas as a BGR NCHW tensor.
///
/// Pixel values stay in 0-255; YuNet does no mean or scale normalization.
pub fn letterbox(img: &DynamicImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (width, height) = img.dimensions();
    let scale = size as f32 / width.max(height) as f32;
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    let offset_x = (size - new_w) / 2;
    let offset_y = (size - new_h) / 2;

    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let px = (x + offset_x) as usize;
        let py = (y + offset_y) as usize;
        let [r, g, b] = pixel.0;
        tensor[[0, 0, py, px]] = b as f32;
        tensor[[0, 1, py, px]] = g as f32;
        tensor[[0, 2, py, px]] = r as f32;
    }

    (
        tensor,
        Letterbox {
            // Exact per-axis scale differs from `scale` by rounding only
            scale,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        },
    )
}
