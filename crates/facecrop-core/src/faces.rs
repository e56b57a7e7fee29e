//! Confidence filtering of raw detector output.

use crate::types::{FaceBox, RawDetection};

/// Default minimum confidence for a detection to count as a face.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.95;

/// Keep detections with `confidence >= threshold`.
///
/// Boxes with a non-positive side or any non-finite value are dropped even
/// when their confidence qualifies. Surviving confidences are clamped into
/// `[0, 1]`. An empty result is valid and means no-face mode.
pub fn filter_faces(detections: &[RawDetection], threshold: f32) -> Vec<FaceBox> {
    let faces: Vec<FaceBox> = detections
        .iter()
        .filter(|d| is_well_formed(d))
        .filter(|d| d.confidence >= threshold)
        .map(|d| FaceBox {
            x: d.x as f64,
            y: d.y as f64,
            width: d.width as f64,
            height: d.height as f64,
            confidence: d.confidence.clamp(0.0, 1.0),
        })
        .collect();

    tracing::trace!(
        raw = detections.len(),
        kept = faces.len(),
        threshold,
        "Filtered detections"
    );
    faces
}

/// Drop faces lying entirely outside the image.
///
/// Boxes that are partly inside are kept unchanged, so their centers still
/// count toward the crop anchor.
pub fn faces_in_frame(faces: &[FaceBox], width: u32, height: u32) -> Vec<FaceBox> {
    faces
        .iter()
        .filter(|f| f.overlaps(width, height))
        .copied()
        .collect()
}

fn is_well_formed(d: &RawDetection) -> bool {
    [d.x, d.y, d.width, d.height, d.confidence]
        .iter()
        .all(|v| v.is_finite())
        && d.width > 0.0
        && d.height > 0.0
}
