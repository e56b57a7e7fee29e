//! Crop geometry: one rectangle of the requested ratio that stays inside the
//! image and keeps the detected faces in frame.
//!
//! All functions here are pure. Coordinates are upright pixel coordinates.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{AspectRatio, CropRect, FaceBox};

/// Compute the crop rectangle for a `width x height` upright image.
///
/// The crop is the largest rectangle of `ratio` that fits the image. It is
/// centered on the mean of the face centers (or the image center when there
/// are no faces), clamped to the bounds, and then shifted the least amount
/// needed to contain the union of all faces when that union fits.
pub fn compute_crop(
    width: u32,
    height: u32,
    faces: &[FaceBox],
    ratio: AspectRatio,
) -> PipelineResult<CropRect> {
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "image dimensions must be > 0, got {width}x{height}"
        )));
    }

    let (crop_w, crop_h) = maximal_crop_size(width, height, ratio);
    let (anchor_x, anchor_y) = anchor_point(width, height, faces);
    let union = face_union(faces);

    let x = place_axis(
        anchor_x,
        crop_w,
        width,
        union.map(|u| (u.x, u.right())),
    );
    let y = place_axis(
        anchor_y,
        crop_h,
        height,
        union.map(|u| (u.y, u.bottom())),
    );

    tracing::trace!(
        width,
        height,
        ratio = %ratio,
        faces = faces.len(),
        x,
        y,
        crop_w,
        crop_h,
        "Computed crop"
    );

    Ok(CropRect {
        x,
        y,
        width: crop_w,
        height: crop_h,
    })
}

/// Largest `ratio`-shaped size that fits in `width x height`.
///
/// Full width is used when the matching height fits, full height otherwise.
/// Both dimensions are at least 1.
pub fn maximal_crop_size(width: u32, height: u32, ratio: AspectRatio) -> (u32, u32) {
    let rw = ratio.width() as f64;
    let rh = ratio.height() as f64;

    let full_width_h = (width as f64 * rh / rw).round();
    if full_width_h <= height as f64 {
        (width, (full_width_h as u32).max(1))
    } else {
        let full_height_w = (height as f64 * rw / rh).round() as u32;
        (full_height_w.clamp(1, width), height)
    }
}

/// Point the crop is centered on before clamping.
///
/// Arithmetic mean of face centers, every face weighted equally.
pub fn anchor_point(width: u32, height: u32, faces: &[FaceBox]) -> (f64, f64) {
    if faces.is_empty() {
        return (width as f64 / 2.0, height as f64 / 2.0);
    }
    let n = faces.len() as f64;
    let (sum_x, sum_y) = faces.iter().fold((0.0, 0.0), |(sx, sy), face| {
        let (cx, cy) = face.center();
        (sx + cx, sy + cy)
    });
    (sum_x / n, sum_y / n)
}

/// Smallest box containing every face, or `None` with no faces.
///
/// The union carries the lowest confidence of its members.
pub fn face_union(faces: &[FaceBox]) -> Option<FaceBox> {
    let first = faces.first()?;
    let mut x0 = first.x;
    let mut y0 = first.y;
    let mut x1 = first.right();
    let mut y1 = first.bottom();
    let mut confidence = first.confidence;

    for face in &faces[1..] {
        x0 = x0.min(face.x);
        y0 = y0.min(face.y);
        x1 = x1.max(face.right());
        y1 = y1.max(face.bottom());
        confidence = confidence.min(face.confidence);
    }

    Some(FaceBox {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
        confidence,
    })
}

/// Position one axis of the crop.
///
/// `span` is the face union on this axis as `(lo, hi)`. It is widened to whole
/// pixels so that the rounded integer position still contains it.
fn place_axis(anchor: f64, size: u32, extent: u32, span: Option<(f64, f64)>) -> u32 {
    let max_start = extent.saturating_sub(size) as f64;
    let mut start = (anchor - size as f64 / 2.0).clamp(0.0, max_start);

    if let Some((lo, hi)) = span {
        let lo = lo.floor().max(0.0);
        let hi = hi.ceil().min(extent as f64);
        if hi - lo <= size as f64 {
            if lo < start {
                start = lo;
            } else if hi > start + size as f64 {
                start = hi - size as f64;
            }
            start = start.clamp(0.0, max_start);
        }
    }

    (start.round() as u32).min(extent.saturating_sub(size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn face(x: f64, y: f64, w: f64, h: f64) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.99,
        }
    }

    fn ratio(w: u32, h: u32) -> AspectRatio {
        AspectRatio::new(w, h).unwrap()
    }

    #[test]
    fn test_square_image_square_ratio_no_faces() {
        let crop = compute_crop(1000, 1000, &[], AspectRatio::SQUARE).unwrap();
        assert_eq!(
            crop,
            CropRect {
                x: 0,
                y: 0,
                width: 1000,
                height: 1000
            }
        );
    }

    #[test]
    fn test_square_image_widescreen_no_faces() {
        let crop = compute_crop(1000, 1000, &[], ratio(16, 9)).unwrap();
        assert_eq!((crop.x, crop.width, crop.height), (0, 1000, 563));
        assert_eq!(crop.y, 219);
    }

    #[test]
    fn test_landscape_to_portrait_uses_full_height() {
        assert_eq!(maximal_crop_size(4000, 3000, ratio(3, 4)), (2250, 3000));
        assert_eq!(maximal_crop_size(4000, 3000, ratio(4, 3)), (4000, 3000));
    }

    #[test]
    fn test_extreme_ratio_keeps_one_pixel() {
        let (w, h) = maximal_crop_size(10, 10, ratio(1000, 1));
        assert_eq!(w, 10);
        assert_eq!(h, 1);
    }

    #[test]
    fn test_zero_dimension_is_invalid_input() {
        assert!(matches!(
            compute_crop(0, 100, &[], AspectRatio::SQUARE),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_crop(100, 0, &[], AspectRatio::SQUARE),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_anchor_is_mean_of_face_centers() {
        let faces = [face(50.0, 50.0, 100.0, 100.0), face(250.0, 50.0, 100.0, 100.0)];
        assert_eq!(anchor_point(1000, 1000, &faces), (200.0, 100.0));
    }

    #[test]
    fn test_anchor_ignores_confidence() {
        let mut low = face(0.0, 0.0, 10.0, 10.0);
        low.confidence = 0.95;
        let high = face(90.0, 0.0, 10.0, 10.0);
        assert_eq!(anchor_point(100, 100, &[low, high]).0, 50.0);
    }

    #[test]
    fn test_single_face_near_edge_is_contained() {
        // 16:9 crop of a square image, face near the bottom
        let f = face(400.0, 900.0, 80.0, 90.0);
        let crop = compute_crop(1000, 1000, &[f], ratio(16, 9)).unwrap();
        assert!(crop.contains(&f));
        assert_eq!(crop.bottom(), 1000);
    }

    #[test]
    fn test_union_shift_moves_minimally() {
        // Mean center y is 358.3, so the centered crop starts at 76.8 and
        // would cut off the top face. The union (0..550) fits in 563 rows.
        let top = face(100.0, 0.0, 50.0, 50.0);
        let a = face(300.0, 500.0, 50.0, 50.0);
        let b = face(500.0, 500.0, 50.0, 50.0);
        let crop = compute_crop(1000, 1000, &[top, a, b], ratio(16, 9)).unwrap();
        assert_eq!(crop.y, 0);
        assert!(crop.contains(&top));
        assert!(crop.contains(&a));
        assert!(crop.contains(&b));
    }

    #[test]
    fn test_union_too_large_keeps_centroid_crop() {
        let top = face(100.0, 10.0, 50.0, 50.0);
        let bottom = face(100.0, 900.0, 50.0, 50.0);
        let crop = compute_crop(1000, 1000, &[top, bottom], ratio(16, 9)).unwrap();
        // Mean center y = (35 + 925) / 2 = 480; 480 - 281.5 = 198.5
        assert_eq!(crop.y, 199);
        assert!(crop.fits_within(1000, 1000));
    }

    #[test]
    fn test_face_union() {
        let union = face_union(&[face(10.0, 20.0, 5.0, 5.0), face(30.0, 0.0, 10.0, 10.0)]).unwrap();
        assert_eq!((union.x, union.y, union.right(), union.bottom()), (10.0, 0.0, 40.0, 25.0));
        assert!(face_union(&[]).is_none());
    }

    #[test]
    fn test_same_input_same_crop() {
        let faces = [face(123.4, 56.7, 80.0, 90.0)];
        let a = compute_crop(1234, 987, &faces, ratio(4, 5)).unwrap();
        let b = compute_crop(1234, 987, &faces, ratio(4, 5)).unwrap();
        assert_eq!(a, b);
    }

    fn arb_ratio() -> impl Strategy<Value = AspectRatio> {
        (1u32..=32, 1u32..=32).prop_map(|(w, h)| AspectRatio::new(w, h).unwrap())
    }

    fn arb_face(width: u32, height: u32) -> impl Strategy<Value = FaceBox> {
        (0.0..width as f64, 0.0..height as f64, 0.05f64..1.0, 0.05f64..1.0).prop_map(
            move |(x, y, fw, fh)| {
                let w = ((width as f64 - x) * fw).max(0.5);
                let h = ((height as f64 - y) * fh).max(0.5);
                face(x, y, w, h)
            },
        )
    }

    fn arb_case() -> impl Strategy<Value = (u32, u32, Vec<FaceBox>, AspectRatio)> {
        (1u32..4000, 1u32..4000).prop_flat_map(|(w, h)| {
            (
                Just(w),
                Just(h),
                prop::collection::vec(arb_face(w, h), 0..4),
                arb_ratio(),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_crop_inside_bounds((w, h, faces, r) in arb_case()) {
            let crop = compute_crop(w, h, &faces, r).unwrap();
            prop_assert!(crop.width >= 1 && crop.height >= 1);
            prop_assert!(crop.fits_within(w, h), "{crop:?} outside {w}x{h}");
        }

        #[test]
        fn prop_crop_has_requested_ratio((w, h, faces, r) in arb_case()) {
            let crop = compute_crop(w, h, &faces, r).unwrap();
            let target = r.value();
            let cw = crop.width as f64;
            let ch = crop.height as f64;
            let ratio_ok = (cw - ch * target).abs() <= 1.0 || (ch - cw / target).abs() <= 1.0;
            // A single-pixel side means the ratio is too extreme for the image.
            prop_assert!(ratio_ok || crop.width == 1 || crop.height == 1, "{crop:?} vs {r}");
        }

        #[test]
        fn prop_crop_contains_union_when_it_fits((w, h, faces, r) in arb_case()) {
            let crop = compute_crop(w, h, &faces, r).unwrap();
            if let Some(union) = face_union(&faces) {
                let fits_x = union.right().ceil() - union.x.floor() <= crop.width as f64;
                let fits_y = union.bottom().ceil() - union.y.floor() <= crop.height as f64;
                if fits_x {
                    prop_assert!(union.x >= crop.x as f64 && union.right() <= crop.right() as f64);
                }
                if fits_y {
                    prop_assert!(union.y >= crop.y as f64 && union.bottom() <= crop.bottom() as f64);
                }
            }
        }

        #[test]
        fn prop_no_faces_is_centered((w, h, r) in (1u32..4000, 1u32..4000, arb_ratio())) {
            let crop = compute_crop(w, h, &[], r).unwrap();
            let expected_x = ((w - crop.width) as f64 / 2.0).round() as u32;
            let expected_y = ((h - crop.height) as f64 / 2.0).round() as u32;
            prop_assert_eq!(crop.x, expected_x);
            prop_assert_eq!(crop.y, expected_y);
        }
    }
}
