//! End-to-end tests of the single-image pipeline with fake detectors.

use std::io::Cursor;
use std::sync::Arc;

use facecrop_core::config::LimitsConfig;
use facecrop_core::pipeline::metadata::{insert_exif, minimal_orientation_block};
use facecrop_core::pipeline::normalize;
use facecrop_core::{
    compute_crop, AspectRatio, CropOptions, CropProcessor, CropRect, DetectorFailurePolicy,
    FaceDetector, ImageKind, NullDetector, Orientation, OrientationMode, PipelineError,
    PipelineResult, RawDetection,
};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageFormat, Rgb, RgbImage};

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Returns the same detections for every image.
struct FakeDetector(Vec<RawDetection>);

impl FaceDetector for FakeDetector {
    fn detect(&self, _image: &DynamicImage) -> PipelineResult<Vec<RawDetection>> {
        Ok(self.0.clone())
    }
}

struct FailingDetector;

impl FaceDetector for FailingDetector {
    fn detect(&self, _image: &DynamicImage) -> PipelineResult<Vec<RawDetection>> {
        Err(PipelineError::Detector("model crashed".into()))
    }
}

fn processor(detector: impl FaceDetector + 'static) -> CropProcessor {
    CropProcessor::with_limits(LimitsConfig::default(), Arc::new(detector))
}

fn png(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn jpeg(img: &RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 95)
        .encode(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// 200x100 as stored, left half red, right half blue, tagged "rotate 90 CW".
///
/// Upright it is 100x200 with red on top and blue below.
fn rotated_jpeg() -> Vec<u8> {
    let stored = RgbImage::from_fn(200, 100, |x, _| if x < 100 { RED } else { BLUE });
    insert_exif(&jpeg(&stored), &minimal_orientation_block(6)).unwrap()
}

fn is_red(p: Rgb<u8>) -> bool {
    p[0] > 150 && p[2] < 100
}

fn is_blue(p: Rgb<u8>) -> bool {
    p[2] > 150 && p[0] < 100
}

/// Decode an output and turn it upright the way a tag-aware viewer would.
fn view(bytes: &[u8]) -> (RgbImage, Orientation) {
    let decoded = image::load_from_memory(bytes).unwrap();
    let (upright, orientation) = normalize(bytes, decoded);
    (upright.to_rgb8(), orientation)
}

#[test]
fn square_image_square_ratio_is_whole_image() {
    let bytes = png(&RgbImage::from_pixel(1000, 1000, RED));
    let outcome = processor(NullDetector)
        .process_image(&bytes, &CropOptions::default())
        .unwrap();

    assert_eq!(
        outcome.crop,
        CropRect {
            x: 0,
            y: 0,
            width: 1000,
            height: 1000
        }
    );
    assert_eq!(outcome.kind, ImageKind::Png);
    let out = image::load_from_memory(&outcome.bytes).unwrap();
    assert_eq!(out.dimensions(), (1000, 1000));
}

#[test]
fn square_image_widescreen_ratio_is_centered() {
    let bytes = png(&RgbImage::from_pixel(1000, 1000, RED));
    let options = CropOptions {
        ratio: "16:9".parse().unwrap(),
        ..CropOptions::default()
    };
    let outcome = processor(NullDetector).process_image(&bytes, &options).unwrap();

    assert_eq!((outcome.crop.width, outcome.crop.height), (1000, 563));
    assert!(outcome.crop.y.abs_diff(219) <= 1);
    let out = image::load_from_memory(&outcome.bytes).unwrap();
    assert_eq!(out.dimensions(), (1000, 563));
}

#[test]
fn faces_pull_the_crop_and_stay_inside() {
    // Two faces near the top of a tall image.
    let detector = FakeDetector(vec![
        RawDetection::new(60.0, 40.0, 80.0, 80.0, 0.99),
        RawDetection::new(260.0, 40.0, 80.0, 80.0, 0.97),
        RawDetection::new(150.0, 900.0, 80.0, 80.0, 0.40),
    ]);
    let bytes = png(&RgbImage::from_pixel(400, 1000, BLUE));
    let outcome = processor(detector)
        .process_image(&bytes, &CropOptions::default())
        .unwrap();

    assert_eq!(outcome.face_count, 2);
    assert_eq!(
        outcome.crop,
        CropRect {
            x: 0,
            y: 0,
            width: 400,
            height: 400
        }
    );
}

#[test]
fn faces_partly_outside_keep_their_full_centers() {
    // Centers at x = -30 and x = 930, so the anchor is x = 450.
    let detector = FakeDetector(vec![
        RawDetection::new(-80.0, 100.0, 100.0, 100.0, 0.99),
        RawDetection::new(880.0, 100.0, 100.0, 100.0, 0.99),
    ]);
    let bytes = png(&RgbImage::from_pixel(1000, 500, BLUE));
    let outcome = processor(detector)
        .process_image(&bytes, &CropOptions::default())
        .unwrap();

    assert_eq!(outcome.face_count, 2);
    assert_eq!(
        outcome.crop,
        CropRect {
            x: 200,
            y: 0,
            width: 500,
            height: 500
        }
    );
}

#[test]
fn face_entirely_outside_is_ignored() {
    let detector = FakeDetector(vec![RawDetection::new(1200.0, 100.0, 100.0, 100.0, 0.99)]);
    let bytes = png(&RgbImage::from_pixel(1000, 500, BLUE));
    let outcome = processor(detector)
        .process_image(&bytes, &CropOptions::default())
        .unwrap();

    assert_eq!(outcome.face_count, 0);
    assert_eq!(outcome.crop.x, 250);
}

#[test]
fn same_input_gives_identical_bytes() {
    let detector = FakeDetector(vec![RawDetection::new(10.0, 10.0, 30.0, 30.0, 0.99)]);
    let p = processor(detector);
    let bytes = rotated_jpeg();
    let options = CropOptions {
        ratio: AspectRatio::new(4, 5).unwrap(),
        ..CropOptions::default()
    };

    let first = p.process_image(&bytes, &options).unwrap();
    let second = p.process_image(&bytes, &options).unwrap();
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.crop, second.crop);
}

#[test]
fn rotated_source_baked_upright() {
    let outcome = processor(NullDetector)
        .process_image(&rotated_jpeg(), &CropOptions::default())
        .unwrap();

    assert_eq!(outcome.orientation, Orientation::Rotate90CW);
    assert_eq!((outcome.width, outcome.height), (100, 200));
    assert_eq!(
        outcome.crop,
        CropRect {
            x: 0,
            y: 50,
            width: 100,
            height: 100
        }
    );

    let (upright, tag) = view(&outcome.bytes);
    assert_eq!(tag, Orientation::Normal);
    assert_eq!(upright.dimensions(), (100, 100));
    assert!(is_red(*upright.get_pixel(50, 10)));
    assert!(is_blue(*upright.get_pixel(50, 90)));
}

#[test]
fn rotated_source_restored_keeps_tag() {
    let options = CropOptions {
        ratio: AspectRatio::new(1, 2).unwrap(),
        orientation_mode: OrientationMode::Restore,
        ..CropOptions::default()
    };
    let outcome = processor(NullDetector)
        .process_image(&rotated_jpeg(), &options)
        .unwrap();

    // Stored pixels go back to landscape.
    let stored = image::load_from_memory(&outcome.bytes).unwrap();
    assert_eq!(stored.dimensions(), (200, 100));

    // A viewer honoring the tag sees the same picture as the baked output.
    let (upright, tag) = view(&outcome.bytes);
    assert_eq!(tag, Orientation::Rotate90CW);
    assert_eq!(upright.dimensions(), (100, 200));
    assert!(is_red(*upright.get_pixel(50, 20)));
    assert!(is_blue(*upright.get_pixel(50, 180)));
}

#[test]
fn restore_on_png_falls_back_to_upright() {
    let img = RgbImage::from_fn(60, 40, |x, _| if x < 30 { RED } else { BLUE });
    let options = CropOptions {
        orientation_mode: OrientationMode::Restore,
        ..CropOptions::default()
    };
    let outcome = processor(NullDetector).process_image(&png(&img), &options).unwrap();

    let out = image::load_from_memory(&outcome.bytes).unwrap().to_rgb8();
    assert_eq!(out.dimensions(), (40, 40));
    assert_eq!(*out.get_pixel(0, 0), RED);
    assert_eq!(*out.get_pixel(39, 0), BLUE);
}

#[test]
fn degenerate_ratio_is_invalid_input() {
    assert!(matches!(
        AspectRatio::new(0, 9),
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        "16:0".parse::<AspectRatio>(),
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        "-4:3".parse::<AspectRatio>(),
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        "wide".parse::<AspectRatio>(),
        Err(PipelineError::InvalidRatio { .. })
    ));
    assert!(matches!(
        compute_crop(0, 100, &[], AspectRatio::SQUARE),
        Err(PipelineError::InvalidInput(_))
    ));
}

#[test]
fn detector_failure_fails_or_degrades() {
    let p = processor(FailingDetector);
    let bytes = png(&RgbImage::from_pixel(300, 200, RED));

    let err = p.process_image(&bytes, &CropOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Detector(_)));

    let options = CropOptions {
        detector_failure: DetectorFailurePolicy::Degrade,
        ..CropOptions::default()
    };
    let outcome = p.process_image(&bytes, &options).unwrap();
    assert!(outcome.detector_degraded);
    assert_eq!(outcome.crop.x, 50);
}

#[test]
fn overlay_marks_output_but_not_geometry() {
    let detector = FakeDetector(vec![RawDetection::new(20.0, 20.0, 40.0, 40.0, 0.99)]);
    let p = processor(detector);
    let bytes = png(&RgbImage::from_pixel(100, 100, BLUE));

    let plain = p.process_image(&bytes, &CropOptions::default()).unwrap();
    let marked = p
        .process_image(
            &bytes,
            &CropOptions {
                overlay: Some(Default::default()),
                ..CropOptions::default()
            },
        )
        .unwrap();

    assert_eq!(plain.crop, marked.crop);
    assert_ne!(plain.bytes, marked.bytes);
    let out = image::load_from_memory(&marked.bytes).unwrap().to_rgb8();
    assert_eq!(*out.get_pixel(20, 40), RED);
}
