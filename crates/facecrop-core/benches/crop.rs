//! Benchmarks for crop geometry and the compositor.
//!
//! Run with: cargo bench -p facecrop-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facecrop_core::pipeline::{CompositeInput, Compositor, CompositorOptions, Orientation};
use facecrop_core::{compute_crop, filter_faces, AspectRatio, ImageKind, RawDetection};
use image::DynamicImage;

fn detections() -> Vec<RawDetection> {
    (0..8)
        .map(|i| {
            let offset = i as f32 * 180.0;
            RawDetection::new(100.0 + offset, 300.0, 120.0, 140.0, 0.9 + i as f32 * 0.01)
        })
        .collect()
}

fn benchmark_geometry(c: &mut Criterion) {
    let faces = filter_faces(&detections(), 0.95);
    let ratio = AspectRatio::new(4, 5).unwrap();

    c.bench_function("compute_crop_4x5", |b| {
        b.iter(|| compute_crop(black_box(4000), black_box(3000), black_box(&faces), ratio))
    });
}

fn benchmark_filter(c: &mut Criterion) {
    let raw = detections();

    c.bench_function("filter_faces", |b| {
        b.iter(|| filter_faces(black_box(&raw), 0.95))
    });
}

fn benchmark_compose(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(1920, 1080);
    let faces = filter_faces(&detections(), 0.95);
    let crop = compute_crop(1920, 1080, &faces, AspectRatio::SQUARE).unwrap();
    let input = CompositeInput {
        upright: &img,
        crop,
        orientation: Orientation::Normal,
        faces: &faces,
        source: &[],
        kind: ImageKind::Jpeg,
    };
    let options = CompositorOptions::default();

    c.bench_function("compose_jpeg_1080_square", |b| {
        b.iter(|| Compositor::compose(black_box(&input), &options))
    });
}

criterion_group!(
    benches,
    benchmark_geometry,
    benchmark_filter,
    benchmark_compose
);
criterion_main!(benches);
