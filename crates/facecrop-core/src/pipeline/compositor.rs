//! Compositor: overlay, crop, orientation on output, and encoding.
//!
//! Works on in-memory buffers only. The caller decides where bytes go.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat};
use std::io::Cursor;

use super::metadata;
use super::orientation::Orientation;
use super::overlay::{self, OverlayStyle};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CropRect, FaceBox, ImageKind, OrientationMode};

/// Default JPEG quality for outputs.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Output options for [`Compositor::compose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorOptions {
    /// Draw faces into the output when set
    pub overlay: Option<OverlayStyle>,
    pub orientation_mode: OrientationMode,
    pub jpeg_quality: u8,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            overlay: None,
            orientation_mode: OrientationMode::Bake,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Everything the compositor needs about one image.
pub struct CompositeInput<'a> {
    /// Upright pixels
    pub upright: &'a DynamicImage,
    pub crop: CropRect,
    /// Orientation the source was stored in
    pub orientation: Orientation,
    /// Faces drawn when the overlay is enabled
    pub faces: &'a [FaceBox],
    /// Encoded source, for its EXIF block
    pub source: &'a [u8],
    pub kind: ImageKind,
}

pub struct Compositor;

impl Compositor {
    /// Produce the encoded output for one image.
    pub fn compose(input: &CompositeInput<'_>, options: &CompositorOptions) -> PipelineResult<Vec<u8>> {
        let (width, height) = (input.upright.width(), input.upright.height());
        if !input.crop.fits_within(width, height) || input.crop.width == 0 || input.crop.height == 0 {
            return Err(PipelineError::InvalidInput(format!(
                "crop {:?} does not fit a {width}x{height} image",
                input.crop
            )));
        }

        let cropped = match options.overlay {
            Some(style) => {
                let drawn = overlay::draw_faces(input.upright, input.faces, style);
                crop(&drawn, input.crop)
            }
            None => crop(input.upright, input.crop),
        };

        // PNG outputs carry no metadata, so there is nothing to restore into.
        let restore = options.orientation_mode == OrientationMode::Restore
            && input.kind == ImageKind::Jpeg;
        let (pixels, tag) = if restore {
            (input.orientation.invert(cropped), input.orientation)
        } else {
            (cropped, Orientation::Normal)
        };

        match input.kind {
            ImageKind::Jpeg => {
                let encoded = encode_jpeg(&pixels, options.jpeg_quality)?;
                attach_exif(encoded, input.source, input.orientation, tag)
            }
            ImageKind::Png => encode_png(&pixels),
        }
    }
}

fn crop(img: &DynamicImage, rect: CropRect) -> DynamicImage {
    img.crop_imm(rect.x, rect.y, rect.width, rect.height)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> PipelineResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> PipelineResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Carry the source EXIF block into the output with `tag` as its orientation.
///
/// Only the IFD0 orientation value is rewritten. Every other byte of the
/// block is copied as-is, including an IFD1 thumbnail and the Exif
/// PixelXDimension/PixelYDimension entries, so those still describe the
/// source image rather than the crop.
fn attach_exif(
    encoded: Vec<u8>,
    source: &[u8],
    source_orientation: Orientation,
    tag: Orientation,
) -> PipelineResult<Vec<u8>> {
    let Some(mut block) = metadata::extract_exif_block(source) else {
        if tag == Orientation::Normal {
            return Ok(encoded);
        }
        return metadata::insert_exif(&encoded, &metadata::minimal_orientation_block(tag.value()));
    };

    if metadata::set_orientation(&mut block, tag.value()) {
        return metadata::insert_exif(&encoded, &block);
    }

    // No patchable entry. Without one the block already reads as upright.
    if source_orientation == Orientation::Normal && tag == Orientation::Normal {
        return metadata::insert_exif(&encoded, &block);
    }
    tracing::debug!("Orientation entry not patchable, writing a fresh EXIF block");
    metadata::insert_exif(&encoded, &metadata::minimal_orientation_block(tag.value()))
}
