//! EXIF orientation: reading the tag and turning stored pixels upright.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// EXIF orientation values 1-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// No transformation needed.
    #[default]
    Normal = 1,
    /// Mirrored left to right.
    FlipHorizontal = 2,
    Rotate180 = 3,
    /// Mirrored top to bottom.
    FlipVertical = 4,
    /// Mirrored across the main diagonal.
    Transpose = 5,
    /// Needs a 90 degree clockwise turn to be upright.
    Rotate90CW = 6,
    /// Mirrored across the anti-diagonal.
    Transverse = 7,
    /// Needs a 270 degree clockwise turn to be upright.
    Rotate270CW = 8,
}

impl Orientation {
    /// Read the orientation tag from JPEG or PNG bytes.
    ///
    /// Missing or malformed metadata and out-of-range values all read as
    /// `Normal`.
    pub fn read(bytes: &[u8]) -> Orientation {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::debug!("No readable EXIF, assuming upright: {e}");
                return Orientation::Normal;
            }
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default()
    }

    /// EXIF tag value.
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Whether this orientation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90CW
                | Orientation::Transverse
                | Orientation::Rotate270CW
        )
    }

    /// Turn stored pixels upright.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => img,
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::FlipVertical => img.flipv(),
            Orientation::Transpose => img.rotate90().fliph(),
            Orientation::Rotate90CW => img.rotate90(),
            Orientation::Transverse => img.rotate270().fliph(),
            Orientation::Rotate270CW => img.rotate270(),
        }
    }

    /// Turn upright pixels back into the stored orientation.
    ///
    /// Exact inverse of [`Orientation::apply`]. Only the two quarter turns
    /// differ; every other transform is its own inverse.
    pub fn invert(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Rotate90CW => img.rotate270(),
            Orientation::Rotate270CW => img.rotate90(),
            other => other.apply(img),
        }
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Upright pixels for `decoded`, plus the orientation that was undone.
pub fn normalize(bytes: &[u8], decoded: DynamicImage) -> (DynamicImage, Orientation) {
    let orientation = Orientation::read(bytes);
    if orientation != Orientation::Normal {
        tracing::debug!(?orientation, "Applying EXIF orientation");
    }
    (orientation.apply(decoded), orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metadata::{insert_exif, minimal_orientation_block};
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};

    const ALL: [Orientation; 8] = [
        Orientation::Normal,
        Orientation::FlipHorizontal,
        Orientation::Rotate180,
        Orientation::FlipVertical,
        Orientation::Transpose,
        Orientation::Rotate90CW,
        Orientation::Transverse,
        Orientation::Rotate270CW,
    ];

    /// 3x2 image with a distinct value in every pixel.
    fn marked() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(3, 2, |x, y| {
            Rgb([(y * 3 + x) as u8 * 10, 0, 0])
        }))
    }

    fn tagged_jpeg(value: u16) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        marked().write_to(&mut out, ImageFormat::Jpeg).unwrap();
        insert_exif(&out.into_inner(), &minimal_orientation_block(value)).unwrap()
    }

    #[test]
    fn test_invert_undoes_apply() {
        for orientation in ALL {
            let round_trip = orientation.invert(orientation.apply(marked()));
            assert_eq!(
                round_trip.to_rgb8().into_raw(),
                marked().to_rgb8().into_raw(),
                "{orientation:?}"
            );
        }
    }

    #[test]
    fn test_swaps_dimensions_matches_apply() {
        for orientation in ALL {
            let (w, h) = orientation.apply(marked()).dimensions();
            assert_eq!((w, h) == (2, 3), orientation.swaps_dimensions(), "{orientation:?}");
        }
    }

    #[test]
    fn test_rotate90_moves_bottom_left_to_top_left() {
        let upright = Orientation::Rotate90CW.apply(marked()).to_rgb8();
        // Stored bottom-left pixel (0,1) has value 30
        assert_eq!(upright.get_pixel(0, 0)[0], 30);
    }

    #[test]
    fn test_transpose_mirrors_diagonal() {
        let upright = Orientation::Transpose.apply(marked()).to_rgb8();
        for (x, y) in [(0u32, 0u32), (1, 0), (2, 1)] {
            assert_eq!(upright.get_pixel(y, x), marked().to_rgb8().get_pixel(x, y));
        }
    }

    #[test]
    fn test_from_u32_out_of_range() {
        assert_eq!(Orientation::from(0), Orientation::Normal);
        assert_eq!(Orientation::from(9), Orientation::Normal);
        assert_eq!(Orientation::from(6), Orientation::Rotate90CW);
    }

    #[test]
    fn test_read_tagged_jpeg() {
        assert_eq!(Orientation::read(&tagged_jpeg(6)), Orientation::Rotate90CW);
        assert_eq!(Orientation::read(&tagged_jpeg(8)), Orientation::Rotate270CW);
    }

    #[test]
    fn test_read_invalid_value_is_normal() {
        assert_eq!(Orientation::read(&tagged_jpeg(42)), Orientation::Normal);
    }

    #[test]
    fn test_read_without_exif_is_normal() {
        assert_eq!(Orientation::read(b"garbage"), Orientation::Normal);
        let mut out = Cursor::new(Vec::new());
        marked().write_to(&mut out, ImageFormat::Png).unwrap();
        assert_eq!(Orientation::read(out.get_ref()), Orientation::Normal);
    }

    #[test]
    fn test_normalize_swaps_dimensions() {
        let bytes = tagged_jpeg(6);
        let decoded = image::load_from_memory(&bytes).unwrap();
        let (upright, orientation) = normalize(&bytes, decoded);
        assert_eq!(orientation, Orientation::Rotate90CW);
        assert_eq!(upright.dimensions(), (2, 3));
    }
}
