//! EXIF metadata carried from the source into JPEG outputs.
//!
//! The `image` encoder writes no metadata, so the source APP1 "Exif" payload
//! is lifted out of the input, its orientation entry is patched in place, and
//! the block is spliced back into the encoded output. Every other field is
//! left byte-for-byte unchanged.

use crate::error::PipelineError;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const TAG_ORIENTATION: u16 = 0x0112;
const TYPE_SHORT: u16 = 3;
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_SOS: u8 = 0xDA;
const MARKER_EOI: u8 = 0xD9;

/// One marker segment inside a JPEG header.
struct Segment {
    marker: u8,
    /// Offset of the 0xFF byte
    start: usize,
    /// Offset one past the last payload byte
    end: usize,
    /// Offset of the payload (after the length field)
    payload: usize,
}

/// Walk the header segments of a JPEG, stopping at SOS or EOI.
fn segments(jpeg: &[u8]) -> Option<Vec<Segment>> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut out = Vec::new();
    let mut pos = 2;

    while pos + 1 < jpeg.len() {
        if jpeg[pos] != 0xFF {
            return None;
        }
        let start = pos;
        // Fill bytes
        while pos < jpeg.len() && jpeg[pos] == 0xFF {
            pos += 1;
        }
        let marker = *jpeg.get(pos)?;
        pos += 1;

        if marker == MARKER_SOS || marker == MARKER_EOI {
            break;
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            continue;
        }

        let len = read_u16(jpeg, pos, false)? as usize;
        if len < 2 || pos + len > jpeg.len() {
            return None;
        }
        out.push(Segment {
            marker,
            start,
            end: pos + len,
            payload: pos + 2,
        });
        pos += len;
    }
    Some(out)
}

/// TIFF payload of the first APP1 Exif segment, without the `Exif\0\0` prefix.
pub fn extract_exif_block(jpeg: &[u8]) -> Option<Vec<u8>> {
    segments(jpeg)?
        .into_iter()
        .filter(|s| s.marker == MARKER_APP1)
        .map(|s| &jpeg[s.payload..s.end])
        .find(|data| data.starts_with(EXIF_HEADER))
        .map(|data| data[EXIF_HEADER.len()..].to_vec())
}

/// Overwrite the IFD0 orientation entry of a TIFF block.
///
/// Returns `false` when the block is malformed or has no SHORT orientation
/// entry; the block is untouched in that case.
pub fn set_orientation(tiff: &mut [u8], value: u16) -> bool {
    let Some(entry) = find_orientation_entry(tiff) else {
        return false;
    };
    let little = tiff.starts_with(b"II");
    let bytes = if little {
        value.to_le_bytes()
    } else {
        value.to_be_bytes()
    };
    tiff[entry + 8..entry + 10].copy_from_slice(&bytes);
    true
}

/// Offset of the orientation entry in IFD0.
fn find_orientation_entry(tiff: &[u8]) -> Option<usize> {
    let little = match tiff.get(0..2)? {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };
    if read_u16(tiff, 2, little)? != 42 {
        return None;
    }
    let ifd0 = read_u32(tiff, 4, little)? as usize;
    let count = read_u16(tiff, ifd0, little)? as usize;

    let mut off = ifd0 + 2;
    for _ in 0..count {
        if off + 12 > tiff.len() {
            return None;
        }
        let tag = read_u16(tiff, off, little)?;
        if tag == TAG_ORIENTATION {
            let typ = read_u16(tiff, off + 2, little)?;
            let n = read_u32(tiff, off + 4, little)?;
            return (typ == TYPE_SHORT && n == 1).then_some(off);
        }
        off += 12;
    }
    None
}

/// A little-endian TIFF block holding only an orientation entry.
pub fn minimal_orientation_block(value: u16) -> Vec<u8> {
    let mut tiff = Vec::with_capacity(26);
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    // IFD0 with one entry
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&TAG_ORIENTATION.to_le_bytes());
    tiff.extend_from_slice(&TYPE_SHORT.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&value.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    // No next IFD
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff
}

/// Splice a TIFF block into an encoded JPEG as an APP1 Exif segment.
///
/// Any Exif segment already present is dropped. The new segment goes right
/// after SOI, or after the JFIF APP0 segment when there is one.
pub fn insert_exif(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let seg_len = u16::try_from(2 + EXIF_HEADER.len() + tiff.len()).map_err(|_| {
        PipelineError::Encode(format!("EXIF block of {} bytes does not fit", tiff.len()))
    })?;

    let stripped = strip_exif(jpeg)?;
    let insert_at = segments(&stripped)
        .ok_or_else(invalid_jpeg)?
        .iter()
        .take_while(|s| s.marker == MARKER_APP0)
        .last()
        .map(|s| s.end)
        .unwrap_or(2);

    let mut out = Vec::with_capacity(stripped.len() + seg_len as usize + 2);
    out.extend_from_slice(&stripped[..insert_at]);
    push_app1(&mut out, seg_len, tiff);
    out.extend_from_slice(&stripped[insert_at..]);
    Ok(out)
}

/// Copy of the JPEG without its Exif APP1 segments.
fn strip_exif(jpeg: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let segs = segments(jpeg).ok_or_else(invalid_jpeg)?;
    let mut out = Vec::with_capacity(jpeg.len());
    let mut copied = 0;
    for seg in segs
        .iter()
        .filter(|s| s.marker == MARKER_APP1 && jpeg[s.payload..s.end].starts_with(EXIF_HEADER))
    {
        out.extend_from_slice(&jpeg[copied..seg.start]);
        copied = seg.end;
    }
    out.extend_from_slice(&jpeg[copied..]);
    Ok(out)
}

fn invalid_jpeg() -> PipelineError {
    PipelineError::Encode("encoder produced an invalid JPEG".to_string())
}

fn push_app1(out: &mut Vec<u8>, seg_len: u16, tiff: &[u8]) {
    out.extend_from_slice(&[0xFF, MARKER_APP1]);
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);
}

fn read_u16(buf: &[u8], off: usize, little: bool) -> Option<u16> {
    let b: [u8; 2] = buf.get(off..off + 2)?.try_into().ok()?;
    Some(if little {
        u16::from_le_bytes(b)
    } else {
        u16::from_be_bytes(b)
    })
}

fn read_u32(buf: &[u8], off: usize, little: bool) -> Option<u32> {
    let b: [u8; 4] = buf.get(off..off + 4)?.try_into().ok()?;
    Some(if little {
        u32::from_le_bytes(b)
    } else {
        u32::from_be_bytes(b)
    })
}
