//! Debug overlay: detected faces drawn as boxes with their confidence.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::types::FaceBox;

/// Gap between the label baseline and the top of the box, in pixels.
const LABEL_GAP: i64 = 10;

/// How faces are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub line_width: u32,
    pub color: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_width: 2,
            color: [255, 0, 0],
        }
    }
}

impl From<&crate::config::OverlayConfig> for OverlayStyle {
    fn from(config: &crate::config::OverlayConfig) -> Self {
        Self {
            line_width: config.line_width.max(1),
            color: config.color,
        }
    }
}

/// Copy of `img` with every face outlined and labelled.
///
/// The color type of the input is kept, so an RGB photo stays RGB.
pub fn draw_faces(img: &DynamicImage, faces: &[FaceBox], style: OverlayStyle) -> DynamicImage {
    let has_alpha = img.color().has_alpha();
    let mut canvas = img.to_rgba8();
    let color = Rgba([style.color[0], style.color[1], style.color[2], 255]);
    let scale = label_scale(canvas.width(), canvas.height());

    for face in faces {
        draw_box(&mut canvas, face, style.line_width, color);
        let label = format!("{:.2}", face.confidence);
        let top = face.y.round() as i64 - LABEL_GAP - (GLYPH_ROWS as i64 * scale as i64);
        draw_text(&mut canvas, face.x.round() as i64, top, &label, scale, color);
    }

    let drawn = DynamicImage::ImageRgba8(canvas);
    if has_alpha {
        drawn
    } else {
        DynamicImage::ImageRgb8(drawn.to_rgb8())
    }
}

/// Outline drawn inward, one single-pixel rectangle per unit of width.
fn draw_box(canvas: &mut RgbaImage, face: &FaceBox, line_width: u32, color: Rgba<u8>) {
    let x = face.x.round() as i32;
    let y = face.y.round() as i32;
    let w = face.width.round() as i64;
    let h = face.height.round() as i64;

    for i in 0..line_width as i64 {
        let inner_w = w - 2 * i;
        let inner_h = h - 2 * i;
        if inner_w <= 0 || inner_h <= 0 {
            break;
        }
        let rect = Rect::at(x + i as i32, y + i as i32).of_size(inner_w as u32, inner_h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Glyph scale so labels stay readable on large photos.
fn label_scale(width: u32, height: u32) -> u32 {
    (width.min(height) / 400).clamp(1, 8)
}

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;

/// 5x7 bitmaps, one byte per row, high bit on the left.
const DIGITS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
    [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b01110, 0b10000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001, 0b01110],
];
const DOT: [u8; 7] = [0, 0, 0, 0, 0, 0b01100, 0b01100];
const BLANK: [u8; 7] = [0; 7];

fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0'..='9' => DIGITS[ch as usize - '0' as usize],
        '.' => DOT,
        _ => BLANK,
    }
}

fn draw_text(canvas: &mut RgbaImage, x: i64, y: i64, text: &str, scale: u32, color: Rgba<u8>) {
    let advance = ((GLYPH_COLS + 1) * scale) as i64;
    for (i, ch) in text.chars().enumerate() {
        draw_glyph(canvas, x + i as i64 * advance, y, glyph(ch), scale, color);
    }
}

fn draw_glyph(canvas: &mut RgbaImage, x: i64, y: i64, rows: [u8; 7], scale: u32, color: Rgba<u8>) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let scale = scale as i64;

    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_COLS as i64 {
            if bits & (1 << (GLYPH_COLS as i64 - 1 - col)) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + col * scale + dx;
                    let py = y + row as i64 * scale + dy;
                    if (0..width).contains(&px) && (0..height).contains(&py) {
                        canvas.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}
