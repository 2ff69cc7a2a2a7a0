use std::sync::OnceLock;

use ab_glyph::{Font, FontArc, ScaleFont, point};

use crate::core::{mul_div255, premul_from_straight};
use crate::draw_cpu::Surface;

/// Environment override for the regular face.
pub const FONT_PATH_ENV: &str = "ORRERY_FONT_PATH";
/// Environment override for the bold face.
pub const FONT_BOLD_PATH_ENV: &str = "ORRERY_FONT_BOLD_PATH";

const REGULAR_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
];

const BOLD_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// A loaded face: a real outline font, or the built-in pixel font when no
/// font file could be found (asset fallback — logged, never fatal).
pub enum Face {
    Outline(FontArc),
    Builtin,
}

/// Process-wide font cache. Populated lazily on first text draw, read-only
/// afterwards.
pub struct FontCache {
    regular: Face,
    bold: Face,
}

static FONTS: OnceLock<FontCache> = OnceLock::new();

pub fn fonts() -> &'static FontCache {
    FONTS.get_or_init(FontCache::load)
}

impl FontCache {
    fn load() -> Self {
        Self {
            regular: load_face(FONT_PATH_ENV, REGULAR_CANDIDATES, "regular"),
            bold: load_face(FONT_BOLD_PATH_ENV, BOLD_CANDIDATES, "bold"),
        }
    }

    pub fn face(&self, weight: FontWeight) -> &Face {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

fn load_face(env_key: &str, candidates: &[&str], label: &str) -> Face {
    if let Ok(custom) = std::env::var(env_key) {
        match std::fs::read(&custom).map_err(anyhow::Error::from).and_then(|data| {
            FontArc::try_from_vec(data).map_err(anyhow::Error::from)
        }) {
            Ok(font) => return Face::Outline(font),
            Err(e) => {
                tracing::warn!("{label} font override '{custom}' failed to load: {e}");
            }
        }
    }

    for &path in candidates {
        if let Ok(data) = std::fs::read(path)
            && let Ok(font) = FontArc::try_from_vec(data)
        {
            return Face::Outline(font);
        }
    }

    tracing::warn!("no {label} font found on this system, using built-in pixel font");
    Face::Builtin
}

/// Pixel width of `text` at `px`, for centering and right alignment.
pub fn measure(text: &str, weight: FontWeight, px: f32) -> f64 {
    match fonts().face(weight) {
        Face::Outline(font) => {
            let scaled = font.as_scaled(px);
            let mut width = 0.0f32;
            let mut prev = None;
            for ch in text.chars() {
                let id = scaled.glyph_id(ch);
                if let Some(p) = prev {
                    width += scaled.kern(p, id);
                }
                width += scaled.h_advance(id);
                prev = Some(id);
            }
            f64::from(width)
        }
        Face::Builtin => {
            let scale = builtin_scale(px);
            (text.chars().count() as f64) * f64::from(6 * scale)
        }
    }
}

/// Draw `text` with its top-left corner at `(x, y)`, straight `rgb` at
/// `alpha`.
#[allow(clippy::too_many_arguments)]
pub fn draw_text(surface: &mut Surface, text: &str, x: f64, y: f64, weight: FontWeight, px: f32, rgb: [u8; 3], alpha: u8) {
    match fonts().face(weight) {
        Face::Outline(font) => draw_outline(surface, font, text, x, y, px, rgb, alpha),
        Face::Builtin => draw_builtin(surface, text, x, y, px, rgb, alpha),
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_outline(
    surface: &mut Surface,
    font: &FontArc,
    text: &str,
    x: f64,
    y: f64,
    px: f32,
    rgb: [u8; 3],
    alpha: u8,
) {
    let scaled = font.as_scaled(px);
    let mut caret_x = x as f32;
    let baseline_y = y as f32 + scaled.ascent();
    let mut prev = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            caret_x += scaled.kern(p, id);
        }

        let glyph = id.with_scale_and_position(px, point(caret_x, baseline_y));
        if let Some(outline) = font.outline_glyph(glyph) {
            let bounds = outline.px_bounds();
            outline.draw(|gx, gy, coverage| {
                let a = (f32::from(alpha) * coverage.clamp(0.0, 1.0)).round() as u16;
                if a == 0 {
                    return;
                }
                let px_x = (bounds.min.x + gx as f32).round() as i64;
                let px_y = (bounds.min.y + gy as f32).round() as i64;
                blend_text_px(surface, px_x, px_y, rgb, a.min(255) as u8);
            });
        }

        caret_x += scaled.h_advance(id);
        prev = Some(id);
    }
}

fn draw_builtin(surface: &mut Surface, text: &str, x: f64, y: f64, px: f32, rgb: [u8; 3], alpha: u8) {
    let scale = builtin_scale(px);
    let mut caret_x = x.round() as i64;
    let top = y.round() as i64;
    for ch in text.chars() {
        if let Some(rows) = builtin_glyph(ch) {
            for (ry, row) in rows.iter().enumerate() {
                for cx in 0..5u8 {
                    if row & (0b10000 >> cx) != 0 {
                        for sy in 0..scale {
                            for sx in 0..scale {
                                blend_text_px(
                                    surface,
                                    caret_x + i64::from(cx) * i64::from(scale) + i64::from(sx),
                                    top + (ry as i64) * i64::from(scale) + i64::from(sy),
                                    rgb,
                                    alpha,
                                );
                            }
                        }
                    }
                }
            }
        }
        caret_x += i64::from(6 * scale);
    }
}

fn blend_text_px(surface: &mut Surface, x: i64, y: i64, rgb: [u8; 3], alpha: u8) {
    if x < 0 || y < 0 || x >= i64::from(surface.width) || y >= i64::from(surface.height) {
        return;
    }
    let src = premul_from_straight(rgb[0], rgb[1], rgb[2], alpha);
    let idx = ((y as usize) * (surface.width as usize) + (x as usize)) * 4;
    let inv = 255u16 - u16::from(src[3]);
    for c in 0..4 {
        let d = mul_div255(u16::from(surface.data[idx + c]), inv) as u8;
        surface.data[idx + c] = src[c].saturating_add(d);
    }
}

fn builtin_scale(px: f32) -> u8 {
    ((px / 8.0).round() as i32).clamp(1, 8) as u8
}

/// 5x7 bitmap glyphs for the built-in fallback. Lowercase maps onto
/// uppercase; anything unmapped renders as a blank advance.
fn builtin_glyph(ch: char) -> Option<[u8; 7]> {
    let ch = if ch.is_ascii_lowercase() {
        ch.to_ascii_uppercase()
    } else {
        ch
    };
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '\u{00B7}' => [0b00000, 0b00000, 0b00000, 0b00110, 0b00110, 0b00000, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b01110, 0b00000, 0b00000, 0b00000],
        '\'' => [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        _ => return None,
    };
    Some(rows)
}
