use crate::error::{OrreryError, OrreryResult};

/// Output canvas edge length in pixels. The renderer always produces square
/// 1080x1080 frames (even dimensions, as required for yuv420p output).
pub const CANVAS: u32 = 1080;

/// Canvas center in pixel space.
pub const CENTER: (f64, f64) = (540.0, 540.0);

/// Normalized coordinates * SCALE = pixel offset from center.
pub const SCALE: f64 = 450.0;

/// Opaque background the canvas starts from and frames flatten over.
pub const BACKGROUND_RGB: [u8; 3] = [10, 10, 26];

/// One rendered frame: row-major premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Flatten the premultiplied alpha channel over `bg_rgb` into an opaque
    /// row-major RGB8 buffer (the form still images and video frames are
    /// written in).
    pub fn to_opaque_rgb(&self, bg_rgb: [u8; 3]) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.width * self.height * 3) as usize);
        let bg_r = u16::from(bg_rgb[0]);
        let bg_g = u16::from(bg_rgb[1]);
        let bg_b = u16::from(bg_rgb[2]);

        for px in self.data.chunks_exact(4) {
            let a = u16::from(px[3]);
            if a == 255 {
                out.extend_from_slice(&px[..3]);
                continue;
            }
            let inv = 255u16 - a;
            out.push((u16::from(px[0]) + mul_div255(bg_r, inv)).min(255) as u8);
            out.push((u16::from(px[1]) + mul_div255(bg_g, inv)).min(255) as u8);
            out.push((u16::from(px[2]) + mul_div255(bg_b, inv)).min(255) as u8);
        }
        out
    }
}

/// Premultiplied RGBA8 pixel (r,g,b already multiplied by a).
pub type PremulRgba8 = [u8; 4];

/// Convert straight-alpha RGBA8 into premultiplied RGBA8.
pub fn premul_from_straight(r: u8, g: u8, b: u8, a: u8) -> PremulRgba8 {
    [
        mul_div255(u16::from(r), u16::from(a)) as u8,
        mul_div255(u16::from(g), u16::from(a)) as u8,
        mul_div255(u16::from(b), u16::from(a)) as u8,
        a,
    ]
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Validate that a buffer length matches `width * height * 4`.
pub(crate) fn check_rgba_len(len: usize, width: u32, height: u32) -> OrreryResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| OrreryError::validation("rgba buffer size overflow"))?;
    if len != expected {
        return Err(OrreryError::validation(
            "rgba buffer length must equal width*height*4",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premul_scales_channels() {
        assert_eq!(premul_from_straight(255, 0, 0, 128), [128, 0, 0, 128]);
        assert_eq!(premul_from_straight(10, 20, 30, 255), [10, 20, 30, 255]);
        assert_eq!(premul_from_straight(200, 200, 200, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn flatten_transparent_pixel_returns_bg() {
        let frame = FrameRGBA {
            width: 1,
            height: 1,
            data: vec![0, 0, 0, 0],
        };
        assert_eq!(frame.to_opaque_rgb([10, 10, 26]), vec![10, 10, 26]);
    }

    #[test]
    fn flatten_opaque_pixel_is_identity() {
        let frame = FrameRGBA {
            width: 1,
            height: 1,
            data: vec![1, 2, 3, 255],
        };
        assert_eq!(frame.to_opaque_rgb([10, 10, 26]), vec![1, 2, 3]);
    }

    #[test]
    fn flatten_premul_half_alpha_over_black() {
        // Premultiplied red @ 50% alpha over black stays 128,0,0.
        let frame = FrameRGBA {
            width: 1,
            height: 1,
            data: vec![128, 0, 0, 128],
        };
        assert_eq!(frame.to_opaque_rgb([0, 0, 0]), vec![128, 0, 0]);
    }
}
