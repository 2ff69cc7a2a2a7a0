use kurbo::Point;

use crate::core::{PremulRgba8, check_rgba_len, mul_div255, premul_from_straight};
use crate::error::OrreryResult;

/// Standard premultiplied alpha-over.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv) as u8);
    }
    out
}

/// A drawable raster layer: row-major premultiplied RGBA8.
///
/// Primitive set intentionally small — filled/stroked circles, lines and
/// rects are all the scene needs. No antialiasing; the glow layers are
/// blurred as aggregates instead.
#[derive(Clone, Debug)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Surface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    /// Opaque surface filled with `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut s = Self::new(width, height);
        for px in s.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        s
    }

    fn blend_px(&mut self, x: i64, y: i64, src: PremulRgba8) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ];
        self.data[idx..idx + 4].copy_from_slice(&over(dst, src));
    }

    /// Filled circle of `radius` around `center`, straight `rgb` at `alpha`.
    pub fn fill_circle(&mut self, center: Point, radius: f64, rgb: [u8; 3], alpha: u8) {
        let src = premul_from_straight(rgb[0], rgb[1], rgb[2], alpha);
        if src[3] == 0 || radius <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        let x0 = (center.x - radius).floor() as i64;
        let x1 = (center.x + radius).ceil() as i64;
        let y0 = (center.y - radius).floor() as i64;
        let y1 = (center.y + radius).ceil() as i64;
        for y in y0..=y1 {
            let dy = y as f64 - center.y;
            for x in x0..=x1 {
                let dx = x as f64 - center.x;
                if dx * dx + dy * dy <= r2 {
                    self.blend_px(x, y, src);
                }
            }
        }
    }

    /// Unfilled 1px-wide circle outline.
    pub fn stroke_circle(&mut self, center: Point, radius: f64, rgb: [u8; 3], alpha: u8) {
        let src = premul_from_straight(rgb[0], rgb[1], rgb[2], alpha);
        if src[3] == 0 || radius <= 0.5 {
            return;
        }
        let inner = (radius - 0.5) * (radius - 0.5);
        let outer = (radius + 0.5) * (radius + 0.5);
        let x0 = (center.x - radius - 1.0).floor() as i64;
        let x1 = (center.x + radius + 1.0).ceil() as i64;
        let y0 = (center.y - radius - 1.0).floor() as i64;
        let y1 = (center.y + radius + 1.0).ceil() as i64;
        for y in y0..=y1 {
            let dy = y as f64 - center.y;
            for x in x0..=x1 {
                let dx = x as f64 - center.x;
                let d2 = dx * dx + dy * dy;
                if d2 >= inner && d2 <= outer {
                    self.blend_px(x, y, src);
                }
            }
        }
    }

    /// Axis-aligned filled rect over `[x0, x1) x [y0, y1)`.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, rgb: [u8; 3], alpha: u8) {
        let src = premul_from_straight(rgb[0], rgb[1], rgb[2], alpha);
        if src[3] == 0 {
            return;
        }
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_px(x, y, src);
            }
        }
    }

    /// 1px line from `from` to `to` (DDA stepping along the major axis, one
    /// blend per step so low-opacity lines do not double up).
    pub fn line(&mut self, from: Point, to: Point, rgb: [u8; 3], alpha: u8) {
        let src = premul_from_straight(rgb[0], rgb[1], rgb[2], alpha);
        if src[3] == 0 {
            return;
        }
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0);
        let (sx, sy) = (dx / steps, dy / steps);
        let mut last = (i64::MIN, i64::MIN);
        for i in 0..=(steps as u64) {
            let x = (from.x + sx * i as f64).round() as i64;
            let y = (from.y + sy * i as f64).round() as i64;
            if (x, y) != last {
                self.blend_px(x, y, src);
                last = (x, y);
            }
        }
    }

    /// Composite `layer` over `self` (premul over, full opacity).
    pub fn composite_over(&mut self, layer: &Surface) -> OrreryResult<()> {
        check_rgba_len(layer.data.len(), self.width, self.height)?;
        for (d, s) in self
            .data
            .chunks_exact_mut(4)
            .zip(layer.data.chunks_exact(4))
        {
            let out = over(
                [d[0], d[1], d[2], d[3]],
                [s[0], s[1], s[2], s[3]],
            );
            d.copy_from_slice(&out);
        }
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> PremulRgba8 {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_transparent_is_noop() {
        let dst = [10, 20, 30, 40];
        assert_eq!(over(dst, [0, 0, 0, 0]), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let src = [255, 0, 0, 255];
        assert_eq!(over([0, 0, 0, 255], src), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let src = [100, 110, 120, 200];
        assert_eq!(over([0, 0, 0, 0], src), src);
    }

    #[test]
    fn fill_circle_paints_center_not_corners() {
        let mut s = Surface::new(9, 9);
        s.fill_circle(Point::new(4.0, 4.0), 2.0, [255, 255, 255], 255);
        assert_eq!(s.pixel(4, 4), [255, 255, 255, 255]);
        assert_eq!(s.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(s.pixel(8, 8), [0, 0, 0, 0]);
    }

    #[test]
    fn fill_circle_clips_at_edges() {
        let mut s = Surface::new(4, 4);
        s.fill_circle(Point::new(0.0, 0.0), 6.0, [1, 2, 3], 255);
        assert_eq!(s.pixel(3, 3), [1, 2, 3, 255]);
    }

    #[test]
    fn stroke_circle_leaves_interior_empty() {
        let mut s = Surface::new(21, 21);
        s.stroke_circle(Point::new(10.0, 10.0), 8.0, [255, 255, 255], 255);
        assert_eq!(s.pixel(10, 10), [0, 0, 0, 0]);
        assert_ne!(s.pixel(18, 10), [0, 0, 0, 0]);
        assert_ne!(s.pixel(10, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn line_hits_both_endpoints() {
        let mut s = Surface::new(10, 10);
        s.line(Point::new(1.0, 1.0), Point::new(8.0, 5.0), [255, 255, 255], 255);
        assert_ne!(s.pixel(1, 1), [0, 0, 0, 0]);
        assert_ne!(s.pixel(8, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn composite_over_blends_layers() {
        let mut base = Surface::filled(2, 1, [0, 0, 0]);
        let mut layer = Surface::new(2, 1);
        layer.fill_rect(0, 0, 1, 1, [255, 0, 0], 255);
        base.composite_over(&layer).unwrap();
        assert_eq!(base.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(base.pixel(1, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn composite_over_rejects_size_mismatch() {
        let mut base = Surface::new(2, 2);
        let layer = Surface::new(3, 3);
        assert!(base.composite_over(&layer).is_err());
    }
}
