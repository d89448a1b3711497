//! Full-resolution RGBA raster buffers and pixel compositing.
//!
//! Every layer, scratch surface, brush tip and lifted selection in the engine
//! is a [`Raster`]. Buffers are flat and canvas-sized; compositing is
//! straight-alpha, single-threaded CPU work.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Compositing operator for brush strokes and layer merges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
}

impl BlendMode {
    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
        }
    }
}

/// An exclusively-owned RGBA pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pixels: RgbaImage,
}

impl Raster {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width.max(1), height.max(1), color),
        }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Bounds-checked read. Out-of-range coordinates read as transparent.
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        if x < self.width() && y < self.height() {
            *self.pixels.get_pixel(x, y)
        } else {
            Rgba([0, 0, 0, 0])
        }
    }

    /// Bounds-checked write. Out-of-range coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        if x < self.width() && y < self.height() {
            self.pixels.put_pixel(x, y, pixel);
        }
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.fill(Rgba([0, 0, 0, 0]));
    }

    /// Clear a rectangular region. Coordinates are clamped to the buffer.
    pub fn clear_region(&mut self, x: i32, y: i32, w: u32, h: u32) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x.saturating_add(w as i32)).max(0) as u32;
        let y1 = (y.saturating_add(h as i32)).max(0) as u32;
        for py in y0..y1.min(self.height()) {
            for px in x0..x1.min(self.width()) {
                self.pixels.put_pixel(px, py, Rgba([0, 0, 0, 0]));
            }
        }
    }

    /// Copy out a rectangular region. Pixels outside the buffer read as
    /// transparent so callers can lift regions that touch the edge.
    pub fn extract_region(&self, x: i32, y: i32, w: u32, h: u32) -> Raster {
        let mut out = Raster::new(w, h);
        for dy in 0..h {
            for dx in 0..w {
                let sx = x + dx as i32;
                let sy = y + dy as i32;
                if sx >= 0 && sy >= 0 {
                    out.put_pixel(dx, dy, self.get_pixel(sx as u32, sy as u32));
                }
            }
        }
        out
    }

    /// Composite `top` onto this buffer at `(dx, dy)` with a global alpha and
    /// blend mode. This is the single compositing primitive shared by
    /// stroke-end scratch flush, selection commit, merge-down and flatten.
    pub fn composite_over(&mut self, top: &Raster, dx: i32, dy: i32, alpha: f32, mode: BlendMode) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        for sy in 0..top.height() {
            let ty = dy + sy as i32;
            if ty < 0 || ty as u32 >= self.height() {
                continue;
            }
            for sx in 0..top.width() {
                let tx = dx + sx as i32;
                if tx < 0 || tx as u32 >= self.width() {
                    continue;
                }
                let src = top.get_pixel(sx, sy);
                if src[3] == 0 {
                    continue;
                }
                let base = *self.pixels.get_pixel(tx as u32, ty as u32);
                self.pixels
                    .put_pixel(tx as u32, ty as u32, blend_pixel(base, src, mode, alpha));
            }
        }
    }

    /// Mirror the buffer in place around its vertical center line.
    pub fn flip_horizontal(&mut self) {
        let (w, h) = (self.width(), self.height());
        for y in 0..h {
            for x in 0..w / 2 {
                let a = *self.pixels.get_pixel(x, y);
                let b = *self.pixels.get_pixel(w - 1 - x, y);
                self.pixels.put_pixel(x, y, b);
                self.pixels.put_pixel(w - 1 - x, y, a);
            }
        }
    }

    /// Mirror the buffer in place around its horizontal center line.
    pub fn flip_vertical(&mut self) {
        let (w, h) = (self.width(), self.height());
        for y in 0..h / 2 {
            for x in 0..w {
                let a = *self.pixels.get_pixel(x, y);
                let b = *self.pixels.get_pixel(x, h - 1 - y);
                self.pixels.put_pixel(x, y, b);
                self.pixels.put_pixel(x, h - 1 - y, a);
            }
        }
    }

    /// Separable box blur, returning a new buffer. Radius 0 is a plain copy.
    pub fn box_blur(&self, radius: u32) -> Raster {
        if radius == 0 {
            return self.clone();
        }
        let (w, h) = (self.width() as i32, self.height() as i32);
        let r = radius as i32;
        let mut horizontal = RgbaImage::new(w as u32, h as u32);
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                let mut weight = 0.0f32;
                for ox in -r..=r {
                    let sx = x + ox;
                    if sx < 0 || sx >= w {
                        continue;
                    }
                    let p = self.pixels.get_pixel(sx as u32, y as u32);
                    let a = p[3] as f32 / 255.0;
                    acc[0] += p[0] as f32 * a;
                    acc[1] += p[1] as f32 * a;
                    acc[2] += p[2] as f32 * a;
                    acc[3] += a;
                    weight += 1.0;
                }
                horizontal.put_pixel(x as u32, y as u32, resolve_accum(acc, weight));
            }
        }
        let mut out = RgbaImage::new(w as u32, h as u32);
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                let mut weight = 0.0f32;
                for oy in -r..=r {
                    let sy = y + oy;
                    if sy < 0 || sy >= h {
                        continue;
                    }
                    let p = horizontal.get_pixel(x as u32, sy as u32);
                    let a = p[3] as f32 / 255.0;
                    acc[0] += p[0] as f32 * a;
                    acc[1] += p[1] as f32 * a;
                    acc[2] += p[2] as f32 * a;
                    acc[3] += a;
                    weight += 1.0;
                }
                out.put_pixel(x as u32, y as u32, resolve_accum(acc, weight));
            }
        }
        Raster { pixels: out }
    }
}

fn resolve_accum(acc: [f32; 4], weight: f32) -> Rgba<u8> {
    if weight <= 0.0 || acc[3] <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let a = acc[3] / weight;
    Rgba([
        (acc[0] / acc[3]).clamp(0.0, 255.0) as u8,
        (acc[1] / acc[3]).clamp(0.0, 255.0) as u8,
        (acc[2] / acc[3]).clamp(0.0, 255.0) as u8,
        (a * 255.0).clamp(0.0, 255.0) as u8,
    ])
}

/// Straight-alpha source-over blend of one pixel, with the top pixel's alpha
/// scaled by `opacity` and its color run through `mode` first.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 {
        return base;
    }
    // Fast path: Normal blend, full opacity, fully opaque top pixel
    if matches!(mode, BlendMode::Normal) && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);

    let base_r = base[0] as f32 / 255.0;
    let base_g = base[1] as f32 / 255.0;
    let base_b = base[2] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;

    let top_r = top[0] as f32 / 255.0;
    let top_g = top[1] as f32 / 255.0;
    let top_b = top[2] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let (r, g, b) = match mode {
        BlendMode::Normal => (top_r, top_g, top_b),
        BlendMode::Multiply => (base_r * top_r, base_g * top_g, base_b * top_b),
        BlendMode::Screen => (
            1.0 - (1.0 - base_r) * (1.0 - top_r),
            1.0 - (1.0 - base_g) * (1.0 - top_g),
            1.0 - (1.0 - base_b) * (1.0 - top_b),
        ),
    };

    // Blend modes act on color only where the base has coverage; over bare
    // transparency the top color passes through unchanged.
    let (r, g, b) = if base_a > 0.0 {
        (r, g, b)
    } else {
        (top_r, top_g, top_b)
    };

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let out_r = (r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
    let out_g = (g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
    let out_b = (b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

    Rgba([
        (out_r * 255.0).clamp(0.0, 255.0) as u8,
        (out_g * 255.0).clamp(0.0, 255.0) as u8,
        (out_b * 255.0).clamp(0.0, 255.0) as u8,
        (out_a * 255.0).clamp(0.0, 255.0) as u8,
    ])
}

/// Destination-out: knock the base pixel's coverage down by `alpha`.
pub fn erase_pixel(base: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let alpha = alpha.clamp(0.0, 1.0);
    let a = (base[3] as f32 * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8;
    Rgba([base[0], base[1], base[2], a])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn composite_normal_over_transparent_keeps_color() {
        let mut base = Raster::new(4, 4);
        let mut top = Raster::new(4, 4);
        top.put_pixel(1, 1, Rgba([200, 40, 10, 255]));
        base.composite_over(&top, 0, 0, 1.0, BlendMode::Normal);
        assert_eq!(base.get_pixel(1, 1), Rgba([200, 40, 10, 255]));
        assert_eq!(base.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn composite_respects_global_alpha() {
        let mut base = Raster::new_filled(1, 1, Rgba([0, 0, 0, 255]));
        let top = Raster::new_filled(1, 1, Rgba([255, 255, 255, 255]));
        base.composite_over(&top, 0, 0, 0.5, BlendMode::Normal);
        let px = base.get_pixel(0, 0);
        assert!((px[0] as i32 - 128).abs() <= 1, "got {:?}", px);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn multiply_darkens() {
        let base = Rgba([200, 200, 200, 255]);
        let top = Rgba([128, 128, 128, 255]);
        let out = blend_pixel(base, top, BlendMode::Multiply, 1.0);
        assert!(out[0] < 128, "multiply should darken, got {:?}", out);
    }

    #[test]
    fn screen_lightens() {
        let base = Rgba([100, 100, 100, 255]);
        let top = Rgba([100, 100, 100, 255]);
        let out = blend_pixel(base, top, BlendMode::Screen, 1.0);
        assert!(out[0] > 100, "screen should lighten, got {:?}", out);
    }

    #[test]
    fn erase_reduces_coverage_only() {
        let out = erase_pixel(Rgba([10, 20, 30, 200]), 0.5);
        assert_eq!(out[0], 10);
        assert_eq!(out[3], 100);
        let full = erase_pixel(Rgba([10, 20, 30, 200]), 1.0);
        assert_eq!(full[3], 0);
    }

    #[test]
    fn flip_horizontal_mirrors() {
        let mut r = Raster::new(3, 1);
        r.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        r.flip_horizontal();
        assert_eq!(r.get_pixel(2, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(r.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn extract_and_clear_region_round_trip() {
        let mut r = Raster::new_filled(10, 10, Rgba([5, 5, 5, 255]));
        let lifted = r.extract_region(2, 2, 4, 4);
        assert_eq!(lifted.get_pixel(0, 0), Rgba([5, 5, 5, 255]));
        r.clear_region(2, 2, 4, 4);
        assert_eq!(r.get_pixel(3, 3), Rgba([0, 0, 0, 0]));
        assert_eq!(r.get_pixel(1, 1), Rgba([5, 5, 5, 255]));
    }

    #[test]
    fn extract_region_outside_reads_transparent() {
        let r = Raster::new_filled(4, 4, Rgba([9, 9, 9, 255]));
        let lifted = r.extract_region(-2, -2, 4, 4);
        assert_eq!(lifted.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(lifted.get_pixel(2, 2), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn box_blur_preserves_flat_regions() {
        let r = Raster::new_filled(9, 9, Rgba([80, 90, 100, 255]));
        let blurred = r.box_blur(2);
        let px = blurred.get_pixel(4, 4);
        assert_eq!(px, Rgba([80, 90, 100, 255]));
    }
}
