//! The stamp renderer: walks stroke segments at fixed spacing and places
//! modulated brush stamps.
//!
//! All stroke-lifetime state (last point, spacing remainder, travelled
//! distance, stamp counter) lives in a [`StrokeSession`] created on
//! pointer-down and dropped on stroke end, never in ambient mutable cells.

use image::Rgba;

use crate::brush::{BrushPreset, BrushSettings, TIP_SIZE};
use crate::input::Point;
use crate::raster::{blend_pixel, erase_pixel, BlendMode, Raster};

/// Position-keyed hash for per-stamp pseudo-randomness (grain rotation,
/// procedural masks). Deterministic so strokes replay identically.
pub(crate) fn stamp_hash(x: f32, y: f32, counter: u32) -> u32 {
    let ix = (x * 100.0) as u32;
    let iy = (y * 100.0) as u32;
    let mut h = ix
        .wrapping_mul(374761393)
        .wrapping_add(iy.wrapping_mul(668265263))
        .wrapping_add(counter.wrapping_mul(1013904223));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

/// How a single stamp composites onto its surface.
#[derive(Clone, Copy, Debug, PartialEq)]
enum StampOp {
    Paint(BlendMode),
    Erase,
}

/// Where the session's stamps land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeTarget {
    /// Eraser and multiply-blend brushes write straight onto the active
    /// layer; opacity is applied per stamp since no later composite will.
    Direct,
    /// Everything else accumulates in a scratch buffer composited once at
    /// stroke end with the stroke opacity and the brush blend mode.
    Buffered,
}

/// State carried across move events within one stroke.
pub struct StrokeSession {
    brush: BrushPreset,
    settings: BrushSettings,
    tip: Raster,
    eraser: bool,
    last: Point,
    /// Sub-step distance left over from the previous segment.
    remainder: f32,
    /// Total stroke distance walked so far, in step units (drives taper).
    travelled: f32,
    stamp_counter: u32,
    symmetry_axis: Option<f32>,
}

impl StrokeSession {
    /// Begin a stroke at an already constrained/stabilized start point.
    /// `tip` is the prepared tip image for this stroke; when stroke blur is
    /// set it is pre-blurred here so every stamp lands soft.
    pub fn new(
        brush: &BrushPreset,
        settings: &BrushSettings,
        tip: Raster,
        eraser: bool,
        symmetry_axis: Option<f32>,
        start: Point,
    ) -> Self {
        let tip = if settings.stroke_blur > 0.0 && !eraser {
            // Blur radius is given in canvas pixels; convert to tip space.
            let tip_radius =
                (settings.stroke_blur * TIP_SIZE as f32 / settings.size.max(1.0)).round() as u32;
            tip.box_blur(tip_radius.min(TIP_SIZE / 2))
        } else {
            tip
        };
        Self {
            brush: brush.clone(),
            settings: *settings,
            tip,
            eraser,
            last: start,
            remainder: 0.0,
            travelled: 0.0,
            stamp_counter: 0,
            symmetry_axis,
        }
    }

    pub fn target(&self) -> StrokeTarget {
        if self.eraser || self.brush.is_direct_draw() {
            StrokeTarget::Direct
        } else {
            StrokeTarget::Buffered
        }
    }

    pub fn last_point(&self) -> Point {
        self.last
    }

    /// Walk the segment from the last point to `to`, placing stamps at fixed
    /// spacing and carrying the sub-step remainder into the next segment.
    pub fn extend(&mut self, to: Point, surface: &mut Raster) {
        let p1 = self.last;
        let p2 = to;
        let dist = p1.distance_to(&p2);
        if dist <= 0.0 {
            return;
        }

        let step = (self.settings.size * self.brush.spacing).max(1.0);
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;

        let mut covered = self.remainder;
        while covered <= dist {
            let t = covered / dist;
            let x = p1.x + dx * t;
            let y = p1.y + dy * t;
            let pressure = p1.pressure + (p2.pressure - p1.pressure) * t;

            self.travelled += step;
            self.place_stamp(surface, x, y, pressure);
            if let Some(axis) = self.symmetry_axis {
                let mirrored = axis + (axis - x);
                self.place_stamp(surface, mirrored, y, pressure);
            }

            covered += step;
        }

        self.remainder = covered - dist;
        self.last = to;
    }

    /// Compute this stamp's effective size/alpha from taper, pressure and the
    /// draw path, then draw the tip.
    fn place_stamp(&mut self, surface: &mut Raster, x: f32, y: f32, pressure: f32) {
        let mut size = self.settings.size;
        let mut alpha = self.settings.flow / 100.0;
        let mut pressure = pressure;

        // Distance-based fade-in. Never fully vanishes: size floors at 20%.
        if self.settings.taper_start > 0.0 {
            let taper_len = self.settings.taper_start * 5.0;
            let factor = (self.travelled / taper_len).clamp(0.0, 1.0);
            size *= 0.2 + 0.8 * factor;
            alpha *= factor;
        }

        // Steepen the pressure falloff near the stroke end.
        if self.settings.taper_end > 0.0 {
            let exponent = 1.0 + self.settings.taper_end / 25.0;
            pressure = pressure.powf(exponent);
        }

        // Direct paths get no stroke-end composite, so stroke opacity must be
        // baked into every stamp.
        if self.target() == StrokeTarget::Direct {
            alpha *= self.settings.opacity / 100.0;
        }

        // Zero pressure means no contact
        if pressure <= 0.0 {
            self.stamp_counter = self.stamp_counter.wrapping_add(1);
            return;
        }
        size *= 0.5 + 0.5 * pressure;
        alpha *= pressure;

        let rotation = if self.brush.grain_rotation {
            let h = stamp_hash(x, y, self.stamp_counter);
            (h % 10000) as f32 / 10000.0 * std::f32::consts::TAU
        } else {
            0.0
        };
        self.stamp_counter = self.stamp_counter.wrapping_add(1);

        let op = if self.eraser {
            StampOp::Erase
        } else if self.target() == StrokeTarget::Direct {
            StampOp::Paint(self.brush.blend.unwrap_or(BlendMode::Normal))
        } else {
            // Buffered stamps accumulate source-over; the brush blend mode is
            // applied once when the scratch buffer is flushed.
            StampOp::Paint(BlendMode::Normal)
        };

        draw_tip(surface, &self.tip, x, y, size, alpha, rotation, op);
    }
}

/// Draw a tip image centered at `(cx, cy)`, scaled to `size` pixels, rotated
/// by `rotation` radians, with `alpha` as paint opacity.
#[allow(clippy::too_many_arguments)]
fn draw_tip(
    surface: &mut Raster,
    tip: &Raster,
    cx: f32,
    cy: f32,
    size: f32,
    alpha: f32,
    rotation: f32,
    op: StampOp,
) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 || size < 0.5 {
        return;
    }
    let half = size / 2.0;
    // Rotation can push corners outside the axis-aligned box
    let reach = if rotation == 0.0 {
        half
    } else {
        half * std::f32::consts::SQRT_2
    };

    let min_x = (cx - reach).floor().max(0.0) as u32;
    let min_y = (cy - reach).floor().max(0.0) as u32;
    let max_x = ((cx + reach).ceil() as i64).clamp(0, surface.width() as i64) as u32;
    let max_y = ((cy + reach).ceil() as i64).clamp(0, surface.height() as i64) as u32;
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let (sin, cos) = (-rotation).sin_cos();
    let scale = tip.width() as f32 / size;

    for py in min_y..max_y {
        for px in min_x..max_x {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            // Inverse-rotate into tip space
            let rx = dx * cos - dy * sin;
            let ry = dx * sin + dy * cos;
            let u = rx * scale + tip.width() as f32 / 2.0;
            let v = ry * scale + tip.height() as f32 / 2.0;
            let src = sample_bilinear(tip, u, v);
            if src[3] == 0 {
                continue;
            }
            let base = surface.get_pixel(px, py);
            let src_alpha = (src[3] as f32 / 255.0) * alpha;
            let out = match op {
                StampOp::Erase => erase_pixel(base, src_alpha),
                StampOp::Paint(mode) => {
                    let top = Rgba([src[0], src[1], src[2], (src_alpha * 255.0) as u8]);
                    blend_pixel(base, top, mode, 1.0)
                }
            };
            surface.put_pixel(px, py, out);
        }
    }
}

/// Bilinear sample with transparent borders.
fn sample_bilinear(img: &Raster, u: f32, v: f32) -> Rgba<u8> {
    let x = u - 0.5;
    let y = v - 0.5;
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let fetch = |ix: i32, iy: i32| -> [f32; 4] {
        if ix < 0 || iy < 0 || ix as u32 >= img.width() || iy as u32 >= img.height() {
            [0.0; 4]
        } else {
            let p = img.get_pixel(ix as u32, iy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bot = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
