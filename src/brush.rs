//! Brush presets, tip construction and the tip cache.
//!
//! A *tip* is the 64×64 source image every stamp of a brush is drawn from:
//! either an analytic radial-gradient disc (Path mode) or a grain mask tinted
//! to the current color (Stamp mode). Path tips are cached per
//! (brush, color, hardness); Stamp tips are rebuilt per stroke since texture
//! brushes are rarer and their color varies more.

use std::collections::HashMap;

use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::raster::{BlendMode, Raster};
use crate::stroke::stamp_hash;

/// Side length of every generated tip and grain mask.
pub const TIP_SIZE: u32 = 64;

/// Opaque brush identity, used in tip cache keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BrushId(Uuid);

impl BrushId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BrushId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushMode {
    /// Analytic soft disc generated from hardness.
    Path,
    /// Grain mask texture tinted to the stroke color.
    Stamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineCap {
    Round,
    Square,
    Butt,
}

/// A brush definition. Presets are immutable during a stroke; per-session
/// values (size, color, opacity, ...) live in [`BrushSettings`].
#[derive(Clone, Debug)]
pub struct BrushPreset {
    pub id: BrushId,
    pub name: String,
    pub mode: BrushMode,
    pub line_cap: LineCap,
    /// 0 (soft) to 1 (hard).
    pub hardness: f32,
    /// Stamp spacing as a fraction of brush size.
    pub spacing: f32,
    /// Grain mask for Stamp mode.
    pub texture: Option<Raster>,
    /// Compositing operator; `None` means normal source-over.
    pub blend: Option<BlendMode>,
    /// Grain-type brushes get a pseudo-random rotation per stamp.
    pub grain_rotation: bool,
}

impl BrushPreset {
    fn path(name: &str, line_cap: LineCap, hardness: f32, spacing: f32) -> Self {
        Self {
            id: BrushId::new(),
            name: name.to_string(),
            mode: BrushMode::Path,
            line_cap,
            hardness,
            spacing,
            texture: None,
            blend: None,
            grain_rotation: false,
        }
    }

    fn stamp(name: &str, line_cap: LineCap, hardness: f32, spacing: f32, texture: Raster) -> Self {
        Self {
            id: BrushId::new(),
            name: name.to_string(),
            mode: BrushMode::Stamp,
            line_cap,
            hardness,
            spacing,
            texture: Some(texture),
            blend: None,
            grain_rotation: false,
        }
    }

    fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = Some(blend);
        self
    }

    fn with_grain_rotation(mut self) -> Self {
        self.grain_rotation = true;
        self
    }

    /// A user-defined Path-mode preset with library defaults.
    pub fn custom_path(name: &str) -> Self {
        Self::path(name, LineCap::Round, 0.8, 0.1)
    }

    /// A user-defined Stamp-mode preset; the caller supplies the mask.
    pub fn custom_stamp(name: &str) -> Self {
        Self {
            id: BrushId::new(),
            name: name.to_string(),
            mode: BrushMode::Stamp,
            line_cap: LineCap::Round,
            hardness: 0.8,
            spacing: 0.15,
            texture: None,
            blend: None,
            grain_rotation: false,
        }
    }

    /// Direct-draw brushes bypass the stroke scratch buffer and composite
    /// straight onto the active layer, so wet pigments build up pass over
    /// pass instead of flattening at stroke end.
    pub fn is_direct_draw(&self) -> bool {
        matches!(self.blend, Some(BlendMode::Multiply))
    }
}

/// Per-session, user-tunable stroke parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    /// Stamp diameter in canvas pixels.
    pub size: f32,
    /// Whole-stroke opacity, 0–100.
    pub opacity: f32,
    /// Per-stamp ink flow, 0–100.
    pub flow: f32,
    pub color: [u8; 3],
    /// 0 (soft) to 1 (hard); used for Path tips and the eraser.
    pub hardness: f32,
    /// 1–10; higher smooths harder.
    pub stabilizer_level: u8,
    pub stabilizer_enabled: bool,
    /// 0–100; distance-based fade-in at the stroke start.
    pub taper_start: f32,
    /// 0–100; steepens the pressure falloff near the stroke end.
    pub taper_end: f32,
    /// 0–50; blur radius applied to buffered stamps.
    pub stroke_blur: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            opacity: 100.0,
            flow: 50.0,
            color: [0, 0, 0],
            hardness: 0.8,
            stabilizer_level: 3,
            stabilizer_enabled: true,
            taper_start: 0.0,
            taper_end: 0.0,
            stroke_blur: 0.0,
        }
    }
}

// ============================================================================
// GRAIN MASK GENERATION
// ============================================================================

/// Procedural grain families used by the built-in presets.
#[derive(Clone, Copy, Debug)]
enum GrainKind {
    Noise,
    Sponge,
    Woven,
}

/// Build a 64×64 grain mask. Alpha carries the grain; color is left black so
/// tinting only has to replace RGB. Deterministic: randomness comes from a
/// position hash, not a seeded RNG, so presets are identical across runs.
fn grain_mask(density: f32, kind: GrainKind) -> Raster {
    let size = TIP_SIZE;
    let mut img = RgbaImage::new(size, size);
    let center = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32;
            let fy = y as f32;
            let rnd = stamp_hash(fx, fy, (density * 1000.0) as u32) as f32 / u32::MAX as f32;
            let dist = ((fx - center).powi(2) + (fy - center).powi(2)).sqrt();

            let mut alpha: f32 = match kind {
                GrainKind::Noise => {
                    let mut a = if rnd < density { 255.0 } else { 0.0 };
                    // Soften the disc edge
                    if dist > 30.0 {
                        a = 0.0;
                    } else if dist > 20.0 {
                        a *= (30.0 - dist) / 10.0;
                    }
                    a
                }
                GrainKind::Sponge => {
                    let mut a = if rnd > 1.0 - density { 255.0 } else { 0.0 };
                    if x % 4 == 0 || y % 4 == 0 {
                        a *= 0.5; // grid break
                    }
                    if dist > 28.0 {
                        a *= ((32.0 - dist) / 4.0).max(0.0);
                    }
                    if dist > 32.0 {
                        a = 0.0;
                    }
                    a
                }
                GrainKind::Woven => {
                    let n = ((fx * 0.5).sin() + (fy * 0.5).cos()) * 0.5 + 0.5;
                    let mut a = n * 255.0 * density;
                    if dist > 30.0 {
                        a = 0.0;
                    }
                    a
                }
            };
            alpha = alpha.clamp(0.0, 255.0);
            img.put_pixel(x, y, Rgba([0, 0, 0, alpha as u8]));
        }
    }
    Raster::from_image(img)
}

/// Convert an imported image into a 64×64 brush mask: luminance inverted into
/// alpha, color dropped.
pub fn image_to_brush_mask(source: &RgbaImage) -> Raster {
    let scaled = imageops::resize(source, TIP_SIZE, TIP_SIZE, imageops::FilterType::Triangle);
    let mut out = RgbaImage::new(TIP_SIZE, TIP_SIZE);
    for (x, y, px) in scaled.enumerate_pixels() {
        let avg = (px[0] as u16 + px[1] as u16 + px[2] as u16) / 3;
        let alpha = if px[3] > 0 { 255 - avg as u8 } else { 0 };
        out.put_pixel(x, y, Rgba([0, 0, 0, alpha]));
    }
    Raster::from_image(out)
}

/// The built-in brush library, mirroring the classic preset set: basics,
/// inking pens, pencils and charcoals, paints, textured effects and digital.
pub fn builtin_presets() -> Vec<BrushPreset> {
    let noise = grain_mask(0.3, GrainKind::Noise);
    let heavy_noise = grain_mask(0.7, GrainKind::Noise);
    let sponge = grain_mask(0.5, GrainKind::Sponge);
    let woven = grain_mask(0.8, GrainKind::Woven);
    let chalk = grain_mask(0.9, GrainKind::Noise);

    vec![
        // Basics
        BrushPreset::path("Technical Pen", LineCap::Round, 1.0, 0.1),
        BrushPreset::path("Hard Round", LineCap::Round, 0.9, 0.1),
        BrushPreset::path("Soft Airbrush", LineCap::Round, 0.0, 0.1),
        // Inking
        BrushPreset::path("G-Pen", LineCap::Round, 1.0, 0.05),
        BrushPreset::path("Chisel Marker", LineCap::Square, 1.0, 0.05),
        BrushPreset::stamp("Ballpoint", LineCap::Round, 0.9, 0.15, noise.clone()),
        // Pencils & sketching
        BrushPreset::stamp("2B Pencil", LineCap::Round, 0.7, 0.25, noise.clone())
            .with_grain_rotation(),
        BrushPreset::stamp("4B Pencil", LineCap::Round, 0.6, 0.2, heavy_noise.clone())
            .with_grain_rotation(),
        BrushPreset::path("Mechanical 0.5", LineCap::Round, 0.9, 0.1),
        BrushPreset::stamp("Charcoal Stick", LineCap::Square, 0.5, 0.1, heavy_noise.clone())
            .with_grain_rotation(),
        BrushPreset::stamp("Soft Charcoal", LineCap::Round, 0.3, 0.15, sponge.clone())
            .with_grain_rotation(),
        // Paint
        BrushPreset::stamp("Oil Paint", LineCap::Round, 0.8, 0.08, woven.clone()),
        BrushPreset::stamp("Dry Acrylic", LineCap::Round, 0.9, 0.12, heavy_noise.clone()),
        BrushPreset::stamp("Gouache", LineCap::Round, 1.0, 0.05, noise.clone()),
        BrushPreset {
            id: BrushId::new(),
            name: "Watercolor".to_string(),
            mode: BrushMode::Stamp,
            line_cap: LineCap::Round,
            hardness: 0.2,
            spacing: 0.1,
            texture: None,
            blend: Some(BlendMode::Multiply),
            grain_rotation: false,
        },
        BrushPreset::stamp("Wet Watercolor", LineCap::Round, 0.0, 0.05, sponge.clone())
            .with_blend(BlendMode::Multiply),
        // Textures & effects
        BrushPreset::stamp("Pastel Chalk", LineCap::Round, 0.6, 0.15, chalk),
        BrushPreset::stamp("Sponge", LineCap::Round, 0.4, 0.3, sponge),
        BrushPreset::stamp("Noise Spray", LineCap::Round, 0.0, 0.4, heavy_noise),
        BrushPreset::stamp("Canvas Texture", LineCap::Round, 0.5, 0.2, woven),
        // Digital
        BrushPreset::path("Pixel", LineCap::Square, 1.0, 0.1),
        BrushPreset::path("Glow Pen", LineCap::Round, 0.5, 0.1).with_blend(BlendMode::Screen),
    ]
}

// ============================================================================
// TIP CONSTRUCTION
// ============================================================================

/// Analytic soft disc: solid color out to `radius × hardness`, fading to a
/// transparent stop of the same color at the outer radius.
pub fn soft_tip(size: u32, hardness: f32, color: [u8; 3]) -> Raster {
    let mut img = RgbaImage::new(size, size);
    let center = size as f32 / 2.0;
    let radius = size as f32 / 2.0;
    let inner = radius * hardness.clamp(0.0, 1.0);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            let alpha = if dist <= inner {
                1.0
            } else if dist >= radius {
                0.0
            } else {
                1.0 - (dist - inner) / (radius - inner)
            };
            img.put_pixel(
                x,
                y,
                Rgba([color[0], color[1], color[2], (alpha * 255.0) as u8]),
            );
        }
    }
    Raster::from_image(img)
}

/// Square analog of [`soft_tip`] for chisel and pixel brushes: alpha falls
/// off by Chebyshev distance, so the footprint stays a square.
pub fn square_tip(size: u32, hardness: f32, color: [u8; 3]) -> Raster {
    let mut img = RgbaImage::new(size, size);
    let center = size as f32 / 2.0;
    let radius = size as f32 / 2.0;
    let inner = radius * hardness.clamp(0.0, 1.0);
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32 + 0.5 - center).abs();
            let dy = (y as f32 + 0.5 - center).abs();
            let dist = dx.max(dy);
            let alpha = if dist <= inner {
                1.0
            } else if dist >= radius {
                0.0
            } else {
                1.0 - (dist - inner) / (radius - inner)
            };
            img.put_pixel(
                x,
                y,
                Rgba([color[0], color[1], color[2], (alpha * 255.0) as u8]),
            );
        }
    }
    Raster::from_image(img)
}

/// Tint a grain mask to the stroke color: source-in against a solid fill, so
/// the mask's alpha survives and RGB is replaced wholesale.
pub fn tinted_tip(texture: &Raster, color: [u8; 3]) -> Raster {
    let mut img = RgbaImage::new(texture.width(), texture.height());
    for y in 0..texture.height() {
        for x in 0..texture.width() {
            let a = texture.get_pixel(x, y)[3];
            img.put_pixel(x, y, Rgba([color[0], color[1], color[2], a]));
        }
    }
    Raster::from_image(img)
}

/// Structured cache key for Path-mode tips. Hardness is quantized so the key
/// stays hashable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TipKey {
    brush: BrushId,
    color: [u8; 3],
    hardness_milli: u16,
}

/// Cache of recolored Path-mode tips. Stamp-mode tips are built fresh per
/// request and never stored.
#[derive(Default)]
pub struct TipCache {
    tips: HashMap<TipKey, Raster>,
}

impl TipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or build the tip for a brush at the given color/hardness. The
    /// eraser path calls this with an override preset forced to Path mode.
    pub fn tip_for(&mut self, preset: &BrushPreset, color: [u8; 3], hardness: f32) -> Raster {
        if preset.mode == BrushMode::Stamp {
            if let Some(texture) = &preset.texture {
                return tinted_tip(texture, color);
            }
            // Stamp preset without a mask falls back to the analytic disc at
            // full hardness weighting (texture-less watercolor).
            return soft_tip(TIP_SIZE, preset.hardness, color);
        }

        let key = TipKey {
            brush: preset.id,
            color,
            hardness_milli: (hardness.clamp(0.0, 1.0) * 1000.0) as u16,
        };
        let square = preset.line_cap == LineCap::Square;
        self.tips
            .entry(key)
            .or_insert_with(|| {
                if square {
                    square_tip(TIP_SIZE, hardness, color)
                } else {
                    soft_tip(TIP_SIZE, hardness, color)
                }
            })
            .clone()
    }

    /// Drop every cached tip. Called when brush settings change shape-affecting
    /// parameters.
    pub fn invalidate(&mut self) {
        self.tips.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tips.len()
    }
}
