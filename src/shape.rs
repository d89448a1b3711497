//! Drag-to-place outline shapes: rectangle, circle, triangle and line.
//!
//! A shape renders as a stroked outline at the brush size in the brush
//! color, with round joins and caps. The rasterizer stamps hard discs along
//! each edge into the stroke scratch buffer; the editor flushes that buffer
//! onto the layer once at stroke opacity, so overlap within one shape never
//! darkens.

use image::Rgba;

use crate::raster::Raster;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Line,
}

/// Render a shape outline from the drag start to the drag end.
///
/// The rectangle and triangle span the drag's bounding box (the triangle's
/// apex sits at the top middle); the circle is centered on the drag start
/// with the drag length as its radius.
pub fn draw_shape(
    surface: &mut Raster,
    kind: ShapeKind,
    start: (f32, f32),
    end: (f32, f32),
    color: [u8; 3],
    width: f32,
) {
    let (sx, sy) = start;
    let (ex, ey) = end;
    match kind {
        ShapeKind::Rectangle => stroke_path(
            surface,
            &[(sx, sy), (ex, sy), (ex, ey), (sx, ey), (sx, sy)],
            color,
            width,
        ),
        ShapeKind::Line => stroke_path(surface, &[(sx, sy), (ex, ey)], color, width),
        ShapeKind::Triangle => {
            let apex_x = sx + (ex - sx) / 2.0;
            stroke_path(
                surface,
                &[(apex_x, sy), (sx, ey), (ex, ey), (apex_x, sy)],
                color,
                width,
            );
        }
        ShapeKind::Circle => {
            let radius = ((ex - sx).powi(2) + (ey - sy).powi(2)).sqrt();
            if radius <= 0.0 {
                stamp_disc(surface, sx, sy, (width / 2.0).max(0.5), color);
                return;
            }
            // Segment length stays around two pixels on the circumference
            let steps = ((radius * std::f32::consts::TAU) / 2.0).ceil().clamp(16.0, 720.0) as usize;
            let mut path = Vec::with_capacity(steps + 1);
            for i in 0..=steps {
                let t = i as f32 / steps as f32 * std::f32::consts::TAU;
                path.push((sx + radius * t.cos(), sy + radius * t.sin()));
            }
            stroke_path(surface, &path, color, width);
        }
    }
}

/// Stroke an open polyline by stamping discs along each segment.
fn stroke_path(surface: &mut Raster, path: &[(f32, f32)], color: [u8; 3], width: f32) {
    let radius = (width / 2.0).max(0.5);
    let step = (radius * 0.5).min(1.0);
    for pair in path.windows(2) {
        let (ax, ay) = pair[0];
        let (bx, by) = pair[1];
        let dist = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
        let steps = (dist / step).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            stamp_disc(surface, ax + (bx - ax) * t, ay + (by - ay) * t, radius, color);
        }
    }
}

/// Hard disc with a one-pixel soft rim. Writes keep the max alpha per pixel,
/// so overlapping stamps stay one flat pass of ink.
fn stamp_disc(surface: &mut Raster, cx: f32, cy: f32, radius: f32, color: [u8; 3]) {
    let reach = (radius + 1.0).ceil() as i32;
    let icx = cx.round() as i32;
    let icy = cy.round() as i32;
    for y in (icy - reach)..=(icy + reach) {
        if y < 0 || y >= surface.height() as i32 {
            continue;
        }
        for x in (icx - reach)..=(icx + reach) {
            if x < 0 || x >= surface.width() as i32 {
                continue;
            }
            let dist =
                ((x as f32 + 0.5 - cx).powi(2) + (y as f32 + 0.5 - cy).powi(2)).sqrt();
            let alpha = (radius - dist + 0.5).clamp(0.0, 1.0);
            if alpha <= 0.0 {
                continue;
            }
            let a = (alpha * 255.0).round() as u8;
            let (ux, uy) = (x as u32, y as u32);
            if surface.get_pixel(ux, uy)[3] < a {
                surface.put_pixel(ux, uy, Rgba([color[0], color[1], color[2], a]));
            }
        }
    }
}
