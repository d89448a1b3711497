//! Pointer input: device-to-canvas coordinate mapping, guide constraints and
//! stroke stabilization.

use serde::{Deserialize, Serialize};

/// One input sample in canvas-pixel space. Pressure is 0.0–1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Viewport pan/zoom/rotation applied to the canvas on screen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// Degrees, clockwise.
    pub rotation: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// What produced a pointer sample. Pressure semantics differ per device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerDevice {
    /// Mouse pressure is 0.5 while the primary button is down, 0 otherwise.
    Mouse { primary_down: bool },
    /// Pen reports native pressure; a zero reading is floored to 0.5 so the
    /// first dab of a stroke is never invisible.
    Pen { pressure: f32 },
    /// Touch has no pressure channel; a fixed 0.5 is used.
    Touch,
}

/// A raw pointer sample in screen coordinates. `position` is `None` when the
/// originating event carried no resolvable location (e.g. an empty touch
/// list on touch-end).
#[derive(Clone, Copy, Debug)]
pub struct PointerInput {
    pub position: Option<(f32, f32)>,
    pub device: PointerDevice,
}

impl PointerInput {
    pub fn mouse(x: f32, y: f32, primary_down: bool) -> Self {
        Self {
            position: Some((x, y)),
            device: PointerDevice::Mouse { primary_down },
        }
    }

    pub fn pen(x: f32, y: f32, pressure: f32) -> Self {
        Self {
            position: Some((x, y)),
            device: PointerDevice::Pen { pressure },
        }
    }

    pub fn touch(x: f32, y: f32) -> Self {
        Self {
            position: Some((x, y)),
            device: PointerDevice::Touch,
        }
    }

    pub fn is_touch(&self) -> bool {
        matches!(self.device, PointerDevice::Touch)
    }
}

/// Where the canvas sits on screen: the screen coordinates of its center and
/// its pixel dimensions. Together with a [`ViewTransform`] this is enough to
/// invert the display mapping.
#[derive(Clone, Copy, Debug)]
pub struct CanvasView {
    pub center_x: f32,
    pub center_y: f32,
    pub width: u32,
    pub height: u32,
}

/// Map a raw pointer sample into canvas-pixel space, undoing the viewport
/// rotation and scale about the canvas screen-center. Returns `None` when the
/// sample has no position.
pub fn resolve_point(
    input: &PointerInput,
    view: &CanvasView,
    transform: &ViewTransform,
) -> Option<Point> {
    let (client_x, client_y) = input.position?;

    let pressure = match input.device {
        PointerDevice::Mouse { primary_down } => {
            if primary_down {
                0.5
            } else {
                0.0
            }
        }
        PointerDevice::Pen { pressure } => {
            // Some devices report 0 on the first contact sample
            if pressure == 0.0 {
                0.5
            } else {
                pressure
            }
        }
        PointerDevice::Touch => 0.5,
    };

    // Vector from the canvas screen-center to the pointer
    let dx = client_x - view.center_x;
    let dy = client_y - view.center_y;

    // Inverse rotation
    let rad = -transform.rotation.to_radians();
    let rot_x = dx * rad.cos() - dy * rad.sin();
    let rot_y = dx * rad.sin() + dy * rad.cos();

    // Inverse scale, then re-center into raster pixels
    let scale = if transform.scale.abs() < f32::EPSILON {
        1.0
    } else {
        transform.scale
    };
    Some(Point {
        x: rot_x / scale + view.width as f32 / 2.0,
        y: rot_y / scale + view.height as f32 / 2.0,
        pressure,
    })
}

/// A geometric input constraint: points snap onto a ruler line or a circle
/// before they reach the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum Guide {
    #[default]
    None,
    Ruler {
        center_x: f32,
        center_y: f32,
        /// Degrees.
        angle: f32,
    },
    Circle {
        center_x: f32,
        center_y: f32,
        radius: f32,
    },
}

impl Guide {
    pub fn is_active(&self) -> bool {
        !matches!(self, Guide::None)
    }

    pub fn center(&self) -> Option<(f32, f32)> {
        match *self {
            Guide::None => None,
            Guide::Ruler {
                center_x, center_y, ..
            }
            | Guide::Circle {
                center_x, center_y, ..
            } => Some((center_x, center_y)),
        }
    }

    pub fn set_center(&mut self, x: f32, y: f32) {
        match self {
            Guide::None => {}
            Guide::Ruler {
                center_x, center_y, ..
            }
            | Guide::Circle {
                center_x, center_y, ..
            } => {
                *center_x = x;
                *center_y = y;
            }
        }
    }

    /// Project `p` onto the guide. Pass-through when inactive; a circle guide
    /// leaves a point exactly at its center untouched.
    pub fn constrain(&self, p: Point) -> Point {
        match *self {
            Guide::None => p,
            Guide::Ruler {
                center_x,
                center_y,
                angle,
            } => {
                let rad = angle.to_radians();
                let dx = rad.cos();
                let dy = rad.sin();
                let vx = p.x - center_x;
                let vy = p.y - center_y;
                let dot = vx * dx + vy * dy;
                Point {
                    x: center_x + dx * dot,
                    y: center_y + dy * dot,
                    ..p
                }
            }
            Guide::Circle {
                center_x,
                center_y,
                radius,
            } => {
                let dx = p.x - center_x;
                let dy = p.y - center_y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist == 0.0 {
                    return p;
                }
                let scale = radius / dist;
                Point {
                    x: center_x + dx * scale,
                    y: center_y + dy * scale,
                    ..p
                }
            }
        }
    }
}

/// Exponential smoothing of raw input. Level 1–10; higher levels smooth
/// harder. Holds the last stabilized point for the lifetime of one stroke.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stabilizer {
    last: Option<Point>,
}

impl Stabilizer {
    /// Reset at stroke start, seeding with the first (constrained) point.
    pub fn reset(&mut self, start: Point) {
        self.last = Some(start);
    }

    /// Blend a raw point toward the last stabilized one. x, y and pressure
    /// are smoothed independently with the same factor.
    pub fn smooth(&mut self, raw: Point, level: u8) -> Point {
        let last = match self.last {
            Some(p) => p,
            None => {
                self.last = Some(raw);
                return raw;
            }
        };
        let level = level.clamp(1, 10);
        let factor = (1.0 - level as f32 * 0.08).max(0.05);
        let out = Point {
            x: last.x + (raw.x - last.x) * factor,
            y: last.y + (raw.y - last.y) * factor,
            pressure: last.pressure * (1.0 - factor) + raw.pressure * factor,
        };
        self.last = Some(out);
        out
    }
}
