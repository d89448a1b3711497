//! Rectangular selection as an explicit state machine: marquee, lift, drag,
//! commit.
//!
//! Lifting cuts the marqueed pixels out of the source layer into a floating
//! buffer; committing stamps that buffer back at its final offset. The whole
//! lift→move→commit (or delete) cycle is captured by the editor as one Draw
//! action, so a single undo restores the pre-lift pixels.

use crate::raster::{BlendMode, Raster};

/// Marquees narrower or shorter than this are treated as stray clicks.
const MIN_MARQUEE: f32 = 2.0;

/// Pixels floating above the source layer.
#[derive(Clone, Debug)]
pub struct Lifted {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub content: Raster,
}

impl Lifted {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && y >= self.y as f32
            && x < (self.x + self.width as i32) as f32
            && y < (self.y + self.height as i32) as f32
    }
}

#[derive(Clone, Debug, Default)]
pub enum Selection {
    #[default]
    Idle,
    Marqueeing {
        start: (f32, f32),
        current: (f32, f32),
    },
    Lifted(Lifted),
    Dragging {
        lifted: Lifted,
        /// Pointer offset from the lifted rect's origin at grab time.
        grab: (f32, f32),
    },
}

impl Selection {
    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }

    pub fn lifted(&self) -> Option<&Lifted> {
        match self {
            Selection::Lifted(l) | Selection::Dragging { lifted: l, .. } => Some(l),
            _ => None,
        }
    }

    pub fn begin_marquee(&mut self, x: f32, y: f32) {
        *self = Selection::Marqueeing {
            start: (x, y),
            current: (x, y),
        };
    }

    pub fn update_marquee(&mut self, x: f32, y: f32) {
        if let Selection::Marqueeing { current, .. } = self {
            *current = (x, y);
        }
    }

    /// Close the marquee and lift its pixels out of `source`. Degenerate
    /// marquees collapse back to idle without touching the layer.
    pub fn finish_marquee(&mut self, source: &mut Raster) {
        let (start, current) = match *self {
            Selection::Marqueeing { start, current } => (start, current),
            _ => return,
        };
        let w = (current.0 - start.0).abs();
        let h = (current.1 - start.1).abs();
        if w <= MIN_MARQUEE || h <= MIN_MARQUEE {
            *self = Selection::Idle;
            return;
        }

        let x = start.0.min(current.0).round() as i32;
        let y = start.1.min(current.1).round() as i32;
        let width = w.round() as u32;
        let height = h.round() as u32;

        let content = source.extract_region(x, y, width, height);
        source.clear_region(x, y, width, height);
        *self = Selection::Lifted(Lifted {
            x,
            y,
            width,
            height,
            content,
        });
    }

    /// Grab the floating pixels if the pointer is inside them. Returns
    /// whether a drag started.
    pub fn begin_drag(&mut self, x: f32, y: f32) -> bool {
        let lifted = match std::mem::take(self) {
            Selection::Lifted(l) => l,
            other => {
                *self = other;
                return false;
            }
        };
        if !lifted.contains(x, y) {
            *self = Selection::Lifted(lifted);
            return false;
        }
        let grab = (x - lifted.x as f32, y - lifted.y as f32);
        *self = Selection::Dragging { lifted, grab };
        true
    }

    pub fn update_drag(&mut self, x: f32, y: f32) {
        if let Selection::Dragging { lifted, grab } = self {
            lifted.x = (x - grab.0).round() as i32;
            lifted.y = (y - grab.1).round() as i32;
        }
    }

    pub fn end_drag(&mut self) {
        if let Selection::Dragging { lifted, .. } = std::mem::take(self) {
            *self = Selection::Lifted(lifted);
        }
    }

    /// Stamp the floating pixels back onto `target` at their current offset
    /// and return to idle. No-op unless something is lifted.
    pub fn commit(&mut self, target: &mut Raster) -> bool {
        match std::mem::take(self) {
            Selection::Lifted(l) | Selection::Dragging { lifted: l, .. } => {
                target.composite_over(&l.content, l.x, l.y, 1.0, BlendMode::Normal);
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    /// Discard the floating pixels, leaving the hole where they were lifted.
    pub fn discard(&mut self) -> bool {
        match std::mem::take(self) {
            Selection::Lifted(_) | Selection::Dragging { .. } => true,
            other => {
                *self = other;
                false
            }
        }
    }

    /// Float `content` centered on the canvas, as a paste target.
    pub fn float_centered(&mut self, content: Raster, canvas_w: u32, canvas_h: u32) {
        let width = content.width();
        let height = content.height();
        *self = Selection::Lifted(Lifted {
            x: (canvas_w as i32 - width as i32) / 2,
            y: (canvas_h as i32 - height as i32) / 2,
            width,
            height,
            content,
        });
    }
}
