//! Stroke rendering, layer compositing and transactional undo/redo for
//! raster painting surfaces.
//!
//! The crate is headless: an embedding application owns the window, panels
//! and dialogs, and feeds pointer samples and key commands into an
//! [`Editor`]. The editor renders stamp-based brush strokes onto a layer
//! stack, maintains a capped undo log with full before/after state, and
//! exposes selection, fill, picker and blur tooling on top of the same
//! compositing primitives.

pub mod brush;
pub mod editor;
pub mod error;
pub mod history;
pub mod input;
pub mod layer;
pub mod raster;
pub mod selection;
pub mod shape;
pub mod stroke;

pub use brush::{BrushId, BrushMode, BrushPreset, BrushSettings, TipCache};
pub use editor::{Editor, KeyCommand, PaperTexture, Tool};
pub use error::EngineError;
pub use history::{HistoryAction, HistoryLog};
pub use input::{CanvasView, Guide, Point, PointerDevice, PointerInput, ViewTransform};
pub use layer::{Layer, LayerId, LayerStore, PendingOp};
pub use raster::{BlendMode, Raster};
pub use selection::Selection;
pub use shape::ShapeKind;
pub use stroke::{StrokeSession, StrokeTarget};
