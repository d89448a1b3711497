//! The event-driven editor facade: tool dispatch, the pointer lifecycle,
//! keyboard commands, fills, the color picker, import placement and the
//! undoable layer operations.
//!
//! An [`Editor`] owns the whole document: layer stack, history log, brush
//! library, selection and viewport transform. Embedding applications feed it
//! pointer samples and key commands; everything else is queries.

use image::{imageops, Rgba, RgbaImage};
use log::{debug, warn};

use crate::brush::{BrushId, BrushPreset, BrushSettings, TipCache};
use crate::error::EngineError;
use crate::history::{HistoryAction, HistoryLog};
use crate::input::{resolve_point, CanvasView, Guide, Point, PointerInput, Stabilizer, ViewTransform};
use crate::layer::{LayerId, LayerStore, PendingOp};
use crate::raster::{BlendMode, Raster};
use crate::selection::Selection;
use crate::shape::{draw_shape, ShapeKind};
use crate::stroke::{StrokeSession, StrokeTarget};

/// Pointer distance within which a press grabs the guide handle instead of
/// starting a stroke.
const GUIDE_HANDLE_RADIUS: f32 = 30.0;

/// Blur samples closer than this to the previous one are skipped.
const BLUR_MIN_STEP: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Fill,
    Picker,
    Select,
    Blur,
    /// Drag-to-place outline shapes, committed as one stroke.
    Shape(ShapeKind),
}

/// Keyboard-driven commands routed through the editor so modal gating and
/// history apply uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    Undo,
    Redo,
    Copy,
    Cut,
    Paste,
    Delete,
    /// Commit the floating selection (Enter).
    Commit,
}

/// Background fills generated into a fresh document's background layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaperTexture {
    #[default]
    Plain,
    Canvas,
    OldPaper,
    Rough,
}

/// Generate a paper fill. Grain comes from the deterministic position hash,
/// so two documents with the same size and texture are pixel-identical.
pub fn paper_fill(width: u32, height: u32, kind: PaperTexture) -> Raster {
    use crate::stroke::stamp_hash;

    let mut out = RgbaImage::new(width.max(1), height.max(1));
    for (x, y, px) in out.enumerate_pixels_mut() {
        let fx = x as f32;
        let fy = y as f32;
        *px = match kind {
            PaperTexture::Plain => Rgba([255, 255, 255, 255]),
            PaperTexture::Canvas => {
                let weave = ((fx * 0.8).sin() + (fy * 0.8).cos()) * 0.5 + 0.5;
                let v = 248 - (weave * 10.0) as u8;
                Rgba([v, v, v.saturating_sub(2), 255])
            }
            PaperTexture::OldPaper => {
                let n = stamp_hash(fx, fy, 7) % 12;
                Rgba([
                    242u8.saturating_sub(n as u8),
                    232u8.saturating_sub(n as u8),
                    212u8.saturating_sub(n as u8),
                    255,
                ])
            }
            PaperTexture::Rough => {
                let n = (stamp_hash(fx, fy, 11) % 20) as u8;
                let v = 250u8.saturating_sub(n);
                Rgba([v, v, v, 255])
            }
        };
    }
    Raster::from_image(out)
}

enum StrokeKind {
    Paint(StrokeSession),
    /// The blur tool stamps blurred copies of the layer; no session, just the
    /// last accepted sample.
    Blur { last: Point },
    /// A shape preview redrawn into the scratch buffer on every move; the
    /// symmetry axis is captured at press time like a paint stroke's.
    Shape {
        kind: ShapeKind,
        start: (f32, f32),
        end: (f32, f32),
        axis: Option<f32>,
    },
}

struct ActiveStroke {
    kind: StrokeKind,
    layer: LayerId,
    before: Raster,
    /// `Some((opacity, blend))` when the scratch buffer must be flushed onto
    /// the layer at stroke end.
    flush: Option<(f32, BlendMode)>,
}

pub struct Editor {
    store: LayerStore,
    history: HistoryLog,

    presets: Vec<BrushPreset>,
    active_brush: BrushId,
    pub settings: BrushSettings,
    tool: Tool,
    tips: TipCache,

    pub transform: ViewTransform,
    guide: Guide,
    dragging_guide: bool,
    gesture_active: bool,

    symmetry: bool,
    symmetry_axis: f32,
    pen_only: bool,
    modal_open: bool,

    selection: Selection,
    /// Snapshot of the layer before the current lift, closing over the whole
    /// lift→commit cycle as one Draw action.
    selection_before: Option<(LayerId, Raster)>,
    clipboard: Option<Raster>,

    stabilizer: Stabilizer,
    stroke: Option<ActiveStroke>,
    scratch: Raster,

    notices: Vec<String>,
}

impl Editor {
    pub fn new(width: u32, height: u32) -> Self {
        let presets = crate::brush::builtin_presets();
        let active_brush = presets[0].id;
        Self {
            store: LayerStore::new(width, height),
            history: HistoryLog::new(),
            presets,
            active_brush,
            settings: BrushSettings::default(),
            tool: Tool::Brush,
            tips: TipCache::new(),
            transform: ViewTransform::default(),
            guide: Guide::None,
            dragging_guide: false,
            gesture_active: false,
            symmetry: false,
            symmetry_axis: width as f32 / 2.0,
            pen_only: false,
            modal_open: false,
            selection: Selection::default(),
            selection_before: None,
            clipboard: None,
            stabilizer: Stabilizer::default(),
            stroke: None,
            scratch: Raster::new(width, height),
            notices: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Queries and plain state
    // ------------------------------------------------------------------

    pub fn layers(&self) -> &LayerStore {
        &self.store
    }

    pub fn layers_mut(&mut self) -> &mut LayerStore {
        &mut self.store
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching away from the select tool commits any floating pixels.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool != Tool::Select && self.selection.lifted().is_some() {
            self.commit_selection();
        }
        self.tool = tool;
    }

    pub fn guide(&self) -> Guide {
        self.guide
    }

    pub fn set_guide(&mut self, guide: Guide) {
        self.guide = guide;
    }

    pub fn set_symmetry(&mut self, enabled: bool) {
        self.symmetry = enabled;
    }

    pub fn set_symmetry_axis(&mut self, x: f32) {
        self.symmetry_axis = x.clamp(0.0, self.store.width() as f32);
    }

    pub fn set_pen_only(&mut self, enabled: bool) {
        self.pen_only = enabled;
    }

    pub fn set_modal_open(&mut self, open: bool) {
        self.modal_open = open;
    }

    pub fn presets(&self) -> &[BrushPreset] {
        &self.presets
    }

    pub fn active_preset(&self) -> &BrushPreset {
        self.presets
            .iter()
            .find(|p| p.id == self.active_brush)
            .unwrap_or(&self.presets[0])
    }

    pub fn select_brush(&mut self, id: BrushId) {
        if self.presets.iter().any(|p| p.id == id) {
            self.active_brush = id;
        } else {
            warn!("select_brush: unknown brush");
        }
    }

    /// Register a user preset and make it active.
    pub fn add_custom_brush(&mut self, preset: BrushPreset) -> BrushId {
        let id = preset.id;
        self.presets.push(preset);
        self.active_brush = id;
        id
    }

    /// Build a Stamp-mode preset from an imported image and register it.
    pub fn add_brush_from_image(&mut self, name: &str, source: &RgbaImage) -> BrushId {
        let mask = crate::brush::image_to_brush_mask(source);
        let preset = BrushPreset {
            texture: Some(mask),
            ..BrushPreset::custom_stamp(name)
        };
        self.add_custom_brush(preset)
    }

    /// Remove a preset from the library. The last remaining preset is kept,
    /// so there is always an active brush to paint with.
    pub fn remove_custom_brush(&mut self, id: BrushId) {
        if self.presets.len() <= 1 {
            warn!("remove_custom_brush: refusing to empty the brush library");
            return;
        }
        self.presets.retain(|p| p.id != id);
        if !self.presets.iter().any(|p| p.id == self.active_brush) {
            self.active_brush = self.presets[0].id;
        }
    }

    /// Drain pending user-facing messages from rejected operations.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn notice(&mut self, err: &EngineError) {
        warn!("{err}");
        self.notices.push(err.to_string());
    }

    // ------------------------------------------------------------------
    // Pointer lifecycle
    // ------------------------------------------------------------------

    fn resolve(&self, input: &PointerInput, view: &CanvasView) -> Option<Point> {
        resolve_point(input, view, &self.transform)
    }

    fn input_blocked(&self, input: &PointerInput) -> bool {
        self.modal_open || self.gesture_active || (self.pen_only && input.is_touch())
    }

    pub fn pointer_down(&mut self, input: &PointerInput, view: &CanvasView) {
        if self.input_blocked(input) {
            return;
        }
        let Some(p) = self.resolve(input, view) else {
            return;
        };

        // Guide handle wins over every tool
        if let Some((gx, gy)) = self.guide.center() {
            let d = ((p.x - gx).powi(2) + (p.y - gy).powi(2)).sqrt();
            if d <= GUIDE_HANDLE_RADIUS {
                self.dragging_guide = true;
                return;
            }
        }

        match self.tool {
            Tool::Select => self.select_down(p),
            Tool::Fill => self.fill_at(p.x, p.y),
            Tool::Picker => self.pick_at(p.x, p.y),
            Tool::Brush | Tool::Eraser | Tool::Blur | Tool::Shape(_) => self.stroke_down(p),
        }
    }

    pub fn pointer_move(&mut self, input: &PointerInput, view: &CanvasView) {
        if self.input_blocked(input) {
            return;
        }
        let Some(p) = self.resolve(input, view) else {
            return;
        };

        if self.dragging_guide {
            self.guide.set_center(p.x, p.y);
            return;
        }

        match self.tool {
            Tool::Select => {
                self.selection.update_marquee(p.x, p.y);
                self.selection.update_drag(p.x, p.y);
            }
            Tool::Brush | Tool::Eraser | Tool::Blur | Tool::Shape(_) => self.stroke_move(p),
            Tool::Fill | Tool::Picker => {}
        }
    }

    pub fn pointer_up(&mut self, input: &PointerInput, view: &CanvasView) {
        if self.modal_open || (self.pen_only && input.is_touch()) {
            return;
        }
        if self.dragging_guide {
            self.dragging_guide = false;
            return;
        }
        // A final position may refine the stroke end; touch-end often has none
        if let Some(p) = self.resolve(input, view) {
            match self.tool {
                Tool::Select => {
                    self.selection.update_marquee(p.x, p.y);
                    self.selection.update_drag(p.x, p.y);
                }
                Tool::Brush | Tool::Eraser | Tool::Blur | Tool::Shape(_) => self.stroke_move(p),
                _ => {}
            }
        }
        self.finish_pointer();
    }

    /// Pointer-cancel and pointer-leave finalize exactly like pointer-up,
    /// without a final sample.
    pub fn pointer_cancel(&mut self) {
        self.dragging_guide = false;
        self.finish_pointer();
    }

    fn finish_pointer(&mut self) {
        match self.tool {
            Tool::Select => self.select_up(),
            Tool::Brush | Tool::Eraser | Tool::Blur | Tool::Shape(_) => self.finalize_stroke(),
            _ => {}
        }
    }

    /// A second touch while painting: throw the in-flight stroke away and
    /// block stroke input until the gesture ends.
    pub fn begin_gesture(&mut self) {
        if let Some(stroke) = self.stroke.take() {
            if let Some(raster) = self.store.raster_mut(stroke.layer) {
                *raster = stroke.before;
            }
            self.scratch.clear();
            debug!("stroke discarded by gesture");
        }
        self.gesture_active = true;
    }

    pub fn end_gesture(&mut self) {
        self.gesture_active = false;
    }

    // ------------------------------------------------------------------
    // Strokes
    // ------------------------------------------------------------------

    fn stroke_down(&mut self, raw: Point) {
        if self.stroke.is_some() {
            return;
        }
        if raw.pressure <= 0.0 {
            // Mouse hover without the primary button
            return;
        }
        let layer_id = self.store.active_id();
        match self.store.layer(layer_id) {
            Some(layer) if layer.locked => {
                let err = EngineError::LayerLocked(layer.name.clone());
                self.notice(&err);
                return;
            }
            Some(_) => {}
            None => return,
        }
        let Some(before) = self.store.raster(layer_id).cloned() else {
            debug!("stroke ignored: layer buffer not attached");
            return;
        };

        let start = self.guide.constrain(raw);
        self.stabilizer.reset(start);

        let kind = match self.tool {
            Tool::Blur => {
                // Blur acts on raw positions; the stabilizer would drag the
                // effect behind the pointer.
                StrokeKind::Blur { last: start }
            }
            Tool::Shape(shape) => {
                // Shapes anchor on the raw press position; guides and the
                // stabilizer only shape freehand strokes.
                StrokeKind::Shape {
                    kind: shape,
                    start: (raw.x, raw.y),
                    end: (raw.x, raw.y),
                    axis: self.symmetry.then_some(self.symmetry_axis),
                }
            }
            _ => {
                let eraser = self.tool == Tool::Eraser;
                let preset = if eraser {
                    eraser_preset(self.settings.hardness)
                } else {
                    self.active_preset().clone()
                };
                let tip = self
                    .tips
                    .tip_for(&preset, self.settings.color, self.settings.hardness);
                let axis = self.symmetry.then_some(self.symmetry_axis);
                StrokeKind::Paint(StrokeSession::new(
                    &preset,
                    &self.settings,
                    tip,
                    eraser,
                    axis,
                    start,
                ))
            }
        };

        let flush = match &kind {
            StrokeKind::Paint(session) if session.target() == StrokeTarget::Buffered => {
                let blend = self.active_preset().blend.unwrap_or(BlendMode::Normal);
                Some((self.settings.opacity / 100.0, blend))
            }
            StrokeKind::Shape { .. } => Some((self.settings.opacity / 100.0, BlendMode::Normal)),
            _ => None,
        };

        let is_shape = matches!(kind, StrokeKind::Shape { .. });
        self.scratch.clear();
        self.stroke = Some(ActiveStroke {
            kind,
            layer: layer_id,
            before,
            flush,
        });
        if !is_shape {
            // Render the first sample; a shape draws nothing until dragged
            self.stroke_move(raw);
        }
    }

    fn stroke_move(&mut self, raw: Point) {
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };
        match &mut stroke.kind {
            StrokeKind::Paint(session) => {
                let p = if self.settings.stabilizer_enabled {
                    self.stabilizer.smooth(raw, self.settings.stabilizer_level)
                } else {
                    raw
                };
                // Constraints re-apply after smoothing so the stroke never
                // drifts off the guide
                let p = self.guide.constrain(p);
                match session.target() {
                    StrokeTarget::Buffered => session.extend(p, &mut self.scratch),
                    StrokeTarget::Direct => {
                        if let Some(raster) = self.store.raster_mut(stroke.layer) {
                            session.extend(p, raster);
                        }
                    }
                }
            }
            StrokeKind::Blur { last } => {
                let p = self.guide.constrain(raw);
                if p.distance_to(last) < BLUR_MIN_STEP {
                    return;
                }
                *last = p;
                let size = self.settings.size.max(4.0) as u32;
                let radius = ((self.settings.flow / 5.0) as u32).max(2);
                if let Some(raster) = self.store.raster_mut(stroke.layer) {
                    blur_dab(raster, p.x, p.y, size, radius);
                }
            }
            StrokeKind::Shape { kind, start, end, axis } => {
                *end = (raw.x, raw.y);
                self.scratch.clear();
                draw_shape(
                    &mut self.scratch,
                    *kind,
                    *start,
                    *end,
                    self.settings.color,
                    self.settings.size,
                );
                if let Some(axis) = *axis {
                    let mirror = |x: f32| axis + (axis - x);
                    draw_shape(
                        &mut self.scratch,
                        *kind,
                        (mirror(start.0), start.1),
                        (mirror(end.0), end.1),
                        self.settings.color,
                        self.settings.size,
                    );
                }
            }
        }
    }

    /// End the stroke: flush the scratch buffer if the brush is buffered,
    /// close the Draw action, reset per-stroke state.
    fn finalize_stroke(&mut self) {
        let Some(stroke) = self.stroke.take() else {
            return;
        };
        if let Some((opacity, blend)) = stroke.flush {
            if let Some(raster) = self.store.raster_mut(stroke.layer) {
                raster.composite_over(&self.scratch, 0, 0, opacity, blend);
            }
        }
        self.scratch.clear();

        let Some(after) = self.store.raster(stroke.layer).cloned() else {
            return;
        };
        if after == stroke.before {
            // Zero-pressure walk or fully clipped stroke: nothing to record
            return;
        }
        self.history.push(HistoryAction::Draw {
            layer: stroke.layer,
            before: stroke.before,
            after,
        });
    }

    // ------------------------------------------------------------------
    // Selection and clipboard
    // ------------------------------------------------------------------

    fn select_down(&mut self, p: Point) {
        if self.selection.lifted().is_some() {
            if self.selection.begin_drag(p.x, p.y) {
                return;
            }
            // Clicked outside the floating pixels: commit, then start fresh
            self.commit_selection();
        }
        self.selection.begin_marquee(p.x, p.y);
    }

    fn select_up(&mut self) {
        match &self.selection {
            Selection::Marqueeing { .. } => {
                let layer_id = self.store.active_id();
                // Lifting cuts pixels out of the layer, so a locked layer
                // rejects it the same way it rejects strokes and fills.
                if let Some(layer) = self.store.layer(layer_id) {
                    if layer.locked {
                        let err = EngineError::LayerLocked(layer.name.clone());
                        self.notice(&err);
                        self.selection = Selection::Idle;
                        return;
                    }
                }
                let Some(before) = self.store.raster(layer_id).cloned() else {
                    self.selection = Selection::Idle;
                    return;
                };
                if let Some(raster) = self.store.raster_mut(layer_id) {
                    self.selection.finish_marquee(raster);
                }
                if self.selection.lifted().is_some() {
                    self.selection_before = Some((layer_id, before));
                }
            }
            Selection::Dragging { .. } => self.selection.end_drag(),
            _ => {}
        }
    }

    /// Stamp the floating pixels down and close the lift→commit cycle as one
    /// Draw action.
    pub fn commit_selection(&mut self) {
        let Some((layer_id, _)) = self.selection_before else {
            self.selection = Selection::Idle;
            return;
        };
        let committed = match self.store.raster_mut(layer_id) {
            Some(raster) => self.selection.commit(raster),
            None => false,
        };
        if committed {
            self.close_selection_history(layer_id);
        }
    }

    /// Drop the floating pixels, leaving the lift hole.
    pub fn delete_selection(&mut self) {
        let Some((layer_id, _)) = self.selection_before else {
            return;
        };
        if self.selection.discard() {
            self.close_selection_history(layer_id);
        }
    }

    fn close_selection_history(&mut self, layer_id: LayerId) {
        let Some((_, before)) = self.selection_before.take() else {
            return;
        };
        let Some(after) = self.store.raster(layer_id).cloned() else {
            return;
        };
        if after != before {
            self.history.push(HistoryAction::Draw {
                layer: layer_id,
                before,
                after,
            });
        }
    }

    pub fn key_command(&mut self, cmd: KeyCommand) {
        if self.modal_open {
            return;
        }
        match cmd {
            KeyCommand::Undo => {
                self.history.undo(&mut self.store);
            }
            KeyCommand::Redo => {
                self.history.redo(&mut self.store);
            }
            KeyCommand::Copy => {
                if let Some(lifted) = self.selection.lifted() {
                    self.clipboard = Some(lifted.content.clone());
                }
            }
            KeyCommand::Cut => {
                if let Some(lifted) = self.selection.lifted() {
                    self.clipboard = Some(lifted.content.clone());
                    self.delete_selection();
                }
            }
            KeyCommand::Paste => self.paste(),
            KeyCommand::Delete => self.delete_selection(),
            KeyCommand::Commit => self.commit_selection(),
        }
    }

    /// Float the clipboard centered on the canvas as a new selection and
    /// switch to the select tool.
    fn paste(&mut self) {
        let Some(content) = self.clipboard.clone() else {
            return;
        };
        // An existing lift is committed first
        if self.selection.lifted().is_some() {
            self.commit_selection();
        }
        let layer_id = self.store.active_id();
        let Some(before) = self.store.raster(layer_id).cloned() else {
            return;
        };
        self.selection
            .float_centered(content, self.store.width(), self.store.height());
        self.selection_before = Some((layer_id, before));
        self.tool = Tool::Select;
    }

    // ------------------------------------------------------------------
    // Fill, picker, blur
    // ------------------------------------------------------------------

    /// Exact-match 4-connected flood fill at a canvas point. Filling with the
    /// color already there is a no-op and records nothing.
    pub fn fill_at(&mut self, x: f32, y: f32) {
        let layer_id = self.store.active_id();
        if let Some(layer) = self.store.layer(layer_id) {
            if layer.locked {
                let err = EngineError::LayerLocked(layer.name.clone());
                self.notice(&err);
                return;
            }
        }
        let Some(before) = self.store.raster(layer_id).cloned() else {
            return;
        };
        let fill = Rgba([
            self.settings.color[0],
            self.settings.color[1],
            self.settings.color[2],
            255,
        ]);
        let changed = match self.store.raster_mut(layer_id) {
            Some(raster) => flood_fill(raster, x, y, fill),
            None => false,
        };
        if !changed {
            return;
        }
        let Some(after) = self.store.raster(layer_id).cloned() else {
            return;
        };
        self.history.push(HistoryAction::Draw {
            layer: layer_id,
            before,
            after,
        });
    }

    /// Sample the active layer's color under the pointer into the brush
    /// color. Transparent samples are ignored.
    pub fn pick_at(&mut self, x: f32, y: f32) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let Some(raster) = self.store.raster(self.store.active_id()) else {
            return;
        };
        let px = raster.get_pixel(x as u32, y as u32);
        if px[3] > 0 {
            self.settings.color = [px[0], px[1], px[2]];
        }
    }

    // ------------------------------------------------------------------
    // Layer operations (undoable)
    // ------------------------------------------------------------------

    pub fn add_layer(&mut self) -> LayerId {
        let n = self.store.layers().len();
        let id = self.store.add_layer(format!("Layer {n}"));
        let index = self.store.layers().len() - 1;
        if let Some(layer) = self.store.layer(id).cloned() {
            self.history.push(HistoryAction::LayerAdd { layer, index });
        }
        id
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<(), EngineError> {
        let layer = self
            .store
            .layer(id)
            .cloned()
            .ok_or(EngineError::UnknownLayer(id))?;
        match self.store.delete_layer(id) {
            Ok((index, raster)) => {
                self.history.push(HistoryAction::LayerDelete {
                    layer,
                    index,
                    raster,
                });
                Ok(())
            }
            Err(err) => {
                self.notice(&err);
                Err(err)
            }
        }
    }

    pub fn duplicate_layer(&mut self, id: LayerId) -> Result<LayerId, EngineError> {
        let (copy_id, index) = self.store.duplicate_layer(id)?;
        let layer = self
            .store
            .layer(copy_id)
            .cloned()
            .ok_or(EngineError::UnknownLayer(copy_id))?;
        let raster = self
            .store
            .raster(copy_id)
            .cloned()
            .ok_or(EngineError::UnknownLayer(copy_id))?;
        self.history.push(HistoryAction::LayerDuplicate {
            layer,
            index,
            raster,
        });
        Ok(copy_id)
    }

    pub fn merge_layer_down(&mut self, id: LayerId) -> Result<(), EngineError> {
        match self.store.merge_down(id) {
            Ok(record) => {
                let bottom_after = self
                    .store
                    .raster(record.bottom)
                    .cloned()
                    .unwrap_or_else(|| Raster::new(self.store.width(), self.store.height()));
                self.history.push(HistoryAction::LayerMerge {
                    top: record.top,
                    top_index: record.top_index,
                    top_raster: record.top_raster,
                    bottom: record.bottom,
                    bottom_before: record.bottom_before,
                    bottom_after,
                });
                Ok(())
            }
            Err(err) => {
                self.notice(&err);
                Err(err)
            }
        }
    }

    pub fn reorder_layer(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        let before = self.store.order();
        match self.store.reorder(from, to) {
            Ok(()) => {
                let after = self.store.order();
                self.history
                    .push(HistoryAction::LayerReorder { before, after });
                Ok(())
            }
            Err(err) => {
                self.notice(&err);
                Err(err)
            }
        }
    }

    /// Mirror a layer's pixels. Recorded as a Draw action.
    pub fn flip_layer(&mut self, id: LayerId, horizontal: bool) -> Result<(), EngineError> {
        let before = self
            .store
            .raster(id)
            .cloned()
            .ok_or(EngineError::UnknownLayer(id))?;
        if let Some(raster) = self.store.raster_mut(id) {
            if horizontal {
                raster.flip_horizontal();
            } else {
                raster.flip_vertical();
            }
        }
        let after = self
            .store
            .raster(id)
            .cloned()
            .ok_or(EngineError::UnknownLayer(id))?;
        self.history.push(HistoryAction::Draw {
            layer: id,
            before,
            after,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Import and project lifecycle
    // ------------------------------------------------------------------

    /// Place a decoded image on a fresh layer: scaled down to fit (never
    /// up), centered, routed through the pending queue so placement also
    /// works when the layer's buffer attaches later.
    pub fn place_image(&mut self, image: &RgbaImage) -> LayerId {
        let id = self.begin_image_import(image);
        self.finish_image_import(id);
        id
    }

    /// Queue the placement against a deferred layer.
    pub fn begin_image_import(&mut self, image: &RgbaImage) -> LayerId {
        let (cw, ch) = (self.store.width(), self.store.height());
        let scale = (cw as f32 / image.width() as f32)
            .min(ch as f32 / image.height() as f32)
            .min(1.0);
        let w = ((image.width() as f32 * scale) as u32).max(1);
        let h = ((image.height() as f32 * scale) as u32).max(1);
        let fitted = if (w, h) == (image.width(), image.height()) {
            image.clone()
        } else {
            imageops::resize(image, w, h, imageops::FilterType::Triangle)
        };
        let x = (cw as i32 - w as i32) / 2;
        let y = (ch as i32 - h as i32) / 2;

        let id = self.store.add_layer_deferred("Imported");
        let index = self.store.layers().len() - 1;
        if let Some(layer) = self.store.layer(id).cloned() {
            self.history.push(HistoryAction::LayerAdd { layer, index });
        }
        self.store.enqueue(
            id,
            PendingOp::Place {
                image: Raster::from_image(fitted),
                x,
                y,
            },
        );
        id
    }

    /// Attach the layer's buffer, draining the queued placement, and record
    /// the resulting pixels.
    pub fn finish_image_import(&mut self, id: LayerId) {
        let (w, h) = (self.store.width(), self.store.height());
        let before = Raster::new(w, h);
        self.store.attach_raster(id, before.clone());
        let Some(after) = self.store.raster(id).cloned() else {
            return;
        };
        self.history.push(HistoryAction::Draw {
            layer: id,
            before,
            after,
        });
    }

    /// Composite the visible stack over white for export.
    pub fn flatten(&self) -> RgbaImage {
        self.store.flatten().into_image()
    }

    /// Replace the document: new size, locked textured background plus one
    /// working layer, history and selection cleared, identity viewport.
    pub fn new_project(&mut self, width: u32, height: u32, paper: PaperTexture) {
        self.store = LayerStore::new(width, height);
        let background = self.store.background_id();
        if let Some(raster) = self.store.raster_mut(background) {
            *raster = paper_fill(width, height, paper);
        }
        self.history.clear();
        self.selection = Selection::default();
        self.selection_before = None;
        self.stroke = None;
        self.scratch = Raster::new(width, height);
        self.transform = ViewTransform::default();
        self.guide = Guide::None;
        self.dragging_guide = false;
        self.symmetry_axis = width as f32 / 2.0;
        self.tips.invalidate();
    }
}

/// The eraser reuses the Path tip pipeline with the user's hardness; its
/// preset never appears in the library.
fn eraser_preset(hardness: f32) -> BrushPreset {
    BrushPreset {
        hardness,
        ..BrushPreset::custom_path("Eraser")
    }
}

/// Stamp one blur dab: box-blur a square region under the cursor and blend it
/// back in with a radial falloff mask.
fn blur_dab(raster: &mut Raster, cx: f32, cy: f32, size: u32, radius: u32) {
    let half = size as i32 / 2;
    let x0 = cx as i32 - half;
    let y0 = cy as i32 - half;
    let region = raster.extract_region(x0, y0, size, size);
    let blurred = region.box_blur(radius);

    let center = size as f32 / 2.0;
    for dy in 0..size {
        for dx in 0..size {
            let tx = x0 + dx as i32;
            let ty = y0 + dy as i32;
            if tx < 0 || ty < 0 {
                continue;
            }
            let dist = ((dx as f32 + 0.5 - center).powi(2) + (dy as f32 + 0.5 - center).powi(2))
                .sqrt();
            let mask = (1.0 - dist / center).clamp(0.0, 1.0);
            if mask <= 0.0 {
                continue;
            }
            let orig = region.get_pixel(dx, dy);
            let soft = blurred.get_pixel(dx, dy);
            let mut out = [0u8; 4];
            for c in 0..4 {
                out[c] = (orig[c] as f32 * (1.0 - mask) + soft[c] as f32 * mask).round() as u8;
            }
            raster.put_pixel(tx as u32, ty as u32, Rgba(out));
        }
    }
}

/// Stack-based exact-match flood fill, 4-connected. Returns whether any pixel
/// changed; an out-of-bounds seed or a seed already at the fill color does
/// nothing.
pub fn flood_fill(raster: &mut Raster, x: f32, y: f32, fill: Rgba<u8>) -> bool {
    if x < 0.0 || y < 0.0 {
        return false;
    }
    let (w, h) = (raster.width(), raster.height());
    let (sx, sy) = (x as u32, y as u32);
    if sx >= w || sy >= h {
        return false;
    }
    let target = raster.get_pixel(sx, sy);
    if target == fill {
        return false;
    }

    let mut stack = vec![(sx, sy)];
    while let Some((px, py)) = stack.pop() {
        if raster.get_pixel(px, py) != target {
            continue;
        }
        raster.put_pixel(px, py, fill);
        if px > 0 {
            stack.push((px - 1, py));
        }
        if px + 1 < w {
            stack.push((px + 1, py));
        }
        if py > 0 {
            stack.push((px, py - 1));
        }
        if py + 1 < h {
            stack.push((px, py + 1));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(w: u32, h: u32) -> CanvasView {
        CanvasView {
            center_x: w as f32 / 2.0,
            center_y: h as f32 / 2.0,
            width: w,
            height: h,
        }
    }

    fn pen_stroke(editor: &mut Editor, view: &CanvasView, points: &[(f32, f32)]) {
        let (x, y) = points[0];
        editor.pointer_down(&PointerInput::pen(x, y, 0.8), view);
        for &(x, y) in &points[1..] {
            editor.pointer_move(&PointerInput::pen(x, y, 0.8), view);
        }
        let (x, y) = *points.last().unwrap_or(&points[0]);
        editor.pointer_up(&PointerInput::pen(x, y, 0.8), view);
    }

    #[test]
    fn stroke_records_one_draw_action() {
        let mut editor = Editor::new(100, 100);
        editor.settings.stabilizer_enabled = false;
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(20.0, 50.0), (80.0, 50.0)]);
        assert_eq!(editor.history().len(), 1);
        let layer = editor.layers().active_id();
        assert!(editor.layers().raster(layer).unwrap().get_pixel(50, 50)[3] > 0);
    }

    #[test]
    fn undo_removes_the_stroke() {
        let mut editor = Editor::new(100, 100);
        editor.settings.stabilizer_enabled = false;
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(20.0, 50.0), (80.0, 50.0)]);
        editor.key_command(KeyCommand::Undo);
        let layer = editor.layers().active_id();
        assert_eq!(editor.layers().raster(layer).unwrap().get_pixel(50, 50)[3], 0);
        editor.key_command(KeyCommand::Redo);
        assert!(editor.layers().raster(layer).unwrap().get_pixel(50, 50)[3] > 0);
    }

    #[test]
    fn mouse_without_button_starts_no_stroke() {
        let mut editor = Editor::new(100, 100);
        let v = view(100, 100);
        editor.pointer_down(&PointerInput::mouse(50.0, 50.0, false), &v);
        editor.pointer_move(&PointerInput::mouse(80.0, 50.0, false), &v);
        editor.pointer_up(&PointerInput::mouse(80.0, 50.0, false), &v);
        assert_eq!(editor.history().len(), 0);
    }

    #[test]
    fn pen_only_mode_ignores_touch() {
        let mut editor = Editor::new(100, 100);
        editor.set_pen_only(true);
        let v = view(100, 100);
        editor.pointer_down(&PointerInput::touch(20.0, 50.0), &v);
        editor.pointer_move(&PointerInput::touch(80.0, 50.0), &v);
        editor.pointer_up(&PointerInput::touch(80.0, 50.0), &v);
        assert_eq!(editor.history().len(), 0);
    }

    #[test]
    fn modal_blocks_keys_and_pointers() {
        let mut editor = Editor::new(100, 100);
        editor.settings.stabilizer_enabled = false;
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(20.0, 50.0), (80.0, 50.0)]);
        editor.set_modal_open(true);
        editor.key_command(KeyCommand::Undo);
        let layer = editor.layers().active_id();
        assert!(editor.layers().raster(layer).unwrap().get_pixel(50, 50)[3] > 0);
    }

    #[test]
    fn gesture_discards_stroke_without_history() {
        let mut editor = Editor::new(100, 100);
        editor.settings.stabilizer_enabled = false;
        // Direct-draw tool so pixels land on the layer mid-stroke
        editor.set_tool(Tool::Eraser);
        let v = view(100, 100);
        editor.pointer_down(&PointerInput::pen(20.0, 50.0, 0.8), &v);
        editor.pointer_move(&PointerInput::pen(80.0, 50.0, 0.8), &v);
        editor.begin_gesture();
        editor.pointer_up(&PointerInput::pen(80.0, 50.0, 0.8), &v);
        assert_eq!(editor.history().len(), 0);
        editor.end_gesture();
    }

    #[test]
    fn locked_layer_rejects_strokes_with_notice() {
        let mut editor = Editor::new(100, 100);
        let bg = editor.layers().background_id();
        editor.layers_mut().set_active(bg).unwrap();
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(20.0, 50.0), (80.0, 50.0)]);
        assert_eq!(editor.history().len(), 0);
        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("locked"));
    }

    #[test]
    fn eraser_erases_directly() {
        let mut editor = Editor::new(100, 100);
        editor.settings.stabilizer_enabled = false;
        let layer = editor.layers().active_id();
        editor
            .layers_mut()
            .raster_mut(layer)
            .unwrap()
            .fill(Rgba([0, 0, 0, 255]));
        editor.set_tool(Tool::Eraser);
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(20.0, 50.0), (80.0, 50.0)]);
        assert!(editor.layers().raster(layer).unwrap().get_pixel(50, 50)[3] < 255);
    }

    #[test]
    fn fill_then_fill_same_color_records_once() {
        let mut editor = Editor::new(50, 50);
        editor.settings.color = [10, 200, 30];
        editor.set_tool(Tool::Fill);
        let v = view(50, 50);
        editor.pointer_down(&PointerInput::mouse(25.0, 25.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(25.0, 25.0, true), &v);
        assert_eq!(editor.history().len(), 1);
        // Second fill with the same color hits identical pixels: no entry
        editor.pointer_down(&PointerInput::mouse(25.0, 25.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(25.0, 25.0, true), &v);
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn picker_reads_layer_color() {
        let mut editor = Editor::new(50, 50);
        let layer = editor.layers().active_id();
        editor
            .layers_mut()
            .raster_mut(layer)
            .unwrap()
            .put_pixel(10, 10, Rgba([90, 60, 30, 255]));
        editor.set_tool(Tool::Picker);
        let v = view(50, 50);
        editor.pointer_down(&PointerInput::mouse(10.0, 10.0, true), &v);
        assert_eq!(editor.settings.color, [90, 60, 30]);
    }

    #[test]
    fn selection_lift_drag_commit_is_one_action() {
        let mut editor = Editor::new(300, 300);
        let layer = editor.layers().active_id();
        editor
            .layers_mut()
            .raster_mut(layer)
            .unwrap()
            .fill(Rgba([5, 5, 5, 255]));
        editor.set_tool(Tool::Select);
        let v = view(300, 300);

        // Marquee a 50×50 block at (10,10)
        editor.pointer_down(&PointerInput::mouse(10.0, 10.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(60.0, 60.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(60.0, 60.0, true), &v);
        assert!(editor.selection().lifted().is_some());

        // Drag it to (200,200)
        editor.pointer_down(&PointerInput::mouse(35.0, 35.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(225.0, 225.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(225.0, 225.0, true), &v);

        editor.key_command(KeyCommand::Commit);
        assert_eq!(editor.history().len(), 1);

        let raster = editor.layers().raster(layer).unwrap();
        assert_eq!(raster.get_pixel(30, 30)[3], 0);
        assert_eq!(raster.get_pixel(220, 220), Rgba([5, 5, 5, 255]));

        // One undo restores the pre-lift pixels
        editor.key_command(KeyCommand::Undo);
        let raster = editor.layers().raster(layer).unwrap();
        assert_eq!(raster.get_pixel(30, 30), Rgba([5, 5, 5, 255]));
        assert_eq!(raster.get_pixel(220, 220), Rgba([5, 5, 5, 255]));
    }

    #[test]
    fn outside_click_auto_commits() {
        let mut editor = Editor::new(300, 300);
        let layer = editor.layers().active_id();
        editor
            .layers_mut()
            .raster_mut(layer)
            .unwrap()
            .fill(Rgba([5, 5, 5, 255]));
        editor.set_tool(Tool::Select);
        let v = view(300, 300);
        editor.pointer_down(&PointerInput::mouse(10.0, 10.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(60.0, 60.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(60.0, 60.0, true), &v);

        editor.pointer_down(&PointerInput::mouse(200.0, 200.0, true), &v);
        assert!(editor.selection().lifted().is_none());
        // Committed back in place: pixels restored, nothing worth recording
        assert_eq!(editor.history().len(), 0);
        assert_eq!(
            editor.layers().raster(layer).unwrap().get_pixel(30, 30),
            Rgba([5, 5, 5, 255])
        );
    }

    #[test]
    fn copy_paste_floats_clipboard_centered() {
        let mut editor = Editor::new(300, 300);
        let layer = editor.layers().active_id();
        editor
            .layers_mut()
            .raster_mut(layer)
            .unwrap()
            .fill(Rgba([5, 5, 5, 255]));
        editor.set_tool(Tool::Select);
        let v = view(300, 300);
        editor.pointer_down(&PointerInput::mouse(10.0, 10.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(60.0, 60.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(60.0, 60.0, true), &v);

        editor.key_command(KeyCommand::Copy);
        editor.key_command(KeyCommand::Commit);
        editor.key_command(KeyCommand::Paste);

        let lifted = editor.selection().lifted().unwrap();
        assert_eq!((lifted.x, lifted.y), (125, 125));
        assert_eq!(editor.tool(), Tool::Select);
    }

    #[test]
    fn guide_handle_drag_moves_the_guide_not_the_brush() {
        let mut editor = Editor::new(200, 200);
        editor.set_guide(Guide::Ruler {
            center_x: 100.0,
            center_y: 100.0,
            angle: 0.0,
        });
        let v = view(200, 200);
        editor.pointer_down(&PointerInput::mouse(110.0, 105.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(150.0, 160.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(150.0, 160.0, true), &v);

        assert_eq!(editor.guide().center(), Some((150.0, 160.0)));
        assert_eq!(editor.history().len(), 0);
    }

    #[test]
    fn merge_down_then_undo_restores_both_layers() {
        let mut editor = Editor::new(50, 50);
        let bottom = editor.layers().active_id();
        let top = editor.layers_mut().add_layer("Layer 2");
        editor
            .layers_mut()
            .raster_mut(top)
            .unwrap()
            .fill(Rgba([0, 0, 0, 255]));
        editor.layers_mut().set_opacity(top, 50.0);

        editor.merge_layer_down(top).unwrap();
        let merged = editor.layers().raster(bottom).unwrap().get_pixel(25, 25);
        assert!((merged[3] as i32 - 128).abs() <= 1);

        editor.key_command(KeyCommand::Undo);
        assert_eq!(editor.layers().layers().len(), 3);
        assert_eq!(editor.layers().raster(bottom).unwrap().get_pixel(25, 25)[3], 0);

        editor.key_command(KeyCommand::Redo);
        assert_eq!(editor.layers().layers().len(), 2);
        assert_eq!(
            editor.layers().raster(bottom).unwrap().get_pixel(25, 25),
            merged
        );
    }

    #[test]
    fn place_image_scales_down_and_centers() {
        let mut editor = Editor::new(100, 100);
        let big = RgbaImage::from_pixel(200, 100, Rgba([1, 2, 3, 255]));
        let id = editor.place_image(&big);
        let raster = editor.layers().raster(id).unwrap();
        // Fitted to 100×50, centered at y=25
        assert_eq!(raster.get_pixel(50, 50), Rgba([1, 2, 3, 255]));
        assert_eq!(raster.get_pixel(50, 10)[3], 0);
        // LayerAdd + Draw
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn new_project_resets_everything() {
        let mut editor = Editor::new(100, 100);
        editor.settings.stabilizer_enabled = false;
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(20.0, 50.0), (80.0, 50.0)]);
        editor.transform.scale = 3.0;

        editor.new_project(64, 64, PaperTexture::OldPaper);
        assert_eq!(editor.history().len(), 0);
        assert_eq!(editor.layers().layers().len(), 2);
        assert_eq!(editor.transform, ViewTransform::default());
        let bg = editor.layers().background_id();
        let px = editor.layers().raster(bg).unwrap().get_pixel(32, 32);
        // Old paper is beige, not white
        assert!(px[0] > px[2]);
    }

    #[test]
    fn flood_fill_is_idempotent() {
        let mut raster = Raster::new(20, 20);
        assert!(flood_fill(&mut raster, 5.0, 5.0, Rgba([9, 9, 9, 255])));
        let snapshot = raster.clone();
        assert!(!flood_fill(&mut raster, 5.0, 5.0, Rgba([9, 9, 9, 255])));
        assert_eq!(raster, snapshot);
    }

    #[test]
    fn flood_fill_respects_boundaries() {
        let mut raster = Raster::new(20, 20);
        // Vertical wall at x=10
        for y in 0..20 {
            raster.put_pixel(10, y, Rgba([0, 0, 0, 255]));
        }
        flood_fill(&mut raster, 2.0, 2.0, Rgba([9, 9, 9, 255]));
        assert_eq!(raster.get_pixel(5, 5), Rgba([9, 9, 9, 255]));
        assert_eq!(raster.get_pixel(15, 5)[3], 0);
        assert_eq!(raster.get_pixel(10, 5), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn removing_every_preset_keeps_one_active() {
        let mut editor = Editor::new(32, 32);
        let ids: Vec<BrushId> = editor.presets().iter().map(|p| p.id).collect();
        for id in ids {
            editor.remove_custom_brush(id);
        }
        assert_eq!(editor.presets().len(), 1);
        let active = editor.active_preset().id;
        assert!(editor.presets().iter().any(|p| p.id == active));
    }

    #[test]
    fn locked_layer_rejects_selection_lift_with_notice() {
        let mut editor = Editor::new(100, 100);
        let bg = editor.layers().background_id();
        editor.layers_mut().set_active(bg).unwrap();
        editor.set_tool(Tool::Select);
        let v = view(100, 100);
        editor.pointer_down(&PointerInput::mouse(10.0, 10.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(60.0, 60.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(60.0, 60.0, true), &v);

        assert!(editor.selection().lifted().is_none());
        assert_eq!(
            editor.layers().raster(bg).unwrap().get_pixel(30, 30),
            Rgba([255, 255, 255, 255])
        );
        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("locked"));
    }

    #[test]
    fn rectangle_drag_records_one_draw_action() {
        let mut editor = Editor::new(200, 200);
        editor.settings.size = 6.0;
        editor.set_tool(Tool::Shape(ShapeKind::Rectangle));
        let v = view(200, 200);
        editor.pointer_down(&PointerInput::mouse(40.0, 40.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(160.0, 120.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(160.0, 120.0, true), &v);

        assert_eq!(editor.history().len(), 1);
        let layer = editor.layers().active_id();
        let raster = editor.layers().raster(layer).unwrap();
        assert!(raster.get_pixel(100, 40)[3] > 0);
        assert!(raster.get_pixel(100, 120)[3] > 0);
        assert_eq!(raster.get_pixel(100, 80)[3], 0);

        editor.key_command(KeyCommand::Undo);
        assert_eq!(editor.layers().raster(layer).unwrap().get_pixel(100, 40)[3], 0);
    }

    #[test]
    fn shape_click_without_drag_leaves_no_mark() {
        let mut editor = Editor::new(100, 100);
        editor.set_tool(Tool::Shape(ShapeKind::Circle));
        let v = view(100, 100);
        editor.pointer_down(&PointerInput::mouse(50.0, 50.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(50.0, 50.0, true), &v);
        assert_eq!(editor.history().len(), 0);
    }

    #[test]
    fn symmetry_mirrors_the_shape() {
        let mut editor = Editor::new(200, 200);
        editor.settings.size = 6.0;
        editor.set_symmetry(true);
        editor.set_tool(Tool::Shape(ShapeKind::Line));
        let v = view(200, 200);
        editor.pointer_down(&PointerInput::mouse(20.0, 50.0, true), &v);
        editor.pointer_move(&PointerInput::mouse(40.0, 50.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(40.0, 50.0, true), &v);

        let layer = editor.layers().active_id();
        let raster = editor.layers().raster(layer).unwrap();
        assert!(raster.get_pixel(30, 50)[3] > 0);
        // Mirrored about the axis at x=100
        assert!(raster.get_pixel(170, 50)[3] > 0);
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn blur_tool_softens_edges() {
        let mut editor = Editor::new(100, 100);
        editor.settings.size = 30.0;
        editor.settings.flow = 50.0;
        let layer = editor.layers().active_id();
        {
            let raster = editor.layers_mut().raster_mut(layer).unwrap();
            // Hard vertical edge through x=50
            for y in 0..100 {
                for x in 0..50 {
                    raster.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
        }
        editor.set_tool(Tool::Blur);
        let v = view(100, 100);
        pen_stroke(&mut editor, &v, &[(50.0, 50.0), (50.0, 56.0)]);

        let px = editor.layers().raster(layer).unwrap().get_pixel(51, 50);
        assert!(px[3] > 0, "edge should bleed right after blur, got {:?}", px);
        assert_eq!(editor.history().len(), 1);
    }
}
