//! The layer stack: metadata, per-layer pixel buffers and the pending
//! application queue for rasters that arrive while a layer's buffer is not
//! yet attached.
//!
//! Index 0 is the bottom of the stack and always the background layer; it can
//! never be deleted or moved. Metadata edits (name, visibility, opacity) are
//! not recorded in history.

use std::collections::{HashMap, VecDeque};

use image::Rgba;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::raster::{BlendMode, Raster};

/// Opaque layer handle, stable across reorders and undo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Layer metadata. The pixel buffer lives separately in the store so that a
/// layer can exist before its raster is attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    /// 0–100.
    pub opacity: f32,
    pub locked: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            opacity: 100.0,
            locked: false,
        }
    }
}

/// A raster mutation waiting for its layer's buffer to become available.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingOp {
    /// Replace the layer buffer wholesale (deferred undo/redo restore).
    Restore(Raster),
    /// Composite an image at an offset (deferred import placement).
    Place { image: Raster, x: i32, y: i32 },
}

/// Everything a merge-down mutates, captured for history.
#[derive(Clone, Debug)]
pub struct MergeRecord {
    pub top: Layer,
    pub top_raster: Raster,
    pub top_index: usize,
    pub bottom: LayerId,
    pub bottom_before: Raster,
}

/// The document's layer stack plus per-layer rasters.
pub struct LayerStore {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    rasters: HashMap<LayerId, Raster>,
    active: LayerId,
    pending: VecDeque<(LayerId, PendingOp)>,
}

impl LayerStore {
    /// A fresh two-layer document: a locked background plus one working
    /// layer, which starts active.
    pub fn new(width: u32, height: u32) -> Self {
        let mut background = Layer::new("Background");
        background.locked = true;
        let working = Layer::new("Layer 1");
        let active = working.id;

        let mut rasters = HashMap::new();
        rasters.insert(
            background.id,
            Raster::new_filled(width, height, Rgba([255, 255, 255, 255])),
        );
        rasters.insert(working.id, Raster::new(width, height));

        Self {
            width,
            height,
            layers: vec![background, working],
            rasters,
            active,
            pending: VecDeque::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bottom-to-top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn background_id(&self) -> LayerId {
        self.layers[0].id
    }

    pub fn active_id(&self) -> LayerId {
        self.active
    }

    pub fn set_active(&mut self, id: LayerId) -> Result<(), EngineError> {
        if self.index_of(id).is_none() {
            return Err(EngineError::UnknownLayer(id));
        }
        self.active = id;
        Ok(())
    }

    /// The buffer for a layer, or `None` while it is detached.
    pub fn raster(&self, id: LayerId) -> Option<&Raster> {
        self.rasters.get(&id)
    }

    pub fn raster_mut(&mut self, id: LayerId) -> Option<&mut Raster> {
        self.rasters.get_mut(&id)
    }

    pub fn active_raster_mut(&mut self) -> Option<&mut Raster> {
        self.rasters.get_mut(&self.active)
    }

    /// Append a new transparent layer on top of the stack and make it active.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let layer = Layer::new(name);
        let id = layer.id;
        self.rasters.insert(id, Raster::new(self.width, self.height));
        self.layers.push(layer);
        self.active = id;
        id
    }

    /// Append a layer whose buffer will arrive later via
    /// [`LayerStore::attach_raster`]. Raster mutations queued against it sit
    /// in the pending queue until then.
    pub fn add_layer_deferred(&mut self, name: impl Into<String>) -> LayerId {
        let layer = Layer::new(name);
        let id = layer.id;
        self.layers.push(layer);
        self.active = id;
        id
    }

    /// Attach a buffer to a previously deferred layer and drain any pending
    /// operations that were queued against it.
    pub fn attach_raster(&mut self, id: LayerId, raster: Raster) {
        if self.index_of(id).is_none() {
            warn!("attach_raster for unknown layer {id}");
            return;
        }
        self.rasters.insert(id, raster);
        self.drain_pending();
    }

    /// Queue a raster mutation. Applied immediately when the buffer is
    /// attached, deferred otherwise.
    pub fn enqueue(&mut self, id: LayerId, op: PendingOp) {
        self.pending.push_back((id, op));
        self.drain_pending();
    }

    /// Apply every queued operation whose target buffer is attached, in FIFO
    /// order. Operations for still-detached layers stay queued.
    pub fn drain_pending(&mut self) {
        let mut remaining = VecDeque::new();
        while let Some((id, op)) = self.pending.pop_front() {
            if self.index_of(id).is_none() {
                warn!("dropping pending operation for removed layer {id}");
                continue;
            }
            match self.rasters.get_mut(&id) {
                None => remaining.push_back((id, op)),
                Some(raster) => match op {
                    PendingOp::Restore(snapshot) => *raster = snapshot,
                    PendingOp::Place { image, x, y } => {
                        raster.composite_over(&image, x, y, 1.0, BlendMode::Normal)
                    }
                },
            }
        }
        self.pending = remaining;
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Remove a layer. The background (index 0) and the last remaining layer
    /// are protected. Returns the stack index and buffer for history.
    pub fn delete_layer(&mut self, id: LayerId) -> Result<(usize, Raster), EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::UnknownLayer(id))?;
        if self.layers.len() <= 1 {
            return Err(EngineError::LastLayer);
        }
        if index == 0 {
            return Err(EngineError::BackgroundLayer);
        }
        let layer = self.layers.remove(index);
        let raster = self
            .rasters
            .remove(&layer.id)
            .unwrap_or_else(|| Raster::new(self.width, self.height));
        if self.active == id {
            self.active = self.layers[index - 1].id;
        }
        Ok((index, raster))
    }

    /// Copy a layer directly above the source and make the copy active.
    pub fn duplicate_layer(&mut self, id: LayerId) -> Result<(LayerId, usize), EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::UnknownLayer(id))?;
        let source = self.layers[index].clone();
        let raster = self
            .rasters
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Raster::new(self.width, self.height));

        let copy = Layer {
            id: LayerId::new(),
            name: format!("{} (Copy)", source.name),
            locked: false,
            ..source
        };
        let copy_id = copy.id;
        self.rasters.insert(copy_id, raster);
        self.layers.insert(index + 1, copy);
        self.active = copy_id;
        Ok((copy_id, index + 1))
    }

    /// Composite a layer onto the one below it at the top layer's opacity,
    /// then remove the top layer. Rejected for the bottom layer.
    pub fn merge_down(&mut self, id: LayerId) -> Result<MergeRecord, EngineError> {
        let index = self
            .index_of(id)
            .ok_or(EngineError::UnknownLayer(id))?;
        if index == 0 {
            return Err(EngineError::MergeFromBottom);
        }
        let bottom_id = self.layers[index - 1].id;
        let top = self.layers[index].clone();
        let top_raster = match self.rasters.get(&id) {
            Some(r) => r.clone(),
            None => {
                warn!("merge_down skipped: buffer for {id} not attached");
                return Err(EngineError::UnknownLayer(id));
            }
        };
        let bottom_before = match self.rasters.get(&bottom_id) {
            Some(r) => r.clone(),
            None => {
                warn!("merge_down skipped: buffer for {bottom_id} not attached");
                return Err(EngineError::UnknownLayer(bottom_id));
            }
        };

        let alpha = top.opacity / 100.0;
        if let Some(bottom_raster) = self.rasters.get_mut(&bottom_id) {
            bottom_raster.composite_over(&top_raster, 0, 0, alpha, BlendMode::Normal);
        }
        self.layers.remove(index);
        self.rasters.remove(&id);
        if self.active == id {
            self.active = bottom_id;
        }

        Ok(MergeRecord {
            top,
            top_raster,
            top_index: index,
            bottom: bottom_id,
            bottom_before,
        })
    }

    /// Move a layer to a new stack position. The background stays pinned at
    /// the bottom, so neither endpoint may be index 0.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        if from == 0 || to == 0 {
            return Err(EngineError::BackgroundLayer);
        }
        if from >= self.layers.len() || to >= self.layers.len() {
            return Err(EngineError::UnknownLayer(LayerId::new()));
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        Ok(())
    }

    /// Current stack order, bottom to top.
    pub fn order(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    /// Restore a previously captured stack order. Ids absent from `order`
    /// keep their relative position at the end.
    pub fn apply_order(&mut self, order: &[LayerId]) {
        self.layers.sort_by_key(|l| {
            order
                .iter()
                .position(|id| *id == l.id)
                .unwrap_or(usize::MAX)
        });
    }

    pub fn set_name(&mut self, id: LayerId, name: impl Into<String>) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.name = name.into();
        }
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.visible = visible;
        }
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.opacity = opacity.clamp(0.0, 100.0);
        }
    }

    /// Re-insert a layer at a stack index with its buffer (undo of delete and
    /// merge). Clamps the index to the current stack size.
    pub(crate) fn insert_at(&mut self, index: usize, layer: Layer, raster: Raster) {
        let index = index.min(self.layers.len());
        self.rasters.insert(layer.id, raster);
        self.active = layer.id;
        self.layers.insert(index, layer);
    }

    /// Remove a layer bypassing the delete guards (redo of delete/merge,
    /// undo of add). Silent no-op for unknown ids.
    pub(crate) fn remove_unchecked(&mut self, id: LayerId) -> Option<(usize, Layer, Raster)> {
        let index = self.index_of(id)?;
        if self.layers.len() <= 1 {
            warn!("refusing to remove the only layer {id}");
            return None;
        }
        let layer = self.layers.remove(index);
        let raster = self
            .rasters
            .remove(&id)
            .unwrap_or_else(|| Raster::new(self.width, self.height));
        if self.active == id {
            self.active = self.layers[index.saturating_sub(1).min(self.layers.len() - 1)].id;
        }
        Some((index, layer, raster))
    }

    /// Composite all visible layers bottom-to-top over white at their own
    /// opacity. Detached buffers are skipped.
    pub fn flatten(&self) -> Raster {
        let mut out = Raster::new_filled(self.width, self.height, Rgba([255, 255, 255, 255]));
        for layer in &self.layers {
            if !layer.visible {
                continue;
            }
            if let Some(raster) = self.rasters.get(&layer.id) {
                out.composite_over(raster, 0, 0, layer.opacity / 100.0, BlendMode::Normal);
            }
        }
        out
    }
}
