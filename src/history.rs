//! Transactional undo/redo: a single capped action log with one cursor.
//!
//! Every undoable edit is captured as a [`HistoryAction`] variant carrying
//! everything needed to both revert and re-apply it. Pushing while undone
//! truncates the redo tail; the log holds at most [`HistoryLog::CAPACITY`]
//! actions and evicts the oldest beyond that.

use std::collections::VecDeque;

use log::debug;

use crate::layer::{Layer, LayerId, LayerStore, PendingOp};
use crate::raster::Raster;

/// One undoable edit, with full before/after state.
#[derive(Clone, Debug)]
pub enum HistoryAction {
    /// Any raster mutation of a single layer: strokes, fills, selection
    /// moves, flips, blur passes, image placement.
    Draw {
        layer: LayerId,
        before: Raster,
        after: Raster,
    },
    LayerAdd {
        layer: Layer,
        index: usize,
    },
    LayerDelete {
        layer: Layer,
        index: usize,
        raster: Raster,
    },
    LayerReorder {
        before: Vec<LayerId>,
        after: Vec<LayerId>,
    },
    LayerMerge {
        top: Layer,
        top_index: usize,
        top_raster: Raster,
        bottom: LayerId,
        bottom_before: Raster,
        bottom_after: Raster,
    },
    LayerDuplicate {
        layer: Layer,
        index: usize,
        raster: Raster,
    },
}

/// Write a snapshot into a layer buffer, or queue it if the buffer is
/// detached. Undo never silently loses pixels to a missing buffer.
fn restore_raster(store: &mut LayerStore, layer: LayerId, snapshot: &Raster) {
    if let Some(raster) = store.raster_mut(layer) {
        *raster = snapshot.clone();
        return;
    }
    store.enqueue(layer, PendingOp::Restore(snapshot.clone()));
}

impl HistoryAction {
    /// Undo this action against the document.
    pub fn revert(&self, store: &mut LayerStore) {
        match self {
            HistoryAction::Draw { layer, before, .. } => {
                restore_raster(store, *layer, before);
                let _ = store.set_active(*layer);
            }
            HistoryAction::LayerAdd { layer, .. } => {
                store.remove_unchecked(layer.id);
            }
            HistoryAction::LayerDelete {
                layer,
                index,
                raster,
            } => {
                store.insert_at(*index, layer.clone(), raster.clone());
            }
            HistoryAction::LayerReorder { before, .. } => {
                store.apply_order(before);
            }
            HistoryAction::LayerMerge {
                top,
                top_index,
                top_raster,
                bottom,
                bottom_before,
                ..
            } => {
                restore_raster(store, *bottom, bottom_before);
                store.insert_at(*top_index, top.clone(), top_raster.clone());
            }
            HistoryAction::LayerDuplicate { layer, .. } => {
                store.remove_unchecked(layer.id);
            }
        }
    }

    /// Redo this action against the document.
    pub fn apply(&self, store: &mut LayerStore) {
        match self {
            HistoryAction::Draw { layer, after, .. } => {
                restore_raster(store, *layer, after);
                let _ = store.set_active(*layer);
            }
            HistoryAction::LayerAdd { layer, index } => {
                let blank = Raster::new(store.width(), store.height());
                store.insert_at(*index, layer.clone(), blank);
            }
            HistoryAction::LayerDelete { layer, .. } => {
                store.remove_unchecked(layer.id);
            }
            HistoryAction::LayerReorder { after, .. } => {
                store.apply_order(after);
            }
            HistoryAction::LayerMerge {
                top,
                bottom,
                bottom_after,
                ..
            } => {
                store.remove_unchecked(top.id);
                restore_raster(store, *bottom, bottom_after);
            }
            HistoryAction::LayerDuplicate {
                layer,
                index,
                raster,
            } => {
                store.insert_at(*index, layer.clone(), raster.clone());
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            HistoryAction::Draw { .. } => "draw",
            HistoryAction::LayerAdd { .. } => "layer-add",
            HistoryAction::LayerDelete { .. } => "layer-delete",
            HistoryAction::LayerReorder { .. } => "layer-reorder",
            HistoryAction::LayerMerge { .. } => "layer-merge",
            HistoryAction::LayerDuplicate { .. } => "layer-duplicate",
        }
    }
}

/// The capped action log. `cursor` counts actions currently applied; the
/// range `cursor..len` is the redo tail.
#[derive(Default)]
pub struct HistoryLog {
    actions: VecDeque<HistoryAction>,
    cursor: usize,
}

impl HistoryLog {
    pub const CAPACITY: usize = 30;

    pub fn new() -> Self {
        Self::default()
    }

    /// The single append primitive: drop the redo tail, push, evict the
    /// oldest action past capacity.
    pub fn push(&mut self, action: HistoryAction) {
        debug!("history push: {}", action.kind());
        self.actions.truncate(self.cursor);
        self.actions.push_back(action);
        if self.actions.len() > Self::CAPACITY {
            self.actions.pop_front();
        }
        self.cursor = (self.cursor + 1).min(Self::CAPACITY);
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.actions.len()
    }

    /// Step the cursor back and revert that action. Returns whether anything
    /// happened.
    pub fn undo(&mut self, store: &mut LayerStore) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        if let Some(action) = self.actions.get(self.cursor) {
            action.revert(store);
        }
        true
    }

    /// Re-apply the action under the cursor and step forward.
    pub fn redo(&mut self, store: &mut LayerStore) -> bool {
        match self.actions.get(self.cursor) {
            None => false,
            Some(action) => {
                action.apply(store);
                self.cursor += 1;
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.cursor = 0;
    }
}
