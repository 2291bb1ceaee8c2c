#![forbid(unsafe_code)]

//! Per-pane drag offsets.
//!
//! An offset is the cumulative drag adjustment of one pane, stored in the
//! pane's native unit: fraction units for `fr` panes, pixels for `px` panes,
//! percentage points for `%` panes. It is subtracted from the declared base:
//! `effective = base - offset`. Absent entries read as zero.

use rustc_hash::FxHashMap;

use crate::registry::NodeId;

#[derive(Debug, Clone, Default)]
pub struct OffsetStore {
    offsets: FxHashMap<NodeId, f64>,
}

impl OffsetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset of `id`, zero when none was recorded.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> f64 {
        self.offsets.get(&id).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, id: NodeId, offset: f64) {
        if offset == 0.0 {
            self.offsets.remove(&id);
        } else {
            self.offsets.insert(id, offset);
        }
    }

    pub fn add(&mut self, id: NodeId, delta: f64) {
        self.set(id, self.get(id) + delta);
    }

    /// Forget the pane's accumulated drag state.
    pub fn reset(&mut self, id: NodeId) {
        self.offsets.remove(&id);
    }

    /// Drop the entry of an unmounted pane. Returns the offset it carried.
    pub fn remove(&mut self, id: NodeId) -> Option<f64> {
        self.offsets.remove(&id)
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    /// True when no pane carries a drag adjustment.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.offsets.iter().map(|(id, offset)| (*id, *offset))
    }
}
