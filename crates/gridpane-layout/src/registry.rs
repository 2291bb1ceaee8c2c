#![forbid(unsafe_code)]

//! Pane registry: an arena of mounted panes and handles.
//!
//! Every mounted child gets a [`NodeId`] allocated from a monotonic counter.
//! IDs are never reused, so a stale ID held by a host after unmount simply
//! stops resolving instead of aliasing a newer node. Removing an entry drops
//! everything the registry knew about the node.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::LayoutError;
use crate::unit::SizeSpec;

/// Stable identifier for a mounted pane or handle.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Lowest valid node ID.
    pub const MIN: Self = Self(1);

    /// Create a node ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, LayoutError> {
        if raw == 0 {
            return Err(LayoutError::ZeroNodeId);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, LayoutError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(LayoutError::NodeIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a registered child is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// A resizable panel.
    Pane,
    /// A drag handle; its size only sizes its own track.
    Handle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NodeEntry {
    role: NodeRole,
    spec: SizeSpec,
}

/// Arena mapping node IDs to their role and size declaration.
#[derive(Debug, Clone)]
pub struct PaneRegistry {
    entries: FxHashMap<NodeId, NodeEntry>,
    next_id: NodeId,
}

impl Default for PaneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PaneRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            next_id: NodeId::MIN,
        }
    }

    /// Register a child and return its freshly allocated ID.
    pub fn register(&mut self, role: NodeRole, spec: SizeSpec) -> Result<NodeId, LayoutError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        self.entries.insert(id, NodeEntry { role, spec });
        Ok(id)
    }

    pub fn register_pane(&mut self, spec: SizeSpec) -> Result<NodeId, LayoutError> {
        self.register(NodeRole::Pane, spec)
    }

    pub fn register_handle(&mut self, spec: SizeSpec) -> Result<NodeId, LayoutError> {
        self.register(NodeRole::Handle, spec)
    }

    /// Size declaration of a registered node.
    #[must_use]
    pub fn lookup(&self, id: NodeId) -> Option<&SizeSpec> {
        self.entries.get(&id).map(|entry| &entry.spec)
    }

    #[must_use]
    pub fn role(&self, id: NodeId) -> Option<NodeRole> {
        self.entries.get(&id).map(|entry| entry.role)
    }

    #[must_use]
    pub fn is_handle(&self, id: NodeId) -> bool {
        self.role(id) == Some(NodeRole::Handle)
    }

    #[must_use]
    pub fn is_pane(&self, id: NodeId) -> bool {
        self.role(id) == Some(NodeRole::Pane)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Replace a node's declaration.
    ///
    /// Returns `Ok(true)` when the stored spec actually changed.
    pub fn set_spec(&mut self, id: NodeId, spec: SizeSpec) -> Result<bool, LayoutError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(LayoutError::UnknownNode { node_id: id })?;
        if entry.spec == spec {
            return Ok(false);
        }
        entry.spec = spec;
        Ok(true)
    }

    /// Drop a node on unmount. Returns its role if it was registered.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeRole> {
        self.entries.remove(&id).map(|entry| entry.role)
    }

    /// Filter a raw child sequence down to registered panes and handles,
    /// preserving order. Unknown or unmounted IDs do not take part in layout.
    #[must_use]
    pub fn list_panes(&self, children: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        children
            .into_iter()
            .filter(|id| self.entries.contains_key(id))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Size;

    #[test]
    fn zero_id_is_rejected() {
        assert_eq!(NodeId::new(0), Err(LayoutError::ZeroNodeId));
        assert_eq!(NodeId::new(7).map(NodeId::get), Ok(7));
    }

    #[test]
    fn id_overflow_is_reported() {
        let last = NodeId::new(u64::MAX).expect("non-zero");
        assert_eq!(
            last.checked_next(),
            Err(LayoutError::NodeIdOverflow { current: last })
        );
    }

    #[test]
    fn register_allocates_distinct_ids() {
        let mut registry = PaneRegistry::new();
        let a = registry
            .register_pane(SizeSpec::new(Size::Fr(1.0)))
            .expect("register pane");
        let h = registry
            .register_handle(SizeSpec::new(Size::Px(4.0)))
            .expect("register handle");
        assert_ne!(a, h);
        assert!(registry.is_pane(a));
        assert!(registry.is_handle(h));
        assert!(!registry.is_handle(a));
        assert_eq!(registry.lookup(h), Some(&SizeSpec::new(Size::Px(4.0))));
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut registry = PaneRegistry::new();
        let a = registry.register_pane(SizeSpec::default()).expect("a");
        assert_eq!(registry.remove(a), Some(NodeRole::Pane));
        let b = registry.register_pane(SizeSpec::default()).expect("b");
        assert_ne!(a, b);
        assert_eq!(registry.lookup(a), None);
        assert_eq!(registry.remove(a), None);
    }

    #[test]
    fn list_panes_drops_unregistered_children() {
        let mut registry = PaneRegistry::new();
        let a = registry.register_pane(SizeSpec::default()).expect("a");
        let h = registry
            .register_handle(SizeSpec::new(Size::Px(2.0)))
            .expect("h");
        let b = registry.register_pane(SizeSpec::default()).expect("b");
        let stray = NodeId::new(999).expect("non-zero");
        assert_eq!(registry.list_panes([a, stray, h, b]), vec![a, h, b]);
    }

    #[test]
    fn set_spec_reports_changes() {
        let mut registry = PaneRegistry::new();
        let a = registry.register_pane(SizeSpec::default()).expect("a");
        assert_eq!(registry.set_spec(a, SizeSpec::default()), Ok(false));
        assert_eq!(registry.set_spec(a, SizeSpec::new(Size::Px(10.0))), Ok(true));
        let gone = NodeId::new(50).expect("non-zero");
        assert_eq!(
            registry.set_spec(gone, SizeSpec::default()),
            Err(LayoutError::UnknownNode { node_id: gone })
        );
    }
}
