#![forbid(unsafe_code)]

//! Resize engine: turns handle drags into per-pane offsets.
//!
//! # Model
//!
//! A container holds an ordered list of tracks (panes and handles). Each
//! track's effective size is its declared base minus its offset:
//!
//! - non-fractional track: `resolve(base) - offset`, in pixels;
//! - fractional track: `(value - offset) * pixels_per_fraction()`.
//!
//! The fractional tracks share whatever the non-fractional tracks leave of
//! the container, exactly as a CSS grid distributes `fr` tracks.
//!
//! # Invariants
//!
//! 1. A drag moves space between the two panes around a handle; the sum of
//!    all track sizes is unchanged (whenever the fractional tracks fill the
//!    leftover space, i.e. their factors sum to at least 1).
//! 2. A bounded pane never leaves `[max(min, 0), max]` because of a drag.
//! 3. No fractional pane's effective value goes below zero.
//! 4. A zero delta never mutates offsets.
//!
//! # Failure Modes
//!
//! Topology anomalies (edge handles, missing neighbors, unknown IDs) never
//! panic. They are logged as `warn` events and reported back through
//! [`DragOutcome::diagnostic`]; every other handle keeps working.

use std::fmt;

use gridpane_core::{Axis, debug, trace, warn};

use crate::LayoutError;
use crate::offset::OffsetStore;
use crate::registry::{NodeId, NodeRole, PaneRegistry};
use crate::unit::{Size, SizeSpec};

/// Residual overflow below this many pixels is treated as fully absorbed.
pub const OVERFLOW_EPSILON_PX: f64 = 1e-9;

/// Which neighbor of a handle could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborSide {
    Before,
    After,
}

/// Non-fatal topology anomaly encountered while resolving a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyDiagnostic {
    /// The ID is not registered in this container.
    UnknownNode { node_id: NodeId },
    /// A drag was requested on a node that is not a handle.
    NotAHandle { node_id: NodeId },
    /// A pane pair was requested but one side is not a pane.
    NotAPane { node_id: NodeId },
    /// The handle is registered but not placed in the child order.
    Detached { handle: NodeId },
    /// The handle sits first or last among the children and is inert.
    EdgeHandle { handle: NodeId, position: usize },
    /// No pane exists on one side of the handle.
    MissingNeighbor { handle: NodeId, side: NeighborSide },
}

impl TopologyDiagnostic {
    /// Stable diagnostic key used as the log message.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownNode { .. } => "gridpane.node.unknown",
            Self::NotAHandle { .. } => "gridpane.node.not_a_handle",
            Self::NotAPane { .. } => "gridpane.node.not_a_pane",
            Self::Detached { .. } => "gridpane.handle.detached",
            Self::EdgeHandle { .. } => "gridpane.handle.inert",
            Self::MissingNeighbor { .. } => "gridpane.handle.missing_neighbor",
        }
    }
}

impl fmt::Display for TopologyDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node_id } => write!(f, "node {node_id} is not registered"),
            Self::NotAHandle { node_id } => write!(f, "node {node_id} is not a handle"),
            Self::NotAPane { node_id } => write!(f, "node {node_id} is not a pane"),
            Self::Detached { handle } => {
                write!(f, "handle {handle} is not placed among the container's children")
            }
            Self::EdgeHandle { handle, position } => write!(
                f,
                "handle {handle} at child position {position} is at the edge and has no pane pair"
            ),
            Self::MissingNeighbor { handle, side } => {
                write!(f, "handle {handle} has no pane {side:?} it")
            }
        }
    }
}

/// Result of one drag step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragOutcome {
    /// Delta the caller asked for, in pixels.
    pub requested: f64,
    /// Delta actually moved from the right neighbor to the left one.
    pub applied: f64,
    /// `requested - applied`: motion that hit a bound and was not applied.
    pub overflow: f64,
    /// Set when the drag degraded to a no-op because of a topology anomaly.
    pub diagnostic: Option<TopologyDiagnostic>,
}

impl DragOutcome {
    /// Nothing requested, nothing applied.
    pub const NONE: Self = Self {
        requested: 0.0,
        applied: 0.0,
        overflow: 0.0,
        diagnostic: None,
    };

    fn rejected(requested: f64, diagnostic: TopologyDiagnostic) -> Self {
        Self {
            requested,
            applied: 0.0,
            overflow: 0.0,
            diagnostic: Some(diagnostic),
        }
    }

    /// True when part of the requested motion was not applied.
    #[must_use]
    pub fn is_clamped(&self) -> bool {
        self.overflow != 0.0
    }
}

/// Layout state of one container: its tracks, their offsets, and the
/// measured container size along the split axis.
///
/// Nested containers each own an independent engine.
#[derive(Debug, Clone)]
pub struct ResizeEngine {
    axis: Axis,
    container_px: f64,
    registry: PaneRegistry,
    offsets: OffsetStore,
    order: Vec<NodeId>,
}

impl ResizeEngine {
    /// An empty engine with a zero-sized container.
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            container_px: 0.0,
            registry: PaneRegistry::new(),
            offsets: OffsetStore::new(),
            order: Vec::new(),
        }
    }

    /// Set the initial container size.
    #[must_use]
    pub fn with_container_size(mut self, px: f64) -> Self {
        self.set_container_size(px);
        self
    }

    #[must_use]
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    #[must_use]
    pub const fn container_size(&self) -> f64 {
        self.container_px
    }

    /// Feed a measured container size. Non-finite or negative sizes are
    /// treated as zero. Returns whether the stored size changed.
    pub fn set_container_size(&mut self, px: f64) -> bool {
        let px = if px.is_finite() { px.max(0.0) } else { 0.0 };
        if px == self.container_px {
            return false;
        }
        self.container_px = px;
        true
    }

    #[must_use]
    pub const fn registry(&self) -> &PaneRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn offsets(&self) -> &OffsetStore {
        &self.offsets
    }

    /// Tracks in child order.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Mount a pane at the end of the child order.
    pub fn mount_pane(&mut self, spec: SizeSpec) -> Result<NodeId, LayoutError> {
        self.mount(NodeRole::Pane, spec)
    }

    /// Mount a handle at the end of the child order.
    pub fn mount_handle(&mut self, spec: SizeSpec) -> Result<NodeId, LayoutError> {
        self.mount(NodeRole::Handle, spec)
    }

    fn mount(&mut self, role: NodeRole, spec: SizeSpec) -> Result<NodeId, LayoutError> {
        let id = self.registry.register(role, spec)?;
        self.order.push(id);
        trace!(message = "gridpane.node.mounted", node = id.get(), ?role);
        Ok(id)
    }

    /// Drop every trace of an unmounted node. Returns false if it was unknown.
    pub fn unmount(&mut self, id: NodeId) -> bool {
        let Some(role) = self.registry.remove(id) else {
            return false;
        };
        self.offsets.remove(id);
        self.order.retain(|node| *node != id);
        trace!(message = "gridpane.node.unmounted", node = id.get(), ?role);
        true
    }

    /// Replace the child order. Unregistered IDs are dropped.
    pub fn set_order(&mut self, children: impl IntoIterator<Item = NodeId>) {
        self.order = self.registry.list_panes(children);
    }

    #[must_use]
    pub fn spec(&self, id: NodeId) -> Option<&SizeSpec> {
        self.registry.lookup(id)
    }

    /// Swap a node's declaration. A changed declaration discards the pane's
    /// accumulated offset. Returns whether the declaration changed.
    pub fn set_spec(&mut self, id: NodeId, spec: SizeSpec) -> Result<bool, LayoutError> {
        let changed = self.registry.set_spec(id, spec)?;
        if changed {
            self.offsets.reset(id);
            debug!(message = "gridpane.pane.spec_changed", node = id.get(), size = %spec.size());
        }
        Ok(changed)
    }

    /// Discard all drag state.
    pub fn reset_offsets(&mut self) {
        self.offsets.clear();
    }

    // -----------------------------------------------------------------
    // Sizes
    // -----------------------------------------------------------------

    /// Effective fraction of a fractional track, `None` for anything else.
    #[must_use]
    pub fn effective_fraction(&self, id: NodeId) -> Option<f64> {
        match self.registry.lookup(id)?.size() {
            Size::Fr(value) => Some(value - self.offsets.get(id)),
            Size::Px(_) | Size::Percent(_) => None,
        }
    }

    /// Sum of effective fractions over every fractional track.
    #[must_use]
    pub fn fraction_total(&self) -> f64 {
        self.order
            .iter()
            .filter_map(|id| self.effective_fraction(*id))
            .map(|fr| fr.max(0.0))
            .sum()
    }

    /// Rendered size of a non-fractional track: `base - offset` clamped to
    /// the declared bounds, the same way the `min()`/`max()` wrapping of its
    /// template token resolves.
    fn non_fraction_px(&self, id: NodeId, spec: &SizeSpec) -> f64 {
        let (lo, hi) = spec.pixel_range(self.container_px);
        self.raw_non_fraction_px(id, spec.size()).clamp(lo, hi)
    }

    fn raw_non_fraction_px(&self, id: NodeId, size: Size) -> f64 {
        let offset = self.offsets.get(id);
        match size {
            Size::Px(value) => value - offset,
            Size::Percent(value) => self.percent_to_px(value - offset),
            Size::Fr(_) => 0.0,
        }
    }

    fn percent_to_px(&self, points: f64) -> f64 {
        self.container_px / 100.0 * points
    }

    fn px_to_percent(&self, px: f64) -> f64 {
        if self.container_px > 0.0 {
            px * 100.0 / self.container_px
        } else {
            0.0
        }
    }

    /// Current pixel value of one fraction unit.
    ///
    /// `(container - non-fractional tracks) / sum(fractions)`, recomputed on
    /// every call. A factor sum below 1 does not fill the leftover space
    /// (CSS grid rule), so the divisor never drops below 1. Zero when there
    /// are no fractional tracks or no space is left.
    #[must_use]
    pub fn pixels_per_fraction(&self) -> f64 {
        let total = self.fraction_total();
        if total <= 0.0 {
            return 0.0;
        }
        let fixed: f64 = self
            .order
            .iter()
            .filter_map(|id| {
                let spec = self.registry.lookup(*id)?;
                (!spec.is_fraction()).then(|| self.non_fraction_px(*id, spec))
            })
            .sum();
        let leftover = (self.container_px - fixed).max(0.0);
        leftover / total.max(1.0)
    }

    /// Effective pixel size of a track, `None` if the ID is unknown.
    #[must_use]
    pub fn track_px(&self, id: NodeId) -> Option<f64> {
        let spec = self.registry.lookup(id)?;
        Some(if spec.is_fraction() {
            self.effective_fraction(id).unwrap_or(0.0).max(0.0) * self.pixels_per_fraction()
        } else {
            self.non_fraction_px(id, spec)
        })
    }

    /// Pixel size of the whole fractional pool.
    #[must_use]
    pub fn fraction_pool_px(&self) -> f64 {
        self.fraction_total() * self.pixels_per_fraction()
    }

    /// Sum of every placed track's pixel size.
    #[must_use]
    pub fn total_track_px(&self) -> f64 {
        self.order.iter().filter_map(|id| self.track_px(*id)).sum()
    }

    // -----------------------------------------------------------------
    // Dragging
    // -----------------------------------------------------------------

    /// Resolve the pane pair a handle resizes.
    ///
    /// Neighbors are the nearest panes before and after the handle in child
    /// order; handles in between are skipped, so adjacent handles share a
    /// pair.
    pub fn neighbors(&self, handle: NodeId) -> Result<(NodeId, NodeId), TopologyDiagnostic> {
        match self.registry.role(handle) {
            None => return Err(TopologyDiagnostic::UnknownNode { node_id: handle }),
            Some(NodeRole::Pane) => return Err(TopologyDiagnostic::NotAHandle { node_id: handle }),
            Some(NodeRole::Handle) => {}
        }
        let Some(position) = self.order.iter().position(|id| *id == handle) else {
            return Err(TopologyDiagnostic::Detached { handle });
        };
        if position == 0 || position + 1 == self.order.len() {
            return Err(TopologyDiagnostic::EdgeHandle { handle, position });
        }
        let before = self.order[..position]
            .iter()
            .rev()
            .find(|id| self.registry.is_pane(**id))
            .copied()
            .ok_or(TopologyDiagnostic::MissingNeighbor {
                handle,
                side: NeighborSide::Before,
            })?;
        let after = self.order[position + 1..]
            .iter()
            .find(|id| self.registry.is_pane(**id))
            .copied()
            .ok_or(TopologyDiagnostic::MissingNeighbor {
                handle,
                side: NeighborSide::After,
            })?;
        Ok((before, after))
    }

    /// Drag a handle by `delta_px` along the axis. Positive deltas grow the
    /// pane before the handle and shrink the one after it.
    pub fn drag_handle(&mut self, handle: NodeId, delta_px: f64) -> DragOutcome {
        if delta_px == 0.0 || !delta_px.is_finite() {
            return DragOutcome::NONE;
        }
        match self.neighbors(handle) {
            Ok((left, right)) => self.drag_pair(left, right, delta_px),
            Err(diagnostic) => {
                warn!(
                    message = diagnostic.code(),
                    handle = handle.get(),
                    detail = %diagnostic
                );
                DragOutcome::rejected(delta_px, diagnostic)
            }
        }
    }

    /// Move `delta_px` of space from `right` to `left`, honoring both panes'
    /// bounds. Whatever cannot be applied is returned as overflow.
    pub fn drag_pair(&mut self, left: NodeId, right: NodeId, delta_px: f64) -> DragOutcome {
        if delta_px == 0.0 || !delta_px.is_finite() {
            return DragOutcome::NONE;
        }
        let (left_spec, right_spec) = match (self.pane_spec(left), self.pane_spec(right)) {
            (Ok(l), Ok(r)) => (l, r),
            (Err(diagnostic), _) | (_, Err(diagnostic)) => {
                warn!(message = diagnostic.code(), detail = %diagnostic);
                return DragOutcome::rejected(delta_px, diagnostic);
            }
        };

        let mixed = left_spec.is_fraction() != right_spec.is_fraction();
        let (left_lo, left_hi) = self.growth_range(left, &left_spec, mixed);
        let (right_lo, right_hi) = self.growth_range(right, &right_spec, mixed);
        // The left pane grows by `d`, the right one by `-d`.
        let lower = left_lo.max(-right_hi);
        let upper = left_hi.min(-right_lo);
        let applied = if delta_px > 0.0 {
            delta_px.min(upper).max(0.0)
        } else {
            delta_px.max(lower).min(0.0)
        };
        let mut overflow = delta_px - applied;
        if overflow.abs() < OVERFLOW_EPSILON_PX {
            overflow = 0.0;
        }

        if applied != 0.0 {
            match (left_spec.is_fraction(), right_spec.is_fraction()) {
                (true, true) => self.shift_fraction_pair(left, right, applied),
                (false, false) => {
                    self.grow_non_fraction(left, &left_spec, applied);
                    self.grow_non_fraction(right, &right_spec, -applied);
                }
                (false, true) => {
                    self.grow_non_fraction(left, &left_spec, applied);
                    trace!(message = "gridpane.drag.pool_absorbed", pool_delta = -applied);
                }
                (true, false) => {
                    self.grow_non_fraction(right, &right_spec, -applied);
                    trace!(message = "gridpane.drag.pool_absorbed", pool_delta = applied);
                }
            }
        }

        if overflow != 0.0 {
            debug!(
                message = "gridpane.drag.clamped",
                left = left.get(),
                right = right.get(),
                requested = delta_px,
                applied,
                overflow
            );
        }

        DragOutcome {
            requested: delta_px,
            applied,
            overflow,
            diagnostic: None,
        }
    }

    fn pane_spec(&self, id: NodeId) -> Result<SizeSpec, TopologyDiagnostic> {
        match self.registry.role(id) {
            None => Err(TopologyDiagnostic::UnknownNode { node_id: id }),
            Some(NodeRole::Handle) => Err(TopologyDiagnostic::NotAPane { node_id: id }),
            Some(NodeRole::Pane) => self
                .registry
                .lookup(id)
                .copied()
                .ok_or(TopologyDiagnostic::UnknownNode { node_id: id }),
        }
    }

    /// Interval of pixel growth a pane accepts from its current size.
    ///
    /// A fractional pane paired with a non-fractional one absorbs the change
    /// through the whole fraction pool (leftover space is redistributed over
    /// every `fr` track in proportion to its size), so it may shrink by at
    /// most the pool's size.
    fn growth_range(&self, id: NodeId, spec: &SizeSpec, mixed: bool) -> (f64, f64) {
        let size = spec.size();
        if size.is_fraction() {
            let shrinkable = if mixed {
                self.fraction_pool_px()
            } else {
                self.track_px(id).unwrap_or(0.0)
            };
            return (-shrinkable, f64::INFINITY);
        }
        // Percentages have no pixel extent to move in an unmeasured container.
        if matches!(size, Size::Percent(_)) && self.container_px <= 0.0 {
            return (0.0, 0.0);
        }
        let current = self.non_fraction_px(id, spec);
        let (lo, hi) = spec.pixel_range(self.container_px);
        (lo - current, hi - current)
    }

    fn grow_non_fraction(&mut self, id: NodeId, spec: &SizeSpec, grow_px: f64) {
        let size = spec.size();
        let current = self.non_fraction_px(id, spec);
        if self.raw_non_fraction_px(id, size) == current {
            let native = match size {
                Size::Px(_) => grow_px,
                Size::Percent(_) => self.px_to_percent(grow_px),
                Size::Fr(_) => return,
            };
            self.offsets.add(id, -native);
            return;
        }
        // The track sits past a bound: whatever went beyond it is absorbed
        // and growth restarts from the clamped size.
        let target = current + grow_px;
        let offset = match size {
            Size::Px(value) => value - target,
            Size::Percent(value) => value - self.px_to_percent(target),
            Size::Fr(_) => return,
        };
        self.offsets.set(id, offset);
        trace!(message = "gridpane.drag.offset_rebased", node = id.get(), offset);
    }

    fn shift_fraction_pair(&mut self, grow: NodeId, shrink: NodeId, grow_px: f64) {
        let ppf = self.pixels_per_fraction();
        if ppf <= 0.0 {
            return;
        }
        let delta_fr = grow_px / ppf;
        self.offsets.add(grow, -delta_fr);
        self.offsets.add(shrink, delta_fr);
        // Rounding must not leave a pane at a tiny negative fraction.
        for id in [grow, shrink] {
            if let Some(Size::Fr(value)) = self.registry.lookup(id).map(SizeSpec::size)
                && value - self.offsets.get(id) < 0.0
            {
                self.offsets.set(id, value);
            }
        }
    }
}
