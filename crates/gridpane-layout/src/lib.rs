#![forbid(unsafe_code)]

//! Resizable split-pane layout engine.
//!
//! # Role in gridpane
//! `gridpane-layout` is the arithmetic core. It knows nothing about DOM
//! nodes or pointer events: it holds one container's tracks, turns handle
//! drags into per-pane offsets while respecting every pane's bounds, and
//! renders the result as a CSS grid-template value.
//!
//! # Modules
//! - [`unit`]: size tokens (`fr`, `px`, `%`) and pixel resolution.
//! - [`registry`]: arena of mounted panes and handles.
//! - [`offset`]: per-pane drag offsets in native units.
//! - [`engine`]: pixels-per-fraction, neighbor lookup, bounded drags.
//! - [`template`]: grid-template generation.
//! - [`config`]: declarative layouts loaded from TOML or JSON.

pub mod config;
pub mod engine;
pub mod offset;
pub mod registry;
pub mod template;
pub mod unit;

use std::fmt;

pub use config::{ChildSpec, LayoutConfigError, LayoutSpec, LayoutTree};
pub use engine::{DragOutcome, NeighborSide, ResizeEngine, TopologyDiagnostic};
pub use gridpane_core::Axis;
pub use offset::OffsetStore;
pub use registry::{NodeId, NodeRole, PaneRegistry};
pub use template::{grid_template, grid_template_property, track_token};
pub use unit::{Length, Size, SizeParseError, SizeSpec, SizeUnit};

/// Errors raised while declaring or mutating a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    ZeroNodeId,
    NodeIdOverflow { current: NodeId },
    UnknownNode { node_id: NodeId },
    /// Fractional tracks cannot carry `min`/`max`.
    BoundedFraction { size: String },
    /// `min` exceeds `max` in the same unit.
    InvertedBounds { min: String, max: String },
    Parse(SizeParseError),
}

impl From<SizeParseError> for LayoutError {
    fn from(err: SizeParseError) -> Self {
        Self::Parse(err)
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroNodeId => write!(f, "node id 0 is invalid"),
            Self::NodeIdOverflow { current } => write!(f, "node id overflow after {current}"),
            Self::UnknownNode { node_id } => write!(f, "node {node_id} is not registered"),
            Self::BoundedFraction { size } => write!(
                f,
                "fractional size {size} cannot have min/max bounds; use a px or % size"
            ),
            Self::InvertedBounds { min, max } => {
                write!(f, "min bound {min} is larger than max bound {max}")
            }
            Self::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}
