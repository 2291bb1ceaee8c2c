#![forbid(unsafe_code)]

//! Host-facing surface for gridpane split panes.
//!
//! A [`Container`] owns one [`ResizeEngine`](gridpane_layout::ResizeEngine)
//! and publishes its grid template through an observable cell. [`Pane`] and
//! [`Handle`] guards are mounted into a container explicitly and unmount
//! themselves on drop. A [`DragGesture`] turns host pointer lifecycle
//! signals into bounded drags, carrying clamped motion over to the next
//! pointer move.
//!
//! The embedding host is responsible for:
//! - feeding measured container sizes through [`Container::observe_size`];
//! - applying [`Container::style`] (or subscribing to the template);
//! - forwarding pointer events and executing the returned
//!   [`CaptureCommand`]s (`setPointerCapture` / `releasePointerCapture`).

pub mod container;
pub mod gesture;
pub mod pane;

use std::fmt;

use gridpane_layout::LayoutError;
use gridpane_runtime::LazyError;

pub use container::{ActivePair, Container, ContainerProps, LayoutSurface};
pub use gesture::{
    CaptureCommand, DragConfig, DragGesture, GestureDispatch, GestureLogEntry, GestureOutcome,
    GesturePhase, IgnoredReason,
};
pub use pane::{ChildNode, Handle, HandleProps, MountedChild, Pane, PaneProps};

/// Errors raised while building or mutating a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// A declaration was rejected by the layout engine.
    Layout(LayoutError),
    /// A lazily supplied child never resolved.
    Lazy(LazyError),
    /// The pane or handle outlived its container.
    ContainerDropped,
    /// The engine is borrowed, typically from inside
    /// [`Container::with_engine`].
    EngineBusy,
}

impl From<LayoutError> for SurfaceError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<LazyError> for SurfaceError {
    fn from(err: LazyError) -> Self {
        Self::Lazy(err)
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "invalid layout: {err}"),
            Self::Lazy(err) => write!(f, "unresolved child: {err}"),
            Self::ContainerDropped => write!(f, "the owning container no longer exists"),
            Self::EngineBusy => write!(f, "the layout engine is borrowed"),
        }
    }
}

impl std::error::Error for SurfaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            Self::Lazy(err) => Some(err),
            Self::ContainerDropped | Self::EngineBusy => None,
        }
    }
}
