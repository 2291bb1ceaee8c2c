#![forbid(unsafe_code)]

//! Core: split axis, pointer primitives, and the logging facade.
//!
//! # Role in gridpane
//! `gridpane-core` is the bottom layer. It owns the small value types shared
//! by the resize engine (`gridpane-layout`) and the host-facing surface
//! (`gridpane-web`), plus a thin wrapper over `tracing` so every crate logs
//! diagnostics the same way.
//!
//! # Primary responsibilities
//! - **Axis**: which box dimension a container splits (width or height).
//! - **Pointer primitives**: positions and buttons reported by the host.
//! - **Logging**: tracing macro re-exports and optional subscriber setup.

pub mod geometry;
pub mod logging;

pub use geometry::{Axis, PointerButton, PointerPosition};

// Re-export tracing macros at crate root for ergonomic use.
pub use logging::{debug, trace, warn};
