#![forbid(unsafe_code)]

//! Single-threaded reactive plumbing for gridpane surfaces.
//!
//! - [`reactive`]: version-tracked observable cells and batch scopes that
//!   coalesce notifications, so one pointer event yields one template
//!   recomputation.
//! - [`lazy`]: children that may be supplied as deferred producers and are
//!   resolved to concrete values before mounting.

pub mod lazy;
pub mod reactive;

pub use lazy::{Lazy, LazyError, MAX_LAZY_DEPTH, resolve_all};
pub use reactive::{BatchScope, Observable, Subscription};
