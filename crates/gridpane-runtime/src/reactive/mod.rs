#![forbid(unsafe_code)]

//! Observable cells and notification batching.

pub mod batch;
pub mod observable;

pub use batch::BatchScope;
pub use observable::{Observable, Subscription};
