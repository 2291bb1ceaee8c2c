#![forbid(unsafe_code)]

//! Deferred values resolved on demand.
//!
//! Children handed to a container may be ready values or producers that
//! return further producers. [`Lazy::resolve`] forces the chain until a
//! value appears, giving up after [`MAX_LAZY_DEPTH`] steps.

use std::fmt;

use tracing::warn;

/// Longest producer chain [`Lazy::resolve`] follows.
pub const MAX_LAZY_DEPTH: usize = 64;

/// A value, or a producer of another `Lazy`.
pub enum Lazy<T> {
    Value(T),
    Thunk(Box<dyn FnOnce() -> Lazy<T>>),
}

impl<T> Lazy<T> {
    #[must_use]
    pub fn thunk(f: impl FnOnce() -> Lazy<T> + 'static) -> Self {
        Self::Thunk(Box::new(f))
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Force producers until a value appears.
    pub fn resolve(self) -> Result<T, LazyError> {
        self.resolve_within(MAX_LAZY_DEPTH)
    }

    /// Force at most `limit` producers.
    pub fn resolve_within(self, limit: usize) -> Result<T, LazyError> {
        let mut current = self;
        let mut forced = 0;
        loop {
            match current {
                Self::Value(value) => return Ok(value),
                Self::Thunk(produce) => {
                    if forced == limit {
                        warn!(message = "gridpane.lazy.depth_exceeded", limit);
                        return Err(LazyError::DepthExceeded { limit });
                    }
                    forced += 1;
                    current = produce();
                }
            }
        }
    }

    /// Apply `f` once the value is available.
    #[must_use]
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Lazy<U>
    where
        T: 'static,
    {
        match self {
            Self::Value(value) => Lazy::Value(f(value)),
            Self::Thunk(produce) => Lazy::thunk(move || produce().map(f)),
        }
    }
}

impl<T> From<T> for Lazy<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

/// Resolve every item in order. The first failure aborts the whole list.
pub fn resolve_all<T>(items: impl IntoIterator<Item = Lazy<T>>) -> Result<Vec<T>, LazyError> {
    items.into_iter().map(Lazy::resolve).collect()
}

/// Failure to reach a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyError {
    /// The producer chain was longer than the allowed depth.
    DepthExceeded { limit: usize },
}

impl fmt::Display for LazyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthExceeded { limit } => {
                write!(f, "lazy value did not resolve within {limit} steps")
            }
        }
    }
}

impl std::error::Error for LazyError {}
