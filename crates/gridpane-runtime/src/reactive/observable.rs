#![forbid(unsafe_code)]

//! Shared, version-tracked cells with change notification.
//!
//! A container's grid template and measured size live in [`Observable`]
//! cells. Hosts subscribe to them to restyle the container element; the
//! gesture controller writes them after every engine mutation.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on each value-changing write.
//! 2. Writing a value equal to the current one is a no-op.
//! 3. Subscribers are called in registration order.
//! 4. Subscribers whose [`Subscription`] was dropped are never called again
//!    and are pruned on the next notification.
//!
//! # Failure Modes
//!
//! Writing the same cell from inside one of its own subscribers is allowed:
//! the borrow is released before callbacks run, so the nested write
//! notifies again with the newer value.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info_span};
use web_time::Instant;

use super::batch;

type Callback<T> = Rc<dyn Fn(&T)>;
type WeakCallback<T> = Weak<dyn Fn(&T)>;

struct Cell<T> {
    value: T,
    version: u64,
    subscribers: Vec<WeakCallback<T>>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Clones are handles to the same cell.
pub struct Observable<T> {
    cell: Rc<RefCell<Cell<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cell = self.cell.borrow();
        f.debug_struct("Observable")
            .field("value", &cell.value)
            .field("version", &cell.version)
            .field("subscribers", &cell.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// A cell at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(Cell {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.cell.borrow().value.clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow().value)
    }

    /// Store `value`; notifies only when it differs from the current value.
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut cell = self.cell.borrow_mut();
            if cell.value == value {
                return false;
            }
            cell.value = value;
            cell.version += 1;
        }
        self.notify();
        true
    }

    /// Mutate in place. Notifies only when the result differs from the
    /// previous value. Returns whether the value changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        {
            let mut cell = self.cell.borrow_mut();
            let previous = cell.value.clone();
            f(&mut cell.value);
            if cell.value == previous {
                return false;
            }
            cell.version += 1;
        }
        self.notify();
        true
    }

    /// Register `callback` for future changes. It stays registered for as
    /// long as the returned guard lives.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Callback<T> = Rc::new(callback);
        self.cell
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.cell.borrow().version
    }

    /// Registered subscribers, dropped ones included until the next prune.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.cell.borrow().subscribers.len()
    }

    /// Inside a [`BatchScope`](super::BatchScope) each callback is queued
    /// once and later fires with the value current at flush time.
    fn notify(&self) {
        let callbacks: Vec<Callback<T>> = {
            let mut cell = self.cell.borrow_mut();
            cell.subscribers.retain(|weak| weak.strong_count() > 0);
            cell.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        if callbacks.is_empty() {
            return;
        }

        if batch::is_batching() {
            batch::record_changes(1);
            for callback in callbacks {
                let key = Rc::as_ptr(&callback) as *const () as usize;
                let source = self.clone();
                batch::defer_or_run_keyed(key, move || {
                    let latest = source.get();
                    callback(&latest);
                });
            }
            return;
        }

        let value = self.get();
        let subscribers = callbacks.len() as u64;
        let started = Instant::now();
        let span = info_span!(
            "gridpane.propagate",
            changes = 1_u64,
            subscribers_notified = subscribers,
            duration_us = tracing::field::Empty
        );
        let _entered = span.enter();
        for callback in &callbacks {
            callback(&value);
        }
        let duration_us = started.elapsed().as_micros() as u64;
        span.record("duration_us", duration_us);
        debug!(message = "gridpane.propagate.done", duration_us, subscribers);
    }
}

/// Keeps a subscriber callback alive; dropping it unsubscribes.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
