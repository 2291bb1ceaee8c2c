#![forbid(unsafe_code)]

//! Notification batching for [`Observable`](super::Observable) writes.
//!
//! A drag step may touch several cells (offsets, template, measured size).
//! Inside a [`BatchScope`] the writes land immediately but subscriber calls
//! are queued; when the outermost scope drops, each queued subscriber runs
//! once with the final value.
//!
//! ```
//! use gridpane_runtime::{BatchScope, Observable};
//!
//! let template = Observable::new(String::from("1fr 1fr"));
//! {
//!     let _batch = BatchScope::new();
//!     template.set(String::from("1.2fr 0.8fr"));
//!     template.set(String::from("1.4fr 0.6fr"));
//!     assert_eq!(template.get(), "1.4fr 0.6fr");
//! } // subscribers see "1.4fr 0.6fr" once
//! ```
//!
//! # Invariants
//!
//! 1. Only the outermost scope flushes.
//! 2. Reads inside a batch observe the latest write.
//! 3. Flush order is first-enqueue order; a re-queued callback keeps its slot.
//!
//! # Failure Modes
//!
//! A panicking callback does not stop the flush: the remaining callbacks
//! run and the first panic is resumed afterwards.

use std::cell::RefCell;

use tracing::{debug, info_span};
use web_time::Instant;

type Deferred = Box<dyn FnOnce()>;

struct Queued {
    key: Option<usize>,
    run: Deferred,
}

struct BatchState {
    depth: u32,
    queue: Vec<Queued>,
    changes: u64,
}

thread_local! {
    static BATCH: RefCell<Option<BatchState>> = const { RefCell::new(None) };
}

/// Whether a batch scope is open on this thread.
pub fn is_batching() -> bool {
    BATCH.with(|batch| batch.borrow().is_some())
}

/// Queue `f` in the open batch, or run it now when none is open.
/// Returns whether it was queued.
pub fn defer_or_run(f: impl FnOnce() + 'static) -> bool {
    enqueue(None, Box::new(f))
}

/// Like [`defer_or_run`], but a later call with the same `key` replaces the
/// queued closure in place.
pub fn defer_or_run_keyed(key: usize, f: impl FnOnce() + 'static) -> bool {
    enqueue(Some(key), Box::new(f))
}

fn enqueue(key: Option<usize>, run: Deferred) -> bool {
    let immediate = BATCH.with(|batch| {
        let mut guard = batch.borrow_mut();
        let Some(state) = guard.as_mut() else {
            return Some(run);
        };
        match key.and_then(|key| state.queue.iter_mut().find(|q| q.key == Some(key))) {
            Some(slot) => slot.run = run,
            None => state.queue.push(Queued { key, run }),
        }
        None
    });
    match immediate {
        Some(run) => {
            run();
            false
        }
        None => true,
    }
}

/// Count source writes coalesced into the open batch.
pub fn record_changes(count: u64) {
    BATCH.with(|batch| {
        if let Some(state) = batch.borrow_mut().as_mut() {
            state.changes = state.changes.saturating_add(count);
        }
    });
}

/// Run every queued callback. Returns the first panic payload, if any.
fn flush() -> Option<Box<dyn std::any::Any + Send>> {
    let (changes, queue) = BATCH.with(|batch| {
        batch.borrow_mut().as_mut().map_or((0, Vec::new()), |state| {
            (
                std::mem::take(&mut state.changes),
                std::mem::take(&mut state.queue),
            )
        })
    });
    if queue.is_empty() {
        return None;
    }

    let subscribers = queue.len() as u64;
    let started = Instant::now();
    let span = info_span!(
        "gridpane.propagate",
        changes,
        subscribers_notified = subscribers,
        duration_us = tracing::field::Empty
    );
    let _entered = span.enter();

    let mut first_panic = None;
    for queued in queue {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(queued.run));
        if let Err(payload) = result
            && first_panic.is_none()
        {
            first_panic = Some(payload);
        }
    }

    let duration_us = started.elapsed().as_micros() as u64;
    span.record("duration_us", duration_us);
    debug!(
        message = "gridpane.propagate.flushed",
        duration_us,
        changes,
        subscribers
    );

    first_panic
}

/// Guard that holds notifications until it (the outermost one) drops.
pub struct BatchScope {
    is_root: bool,
}

impl BatchScope {
    #[must_use]
    pub fn new() -> Self {
        let is_root = BATCH.with(|batch| {
            let mut guard = batch.borrow_mut();
            match guard.as_mut() {
                Some(state) => {
                    state.depth += 1;
                    false
                }
                None => {
                    *guard = Some(BatchState {
                        depth: 1,
                        queue: Vec::new(),
                        changes: 0,
                    });
                    true
                }
            }
        });
        Self { is_root }
    }

    /// Whether this scope will flush when dropped.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Callbacks queued in the open batch.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        BATCH.with(|batch| batch.borrow().as_ref().map_or(0, |state| state.queue.len()))
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = BATCH.with(|batch| {
            batch.borrow_mut().as_mut().is_some_and(|state| {
                state.depth -= 1;
                state.depth == 0
            })
        });
        if outermost {
            // Writes made by callbacks during a flush are queued again.
            let mut first_panic = None;
            loop {
                let panic = flush();
                if first_panic.is_none() {
                    first_panic = panic;
                }
                let drained = BATCH.with(|batch| {
                    batch
                        .borrow()
                        .as_ref()
                        .is_none_or(|state| state.queue.is_empty())
                });
                if drained {
                    break;
                }
            }
            BATCH.with(|batch| *batch.borrow_mut() = None);
            if let Some(payload) = first_panic {
                std::panic::resume_unwind(payload);
            }
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("is_root", &self.is_root)
            .field("pending", &self.pending_count())
            .finish()
    }
}
