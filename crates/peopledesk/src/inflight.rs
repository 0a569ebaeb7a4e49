//! Bookkeeping for overlapping asynchronous operations.
//!
//! The client runs on a single thread, so these use `Cell`/`RefCell` rather
//! than atomics or locks. They never need to be held across threads, only
//! across `.await` points of the same task set.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use tracing::debug;

/// Counts operations in flight so the busy indicator survives overlap.
#[derive(Debug, Default)]
pub struct LoadingCounter {
    count: Cell<usize>,
}

impl LoadingCounter {
    /// Create an idle counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation; returns `true` if the client just became busy.
    pub fn begin(&self) -> bool {
        let count = self.count.get();
        self.count.set(count + 1);
        count == 0
    }

    /// Unregister an operation; returns `true` if the client just became idle.
    ///
    /// Never goes below zero.
    pub fn end(&self) -> bool {
        match self.count.get() {
            0 => false,
            n => {
                self.count.set(n - 1);
                n == 1
            }
        }
    }

    /// Whether any operation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.count.get() > 0
    }

    /// Number of operations in flight.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

/// Monotonic generation token for a view.
///
/// Each request or local mutation takes a new token; a response is only
/// applied if its token is still the latest.
#[derive(Debug, Default)]
pub struct Generation {
    latest: Cell<u64>,
}

impl Generation {
    /// Create a generation counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new token, superseding every earlier one.
    pub fn advance(&self) -> u64 {
        let next = self.latest.get() + 1;
        self.latest.set(next);
        next
    }

    /// Whether `token` is still the latest.
    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        self.latest.get() == token
    }
}

/// Per-key exclusive locks, one holder at a time per key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    held: RefCell<HashSet<String>>,
}

impl KeyLocks {
    /// Create an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `key`, or return `None` if it is already held.
    ///
    /// The lock is released when the guard is dropped.
    pub fn try_lock(&self, key: &str) -> Option<KeyGuard<'_>> {
        if self.held.borrow_mut().insert(key.to_string()) {
            Some(KeyGuard {
                locks: self,
                key: key.to_string(),
            })
        } else {
            debug!(key, "Key already locked");
            None
        }
    }

    /// Whether `key` is currently held.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.held.borrow().contains(key)
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.borrow_mut().remove(&self.key);
    }
}
