//! Monotonic Time Source
//!
//! All expiration bookkeeping in emberkv is passive: an entry carries an
//! absolute deadline and every liveness check compares that deadline against
//! "now". This module provides the single source of "now" so the rest of the
//! crate never reaches for wall-clock time, which can jump backwards.
//!
//! Instants produced here are only ever compared against each other; they are
//! never surfaced to callers.

use std::time::Instant;

/// A monotonic clock owned by the store.
///
/// Backed by [`std::time::Instant`], which is guaranteed never to go
/// backwards within a process lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock;

impl Clock {
    /// Creates a new clock.
    pub fn new() -> Self {
        Clock
    }

    /// Returns the current instant.
    #[inline]
    pub fn now(&self) -> Instant {
        Instant::now()
    }
}
