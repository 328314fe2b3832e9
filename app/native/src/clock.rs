//! Time sources for press-duration measurement.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source.
pub trait Clock: Send {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant { Instant::now() }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and give another to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self { Self::new() }
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self { Self { now: Arc::new(Mutex::new(Instant::now())) } }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) { *self.now.lock() += by; }

    /// Moves the clock forward by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) { self.advance(Duration::from_millis(ms)); }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant { *self.now.lock() }
}
