/*!
 * Injectable clock for mqflow.
 *
 * Elapsed-time calculations (shutter position estimation in particular) read
 * the current instant through this abstraction so they stay deterministic
 * under test.
 */
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Source of the current monotonic instant
///
/// The clock is shared read-only across devices.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio runtime
///
/// Reads [`tokio::time::Instant`], so tests running under
/// `#[tokio::test(start_paused = true)]` observe virtual time that advances
/// in lock-step with `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for unit tests
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a new manual clock anchored at the current instant
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().expect("clock offset lock poisoned");
        *offset += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().expect("clock offset lock poisoned");
        self.base + *offset
    }
}
