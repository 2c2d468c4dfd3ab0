//! Manually advanced millisecond clock.

use crate::traits::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Clock that only moves when told to.
///
/// Clones share the same counter, so a test can hand one copy to the
/// controller and keep another to advance time.
///
/// # Examples
///
/// ```
/// use doorward_hardware::Clock;
/// use doorward_hardware::mock::MockClock;
///
/// let clock = MockClock::new(0);
/// let controller_clock = clock.clone();
///
/// clock.advance(1500);
/// assert_eq!(controller_clock.now_millis(), 1500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Arc<AtomicU32>,
}

impl MockClock {
    /// Create a clock reading `start` milliseconds.
    pub fn new(start: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start)),
        }
    }

    /// Move the clock forward, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        // fetch_add wraps on overflow
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }

    /// Advances the clock instead of waiting.
    fn delay_ms(&self, ms: u32) {
        self.advance(ms);
    }
}
