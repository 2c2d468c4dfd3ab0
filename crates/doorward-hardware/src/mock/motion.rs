//! Mock motion sensor.

use crate::traits::MotionSensor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Motion sensor whose edge latch is set through a handle.
#[derive(Debug)]
pub struct MockMotion {
    latched: Arc<AtomicBool>,
}

impl MockMotion {
    pub fn new() -> (Self, MockMotionHandle) {
        let latched = Arc::new(AtomicBool::new(false));
        (
            Self {
                latched: Arc::clone(&latched),
            },
            MockMotionHandle { latched },
        )
    }
}

impl MotionSensor for MockMotion {
    fn consume_trigger_edge(&mut self) -> bool {
        self.latched.swap(false, Ordering::SeqCst)
    }
}

/// Handle for stimulating a [`MockMotion`].
#[derive(Debug, Clone)]
pub struct MockMotionHandle {
    latched: Arc<AtomicBool>,
}

impl MockMotionHandle {
    /// Latch a rising edge, as the edge-capture interrupt would.
    pub fn trigger(&self) {
        self.latched.store(true, Ordering::SeqCst);
    }

    /// Whether an edge is latched and not yet consumed.
    pub fn is_pending(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }
}
