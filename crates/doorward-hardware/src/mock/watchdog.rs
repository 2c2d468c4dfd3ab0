//! Mock watchdog that counts how often it was serviced.

use crate::traits::Watchdog;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
pub struct MockWatchdog {
    feeds: Arc<AtomicU32>,
}

impl MockWatchdog {
    pub fn new() -> (Self, MockWatchdogHandle) {
        let feeds = Arc::new(AtomicU32::new(0));
        (
            Self {
                feeds: Arc::clone(&feeds),
            },
            MockWatchdogHandle { feeds },
        )
    }
}

impl Watchdog for MockWatchdog {
    fn feed(&mut self) {
        self.feeds.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct MockWatchdogHandle {
    feeds: Arc<AtomicU32>,
}

impl MockWatchdogHandle {
    pub fn feed_count(&self) -> u32 {
        self.feeds.load(Ordering::SeqCst)
    }
}
