//! Mock actuators: lock, alarm, status indicator and tone generator.

use crate::traits::{AlarmOutput, LockActuator, StatusIndicator, ToneGenerator};
use doorward_core::AlarmVolume;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// Lock
// ============================================================================

#[derive(Debug, Default)]
struct LockState {
    open: AtomicBool,
    open_count: AtomicU32,
    close_count: AtomicU32,
}

/// Mock door lock that records its position.
#[derive(Debug)]
pub struct MockLock {
    state: Arc<LockState>,
}

impl MockLock {
    /// Create a closed lock and its observation handle.
    pub fn new() -> (Self, MockLockHandle) {
        let state = Arc::new(LockState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockLockHandle { state },
        )
    }
}

impl LockActuator for MockLock {
    fn open(&mut self) {
        self.state.open.store(true, Ordering::SeqCst);
        self.state.open_count.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.state.open.store(false, Ordering::SeqCst);
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handle for observing a [`MockLock`].
#[derive(Debug, Clone)]
pub struct MockLockHandle {
    state: Arc<LockState>,
}

impl MockLockHandle {
    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> u32 {
        self.state.open_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u32 {
        self.state.close_count.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Alarm
// ============================================================================

#[derive(Debug, Default)]
struct AlarmState {
    sounding: bool,
    frequency_hz: u16,
    volume: AlarmVolume,
    on_count: u32,
    chirps: Vec<u32>,
}

/// Mock alarm output that records every call.
#[derive(Debug)]
pub struct MockAlarm {
    state: Arc<Mutex<AlarmState>>,
}

impl MockAlarm {
    /// Create a silent alarm and its observation handle.
    pub fn new() -> (Self, MockAlarmHandle) {
        let state = Arc::new(Mutex::new(AlarmState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockAlarmHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AlarmOutput for MockAlarm {
    fn on(&mut self, frequency_hz: u16, volume: AlarmVolume) {
        let mut state = self.state();
        state.sounding = true;
        state.frequency_hz = frequency_hz;
        state.volume = volume;
        state.on_count += 1;
    }

    fn off(&mut self) {
        self.state().sounding = false;
    }

    fn chirp(&mut self, duration_ms: u32) {
        self.state().chirps.push(duration_ms);
    }
}

/// Handle for observing a [`MockAlarm`].
#[derive(Debug, Clone)]
pub struct MockAlarmHandle {
    state: Arc<Mutex<AlarmState>>,
}

impl MockAlarmHandle {
    fn state(&self) -> MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a continuous tone is currently on.
    pub fn is_sounding(&self) -> bool {
        self.state().sounding
    }

    /// Frequency of the most recent continuous tone.
    pub fn frequency(&self) -> u16 {
        self.state().frequency_hz
    }

    /// Volume of the most recent continuous tone.
    pub fn volume(&self) -> AlarmVolume {
        self.state().volume
    }

    pub fn on_count(&self) -> u32 {
        self.state().on_count
    }

    /// Durations of every chirp requested so far, in order.
    pub fn chirps(&self) -> Vec<u32> {
        self.state().chirps.clone()
    }

    pub fn clear_chirps(&self) {
        self.state().chirps.clear();
    }
}

// ============================================================================
// Status indicator
// ============================================================================

#[derive(Debug, Default)]
struct IndicatorState {
    lit: AtomicBool,
    toggles: AtomicU32,
}

/// Mock status LED.
#[derive(Debug)]
pub struct MockIndicator {
    state: Arc<IndicatorState>,
}

impl MockIndicator {
    pub fn new() -> (Self, MockIndicatorHandle) {
        let state = Arc::new(IndicatorState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockIndicatorHandle { state },
        )
    }
}

impl StatusIndicator for MockIndicator {
    fn on(&mut self) {
        self.state.lit.store(true, Ordering::SeqCst);
    }

    fn off(&mut self) {
        self.state.lit.store(false, Ordering::SeqCst);
    }

    fn toggle(&mut self) {
        self.state.lit.fetch_xor(true, Ordering::SeqCst);
        self.state.toggles.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handle for observing a [`MockIndicator`].
#[derive(Debug, Clone)]
pub struct MockIndicatorHandle {
    state: Arc<IndicatorState>,
}

impl MockIndicatorHandle {
    pub fn is_lit(&self) -> bool {
        self.state.lit.load(Ordering::SeqCst)
    }

    pub fn toggle_count(&self) -> u32 {
        self.state.toggles.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tone generator
// ============================================================================

/// Mock PWM tone generator. A frequency of zero means silent.
#[derive(Debug, Default)]
pub struct MockTone {
    frequency_hz: AtomicU16,
    duty_percent: AtomicU8,
}

impl MockTone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frequency(&self) -> u16 {
        self.frequency_hz.load(Ordering::SeqCst)
    }

    pub fn duty(&self) -> u8 {
        self.duty_percent.load(Ordering::SeqCst)
    }

    pub fn is_sounding(&self) -> bool {
        self.frequency() != 0
    }
}

impl ToneGenerator for MockTone {
    fn tone(&self, frequency_hz: u16, duty_percent: u8) {
        self.frequency_hz.store(frequency_hz, Ordering::SeqCst);
        self.duty_percent.store(duty_percent, Ordering::SeqCst);
    }

    fn silence(&self) {
        self.frequency_hz.store(0, Ordering::SeqCst);
        self.duty_percent.store(0, Ordering::SeqCst);
    }
}
