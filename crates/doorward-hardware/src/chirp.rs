//! Buzzer adapter with an interrupt-driven chirp countdown.
//!
//! [`BuzzerAlarm`] is the main-context half: it implements [`AlarmOutput`]
//! on top of a raw [`ToneGenerator`]. A chirp starts a tone and arms a
//! [`ChirpCountdown`]; [`BuzzerMute`] is the interrupt-context half that
//! counts the countdown down once per millisecond and silences the tone when
//! it expires.

use crate::traits::{AlarmOutput, ToneGenerator};
use doorward_core::AlarmVolume;
use doorward_core::constants::{CHIRP_TONE_HZ, CHIRP_VOLUME};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Millisecond countdown shared between the main loop and the 1 ms tick.
///
/// The main context arms or cancels it; the interrupt context decrements it.
/// Every update is a single atomic operation, so neither side ever blocks.
#[derive(Debug, Default)]
pub struct ChirpCountdown {
    remaining: AtomicU32,
}

impl ChirpCountdown {
    pub const fn new() -> Self {
        Self {
            remaining: AtomicU32::new(0),
        }
    }

    /// Start (or restart) the countdown at `ms` milliseconds.
    pub fn arm(&self, ms: u32) {
        self.remaining.store(ms, Ordering::Release);
    }

    /// Stop the countdown without it firing.
    pub fn cancel(&self) {
        self.remaining.store(0, Ordering::Release);
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.remaining() > 0
    }

    /// Advance by one millisecond.
    ///
    /// Returns `true` exactly once, on the tick that takes the countdown
    /// from one to zero.
    pub fn tick(&self) -> bool {
        matches!(
            self.remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| r.checked_sub(1)),
            Ok(1)
        )
    }
}

/// [`AlarmOutput`] backed by a tone generator.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use doorward_hardware::{AlarmOutput, BuzzerAlarm};
/// use doorward_hardware::mock::MockTone;
///
/// let tone = Arc::new(MockTone::new());
/// let (mut alarm, mute) = BuzzerAlarm::new(Arc::clone(&tone));
///
/// alarm.chirp(2);
/// assert!(tone.is_sounding());
/// mute.tick();
/// mute.tick();
/// assert!(!tone.is_sounding());
/// ```
#[derive(Debug)]
pub struct BuzzerAlarm<T: ToneGenerator> {
    tone: Arc<T>,
    countdown: Arc<ChirpCountdown>,
}

impl<T: ToneGenerator> BuzzerAlarm<T> {
    /// Create the adapter and its interrupt-side mute half.
    pub fn new(tone: Arc<T>) -> (Self, BuzzerMute<T>) {
        let countdown = Arc::new(ChirpCountdown::new());
        let mute = BuzzerMute {
            tone: Arc::clone(&tone),
            countdown: Arc::clone(&countdown),
        };
        (Self { tone, countdown }, mute)
    }

    pub fn countdown(&self) -> &ChirpCountdown {
        &self.countdown
    }
}

impl<T: ToneGenerator> AlarmOutput for BuzzerAlarm<T> {
    fn on(&mut self, frequency_hz: u16, volume: AlarmVolume) {
        self.countdown.cancel();
        self.tone.tone(frequency_hz, volume.percent());
    }

    fn off(&mut self) {
        self.countdown.cancel();
        self.tone.silence();
    }

    fn chirp(&mut self, duration_ms: u32) {
        if duration_ms == 0 {
            return;
        }
        self.tone.tone(CHIRP_TONE_HZ, CHIRP_VOLUME);
        self.countdown.arm(duration_ms);
    }
}

/// Interrupt-context half of [`BuzzerAlarm`].
#[derive(Debug)]
pub struct BuzzerMute<T: ToneGenerator> {
    tone: Arc<T>,
    countdown: Arc<ChirpCountdown>,
}

impl<T: ToneGenerator> BuzzerMute<T> {
    /// One millisecond tick. Silences the tone when a chirp expires.
    pub fn tick(&self) {
        if self.countdown.tick() {
            self.tone.silence();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTone;

    #[test]
    fn test_countdown_fires_once() {
        let countdown = ChirpCountdown::new();
        countdown.arm(3);

        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn test_idle_countdown_never_fires() {
        let countdown = ChirpCountdown::new();
        assert!(!countdown.is_active());
        for _ in 0..10 {
            assert!(!countdown.tick());
        }
    }

    #[test]
    fn test_chirp_plays_fixed_tone_then_silences() {
        let tone = Arc::new(MockTone::new());
        let (mut alarm, mute) = BuzzerAlarm::new(Arc::clone(&tone));

        alarm.chirp(30);
        assert_eq!(tone.frequency(), CHIRP_TONE_HZ);
        assert_eq!(tone.duty(), CHIRP_VOLUME);

        for _ in 0..29 {
            mute.tick();
        }
        assert!(tone.is_sounding());
        mute.tick();
        assert!(!tone.is_sounding());
    }

    #[test]
    fn test_continuous_tone_cancels_pending_chirp() {
        let tone = Arc::new(MockTone::new());
        let (mut alarm, mute) = BuzzerAlarm::new(Arc::clone(&tone));

        alarm.chirp(5);
        alarm.on(2500, AlarmVolume::MAX);
        for _ in 0..10 {
            mute.tick();
        }

        assert!(tone.is_sounding());
        assert_eq!(tone.frequency(), 2500);
        assert_eq!(tone.duty(), AlarmVolume::MAX.percent());
    }

    #[test]
    fn test_off_silences_and_cancels() {
        let tone = Arc::new(MockTone::new());
        let (mut alarm, _mute) = BuzzerAlarm::new(Arc::clone(&tone));

        alarm.chirp(100);
        alarm.off();

        assert!(!tone.is_sounding());
        assert!(!alarm.countdown().is_active());
    }
}
