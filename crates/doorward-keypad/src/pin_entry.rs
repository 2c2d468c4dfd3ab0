//! Main-loop PIN entry on top of the scanner.

use doorward_core::DoorPin;
use doorward_core::constants::{KEY_CHIRP_MS, PIN_ENTRY_TIMEOUT_MS, PIN_LENGTH};
use doorward_hardware::{AlarmOutput, Clock, elapsed_ms};
use tracing::{debug, info};

use crate::scanner::KeypadScanner;

/// Result of one [`PinEntry::check_password`] poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinOutcome {
    /// No key was pending.
    Idle,
    /// A key was buffered; the PIN is not complete yet.
    InProgress,
    /// Four keys were entered and they match the door PIN.
    Match,
    /// Four keys were entered and they do not match.
    Mismatch,
    /// The abort key was pressed. The orchestrator treats this as a
    /// request to start the entry delay.
    Abort,
}

/// PIN buffer with an inactivity timeout.
///
/// # Examples
///
/// ```
/// use doorward_core::DoorPin;
/// use doorward_hardware::mock::{MockAlarm, MockClock};
/// use doorward_keypad::{KeypadScanner, PinEntry, PinOutcome};
///
/// let scanner = KeypadScanner::new();
/// let clock = MockClock::new(0);
/// let (mut buzzer, _) = MockAlarm::new();
/// let pin = DoorPin::new("1234").unwrap();
///
/// let mut entry = PinEntry::new();
/// assert_eq!(
///     entry.check_password(&scanner, &pin, &clock, &mut buzzer),
///     PinOutcome::Idle
/// );
/// ```
#[derive(Debug)]
pub struct PinEntry {
    buffer: [u8; PIN_LENGTH],
    len: usize,
    last_key_at: u32,
    timeout_ms: u32,
}

impl Default for PinEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl PinEntry {
    pub fn new() -> Self {
        Self::with_timeout(PIN_ENTRY_TIMEOUT_MS)
    }

    /// Create an entry buffer that clears after `timeout_ms` of inactivity.
    pub fn with_timeout(timeout_ms: u32) -> Self {
        Self {
            buffer: [0; PIN_LENGTH],
            len: 0,
            last_key_at: 0,
            timeout_ms,
        }
    }

    /// Consume at most one key and advance PIN entry.
    ///
    /// Every consumed key produces a short chirp on `feedback`. The buffer
    /// is cleared when four keys have been submitted, when the abort key is
    /// pressed, and when more than the timeout has passed since the last
    /// key.
    pub fn check_password<C, A>(
        &mut self,
        scanner: &KeypadScanner,
        pin: &DoorPin,
        clock: &C,
        feedback: &mut A,
    ) -> PinOutcome
    where
        C: Clock + ?Sized,
        A: AlarmOutput + ?Sized,
    {
        let now = clock.now_millis();
        if self.len > 0 && elapsed_ms(now, self.last_key_at) >= self.timeout_ms {
            info!(buffered = self.len, "PIN entry timed out, buffer cleared");
            self.clear();
        }

        let Some(key) = scanner.take_key() else {
            return PinOutcome::Idle;
        };

        self.last_key_at = now;
        feedback.chirp(KEY_CHIRP_MS);

        if key.is_abort() {
            debug!("Abort key pressed");
            self.clear();
            return PinOutcome::Abort;
        }

        self.buffer[self.len] = key.as_byte();
        self.len += 1;
        if self.len < PIN_LENGTH {
            return PinOutcome::InProgress;
        }

        let matched = pin.matches(&self.buffer);
        self.clear();
        debug!(matched, "PIN submitted");
        if matched {
            PinOutcome::Match
        } else {
            PinOutcome::Mismatch
        }
    }

    /// Discard any buffered keys.
    pub fn clear(&mut self) {
        self.buffer = [0; PIN_LENGTH];
        self.len = 0;
    }

    /// Number of keys buffered so far.
    pub fn buffered_len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorward_core::constants::KEY_STABLE_SWEEPS;
    use doorward_hardware::mock::{
        MockAlarm, MockAlarmHandle, MockClock, MockKeypadMatrix, MockKeypadMatrixHandle,
    };

    struct Rig {
        scanner: KeypadScanner,
        matrix: MockKeypadMatrix,
        keys: MockKeypadMatrixHandle,
        clock: MockClock,
        buzzer: MockAlarm,
        buzzer_handle: MockAlarmHandle,
        entry: PinEntry,
        pin: DoorPin,
    }

    impl Rig {
        fn new(pin: &str) -> Self {
            let (matrix, keys) = MockKeypadMatrix::new();
            let (buzzer, buzzer_handle) = MockAlarm::new();
            Self {
                scanner: KeypadScanner::new(),
                matrix,
                keys,
                clock: MockClock::new(0),
                buzzer,
                buzzer_handle,
                entry: PinEntry::new(),
                pin: DoorPin::new(pin).unwrap(),
            }
        }

        /// Press and release one key, then poll once.
        fn type_key(&mut self, key: char) -> PinOutcome {
            self.keys.press(key);
            for _ in 0..(usize::from(KEY_STABLE_SWEEPS) + 2) * 4 {
                self.scanner.scan_tick(&mut self.matrix);
                self.clock.advance(1);
            }
            self.keys.release_all();
            for _ in 0..4 {
                self.scanner.scan_tick(&mut self.matrix);
                self.clock.advance(1);
            }
            self.poll()
        }

        fn poll(&mut self) -> PinOutcome {
            self.entry
                .check_password(&self.scanner, &self.pin, &self.clock, &mut self.buzzer)
        }
    }

    #[test]
    fn test_correct_pin_matches() {
        let mut rig = Rig::new("1234");

        assert_eq!(rig.type_key('1'), PinOutcome::InProgress);
        assert_eq!(rig.type_key('2'), PinOutcome::InProgress);
        assert_eq!(rig.type_key('3'), PinOutcome::InProgress);
        assert_eq!(rig.type_key('4'), PinOutcome::Match);
        assert_eq!(rig.entry.buffered_len(), 0);
    }

    #[test]
    fn test_wrong_pin_mismatches() {
        let mut rig = Rig::new("1234");

        for key in "123".chars() {
            rig.type_key(key);
        }
        assert_eq!(rig.type_key('5'), PinOutcome::Mismatch);
        assert_eq!(rig.entry.buffered_len(), 0);
    }

    #[test]
    fn test_no_key_is_idle() {
        let mut rig = Rig::new("1234");
        assert_eq!(rig.poll(), PinOutcome::Idle);
        assert!(rig.buzzer_handle.chirps().is_empty());
    }

    #[test]
    fn test_every_key_chirps() {
        let mut rig = Rig::new("ABCD");
        for key in "AB#".chars() {
            rig.type_key(key);
        }
        assert_eq!(rig.buzzer_handle.chirps(), vec![KEY_CHIRP_MS; 3]);
    }

    #[test]
    fn test_abort_clears_buffer() {
        let mut rig = Rig::new("1234");

        rig.type_key('1');
        rig.type_key('2');
        assert_eq!(rig.type_key('#'), PinOutcome::Abort);
        assert_eq!(rig.entry.buffered_len(), 0);

        for key in "123".chars() {
            assert_eq!(rig.type_key(key), PinOutcome::InProgress);
        }
        assert_eq!(rig.type_key('4'), PinOutcome::Match);
    }

    #[test]
    fn test_inactivity_clears_buffer() {
        let mut rig = Rig::new("1234");

        rig.type_key('1');
        rig.type_key('2');
        rig.clock.advance(PIN_ENTRY_TIMEOUT_MS);
        assert_eq!(rig.poll(), PinOutcome::Idle);
        assert_eq!(rig.entry.buffered_len(), 0);

        // "34" alone is not a full PIN any more.
        assert_eq!(rig.type_key('3'), PinOutcome::InProgress);
        assert_eq!(rig.type_key('4'), PinOutcome::InProgress);
    }

    #[test]
    fn test_slow_typing_within_timeout_is_kept() {
        let mut rig = Rig::new("1234");

        for key in "123".chars() {
            rig.type_key(key);
            rig.clock.advance(PIN_ENTRY_TIMEOUT_MS - 200);
        }
        assert_eq!(rig.type_key('4'), PinOutcome::Match);
    }

    #[test]
    fn test_explicit_clear() {
        let mut rig = Rig::new("1234");
        rig.type_key('1');
        rig.entry.clear();
        assert_eq!(rig.entry.buffered_len(), 0);
    }
}
