//! Interrupt-side matrix scanner and debouncer.

use doorward_core::KeyChar;
use doorward_core::constants::{KEY_STABLE_SWEEPS, KEYPAD_COLS, KEYPAD_LAYOUT, KEYPAD_ROWS};
use doorward_hardware::KeypadMatrix;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// No key.
const NONE: u8 = 0;

/// Debounced key scanner.
///
/// [`scan_tick`](Self::scan_tick) is the only writer of every field except
/// `pending`, which the main loop clears through [`take_key`](Self::take_key).
///
/// A key is accepted once the same character has been seen on more than
/// `KEY_STABLE_SWEEPS` consecutive sweeps after the first, and only fires
/// again after every key has been released.
///
/// # Examples
///
/// ```
/// use doorward_hardware::mock::MockKeypadMatrix;
/// use doorward_keypad::KeypadScanner;
///
/// let scanner = KeypadScanner::new();
/// let (mut matrix, keys) = MockKeypadMatrix::new();
///
/// keys.press('7');
/// for _ in 0..200 {
///     scanner.scan_tick(&mut matrix);
/// }
///
/// assert_eq!(scanner.take_key().map(|k| k.as_char()), Some('7'));
/// assert_eq!(scanner.take_key(), None);
/// ```
#[derive(Debug, Default)]
pub struct KeypadScanner {
    row: AtomicUsize,
    /// Key seen during the sweep in progress.
    sweep_key: AtomicU8,
    candidate: AtomicU8,
    stable_count: AtomicU8,
    /// Key that last fired; cleared on release.
    last_latched: AtomicU8,
    /// Event waiting for the main loop.
    pending: AtomicU8,
}

impl KeypadScanner {
    pub const fn new() -> Self {
        Self {
            row: AtomicUsize::new(0),
            sweep_key: AtomicU8::new(NONE),
            candidate: AtomicU8::new(NONE),
            stable_count: AtomicU8::new(0),
            last_latched: AtomicU8::new(NONE),
            pending: AtomicU8::new(NONE),
        }
    }

    /// Scan the next row. Called once per millisecond from the interrupt.
    pub fn scan_tick<M: KeypadMatrix + ?Sized>(&self, matrix: &mut M) {
        let row = self.row.load(Ordering::Relaxed);

        matrix.drive_row(row);
        let columns = matrix.read_columns();
        matrix.release_row(row);

        let col = columns.trailing_zeros() as usize;
        if col < KEYPAD_COLS {
            self.sweep_key.store(KEYPAD_LAYOUT[row][col], Ordering::Relaxed);
        }

        let next = (row + 1) % KEYPAD_ROWS;
        self.row.store(next, Ordering::Relaxed);
        if next == 0 {
            self.end_sweep();
        }
    }

    fn end_sweep(&self) {
        let raw = self.sweep_key.swap(NONE, Ordering::Relaxed);

        if raw == NONE {
            self.candidate.store(NONE, Ordering::Relaxed);
            self.stable_count.store(0, Ordering::Relaxed);
            self.last_latched.store(NONE, Ordering::Relaxed);
            return;
        }

        let count = if raw == self.candidate.load(Ordering::Relaxed) {
            self.stable_count.load(Ordering::Relaxed).saturating_add(1)
        } else {
            self.candidate.store(raw, Ordering::Relaxed);
            0
        };
        self.stable_count.store(count, Ordering::Relaxed);

        if count > KEY_STABLE_SWEEPS && raw != self.last_latched.load(Ordering::Relaxed) {
            self.last_latched.store(raw, Ordering::Relaxed);
            self.pending.store(raw, Ordering::Release);
        }
    }

    /// Consume the pending key event, if any.
    pub fn take_key(&self) -> Option<KeyChar> {
        KeyChar::from_byte(self.pending.swap(NONE, Ordering::Acquire))
    }

    /// Whether a key event is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) != NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorward_hardware::mock::{MockKeypadMatrix, MockKeypadMatrixHandle};
    use rstest::rstest;

    /// Sweeps needed for a held key to fire.
    const SWEEPS_TO_FIRE: usize = KEY_STABLE_SWEEPS as usize + 2;

    fn setup() -> (KeypadScanner, MockKeypadMatrix, MockKeypadMatrixHandle) {
        let (matrix, handle) = MockKeypadMatrix::new();
        (KeypadScanner::new(), matrix, handle)
    }

    fn sweeps(scanner: &KeypadScanner, matrix: &mut MockKeypadMatrix, n: usize) {
        for _ in 0..n * KEYPAD_ROWS {
            scanner.scan_tick(matrix);
        }
    }

    #[rstest]
    #[case('1')]
    #[case('A')]
    #[case('5')]
    #[case('*')]
    #[case('#')]
    #[case('D')]
    fn test_every_position_decodes(#[case] key: char) {
        let (scanner, mut matrix, handle) = setup();
        handle.press(key);

        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);

        assert_eq!(scanner.take_key().map(|k| k.as_char()), Some(key));
    }

    #[test]
    fn test_press_needs_stable_sweeps() {
        let (scanner, mut matrix, handle) = setup();
        handle.press('3');

        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE - 1);
        assert!(!scanner.has_pending());

        sweeps(&scanner, &mut matrix, 1);
        assert!(scanner.has_pending());
    }

    #[test]
    fn test_held_key_fires_once() {
        let (scanner, mut matrix, handle) = setup();
        handle.press('9');

        let mut events = 0;
        for _ in 0..500 {
            sweeps(&scanner, &mut matrix, 1);
            if scanner.take_key().is_some() {
                events += 1;
            }
        }
        assert_eq!(events, 1);
    }

    #[test]
    fn test_release_rearms() {
        let (scanner, mut matrix, handle) = setup();

        handle.press('0');
        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);
        assert!(scanner.take_key().is_some());

        handle.release_all();
        sweeps(&scanner, &mut matrix, 1);
        handle.press('0');
        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);
        assert_eq!(scanner.take_key().map(|k| k.as_char()), Some('0'));
    }

    #[test]
    fn test_bouncing_contact_never_fires() {
        let (scanner, mut matrix, handle) = setup();

        for _ in 0..200 {
            handle.press('2');
            sweeps(&scanner, &mut matrix, 5);
            handle.release_all();
            sweeps(&scanner, &mut matrix, 1);
        }
        assert!(!scanner.has_pending());
    }

    #[test]
    fn test_rolling_to_another_key_fires_it() {
        let (scanner, mut matrix, handle) = setup();

        handle.press('4');
        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);
        assert_eq!(scanner.take_key().map(|k| k.as_char()), Some('4'));

        handle.release('4');
        handle.press('6');
        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);
        assert_eq!(scanner.take_key().map(|k| k.as_char()), Some('6'));
    }

    #[test]
    fn test_unconsumed_event_is_overwritten_by_newer() {
        let (scanner, mut matrix, handle) = setup();

        handle.press('1');
        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);
        handle.release_all();
        sweeps(&scanner, &mut matrix, 1);
        handle.press('2');
        sweeps(&scanner, &mut matrix, SWEEPS_TO_FIRE);

        assert_eq!(scanner.take_key().map(|k| k.as_char()), Some('2'));
        assert_eq!(scanner.take_key(), None);
    }
}
