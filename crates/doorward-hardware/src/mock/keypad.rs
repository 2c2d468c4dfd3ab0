//! Mock 4x4 key matrix.

use crate::traits::KeypadMatrix;
use doorward_core::constants::{KEYPAD_COLS, KEYPAD_LAYOUT, KEYPAD_ROWS};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

/// Bit index of a key in the pressed mask.
fn key_bit(row: usize, col: usize) -> u16 {
    1 << (row * KEYPAD_COLS + col)
}

fn locate(key: char) -> Option<(usize, usize)> {
    let byte = u8::try_from(key).ok()?;
    KEYPAD_LAYOUT.iter().enumerate().find_map(|(row, keys)| {
        keys.iter()
            .position(|&k| k == byte)
            .map(|col| (row, col))
    })
}

/// Key matrix whose pressed keys are set through a handle.
///
/// Only the currently driven row reports its pressed columns, as with real
/// row-scanned hardware.
#[derive(Debug)]
pub struct MockKeypadMatrix {
    pressed: Arc<AtomicU16>,
    driven_row: Option<usize>,
}

impl MockKeypadMatrix {
    pub fn new() -> (Self, MockKeypadMatrixHandle) {
        let pressed = Arc::new(AtomicU16::new(0));
        (
            Self {
                pressed: Arc::clone(&pressed),
                driven_row: None,
            },
            MockKeypadMatrixHandle { pressed },
        )
    }
}

impl KeypadMatrix for MockKeypadMatrix {
    fn drive_row(&mut self, row: usize) {
        if row < KEYPAD_ROWS {
            self.driven_row = Some(row);
        }
    }

    fn release_row(&mut self, row: usize) {
        if self.driven_row == Some(row) {
            self.driven_row = None;
        }
    }

    fn read_columns(&self) -> u8 {
        let Some(row) = self.driven_row else {
            return 0;
        };
        let pressed = self.pressed.load(Ordering::SeqCst);
        (0..KEYPAD_COLS)
            .filter(|&col| pressed & key_bit(row, col) != 0)
            .fold(0, |mask, col| mask | (1 << col))
    }
}

/// Handle for pressing keys on a [`MockKeypadMatrix`].
#[derive(Debug, Clone)]
pub struct MockKeypadMatrixHandle {
    pressed: Arc<AtomicU16>,
}

impl MockKeypadMatrixHandle {
    /// Hold `key` down. Returns `false` if the key is not on the keypad.
    pub fn press(&self, key: char) -> bool {
        match locate(key) {
            Some((row, col)) => {
                self.pressed.fetch_or(key_bit(row, col), Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Let go of `key`.
    pub fn release(&self, key: char) {
        if let Some((row, col)) = locate(key) {
            self.pressed.fetch_and(!key_bit(row, col), Ordering::SeqCst);
        }
    }

    pub fn release_all(&self) {
        self.pressed.store(0, Ordering::SeqCst);
    }

    pub fn any_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('1', 0, 0b0001)]
    #[case('B', 1, 0b1000)]
    #[case('8', 2, 0b0010)]
    #[case('#', 3, 0b0100)]
    fn test_pressed_key_reads_on_its_row(
        #[case] key: char,
        #[case] row: usize,
        #[case] columns: u8,
    ) {
        let (mut matrix, handle) = MockKeypadMatrix::new();
        assert!(handle.press(key));

        for r in 0..KEYPAD_ROWS {
            matrix.drive_row(r);
            let expected = if r == row { columns } else { 0 };
            assert_eq!(matrix.read_columns(), expected, "row {r}");
            matrix.release_row(r);
        }
    }

    #[test]
    fn test_undriven_matrix_reads_nothing() {
        let (matrix, handle) = MockKeypadMatrix::new();
        handle.press('5');
        assert_eq!(matrix.read_columns(), 0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let (_matrix, handle) = MockKeypadMatrix::new();
        assert!(!handle.press('E'));
        assert!(!handle.any_pressed());
    }

    #[test]
    fn test_release() {
        let (mut matrix, handle) = MockKeypadMatrix::new();
        handle.press('0');
        handle.release('0');
        matrix.drive_row(3);
        assert_eq!(matrix.read_columns(), 0);
    }
}
