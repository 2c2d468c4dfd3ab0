//! Receive-side line editing.

use doorward_core::constants::ADMIN_LINE_CAPACITY;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Fixed-capacity line buffer with backspace editing.
///
/// Carriage return or newline completes a line; empty lines are dropped.
/// A character that does not fit discards the whole partial line.
///
/// # Examples
///
/// ```
/// use doorward_admin::LineAssembler;
///
/// let mut lines = LineAssembler::new();
/// let mut done = None;
/// for &b in b"STATX\x08US\r" {
///     done = lines.push(b).or(done);
/// }
/// assert_eq!(done.as_deref(), Some("STATUS"));
/// ```
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buf: [u8; ADMIN_LINE_CAPACITY],
    len: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: [0; ADMIN_LINE_CAPACITY],
            len: 0,
        }
    }

    /// Feed one received byte. Returns the line when it completes.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match byte {
            BACKSPACE | DELETE => {
                self.len = self.len.saturating_sub(1);
                None
            }
            b'\r' | b'\n' => {
                if self.len == 0 {
                    return None;
                }
                let line = String::from_utf8_lossy(&self.buf[..self.len]).into_owned();
                self.len = 0;
                Some(line)
            }
            _ if self.len < ADMIN_LINE_CAPACITY => {
                self.buf[self.len] = byte;
                self.len += 1;
                None
            }
            _ => {
                // overflow
                self.len = 0;
                None
            }
        }
    }

    /// Characters buffered so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
