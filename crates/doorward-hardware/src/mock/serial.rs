//! Mock admin-link transport backed by in-memory queues.

use crate::error::{HardwareError, Result};
use crate::traits::SerialTransport;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SerialState {
    rx: Mutex<VecDeque<u8>>,
    tx: Mutex<Vec<u8>>,
    failing: AtomicBool,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Serial transport whose peer is a [`MockSerialHandle`].
///
/// # Examples
///
/// ```
/// use doorward_hardware::SerialTransport;
/// use doorward_hardware::mock::MockSerial;
///
/// let (mut port, handle) = MockSerial::new();
/// handle.send(b"hi");
///
/// assert_eq!(port.read_byte().unwrap(), Some(b'h'));
/// port.write_all(b"OK\r\n").unwrap();
/// assert_eq!(handle.take_output(), "OK\r\n");
/// ```
#[derive(Debug)]
pub struct MockSerial {
    state: Arc<SerialState>,
}

impl MockSerial {
    pub fn new() -> (Self, MockSerialHandle) {
        let state = Arc::new(SerialState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockSerialHandle { state },
        )
    }
}

impl SerialTransport for MockSerial {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::serial("simulated receive failure"));
        }
        Ok(guard(&self.state.rx).pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::serial("simulated transmit failure"));
        }
        guard(&self.state.tx).extend_from_slice(bytes);
        Ok(())
    }
}

/// Remote end of a [`MockSerial`].
#[derive(Debug, Clone)]
pub struct MockSerialHandle {
    state: Arc<SerialState>,
}

impl MockSerialHandle {
    /// Queue bytes for the device to receive.
    pub fn send(&self, bytes: &[u8]) {
        guard(&self.state.rx).extend(bytes.iter().copied());
    }

    /// Queue a line terminated with a carriage return.
    pub fn send_line(&self, line: &str) {
        self.send(line.as_bytes());
        self.send(b"\r");
    }

    /// Everything the device transmitted since the last call.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut *guard(&self.state.tx));
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Bytes queued but not yet read by the device.
    pub fn pending_input(&self) -> usize {
        guard(&self.state.rx).len()
    }

    /// Make every subsequent read and write fail.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }
}
