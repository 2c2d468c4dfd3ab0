//! Admin link: serial bytes in, echoed characters and reply lines out.

use doorward_hardware::{FlashRegion, SerialTransport};
use doorward_storage::ConfigStore;
use tracing::{debug, warn};

use crate::line::LineAssembler;
use crate::session::{AdminSession, SystemStatus};

/// Bytes drained from the transport per [`AdminLink::service`] call.
pub const MAX_BYTES_PER_SERVICE: usize = 64;

/// Admin console over a serial transport.
///
/// Polled from the main loop. Each received byte is echoed; a completed
/// line runs through the [`AdminSession`] and its reply is written back
/// terminated by `\r\n`.
pub struct AdminLink<T> {
    transport: T,
    assembler: LineAssembler,
    session: AdminSession,
}

impl<T: SerialTransport> AdminLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            assembler: LineAssembler::new(),
            session: AdminSession::new(),
        }
    }

    /// Drain pending input and answer completed lines.
    ///
    /// `status` is called once for every completed line. A failed echo is
    /// logged and the byte still counts. Receive and reply errors end this
    /// service pass; the next call tries again.
    pub fn service<F, S>(&mut self, store: &mut ConfigStore<F>, status: S)
    where
        F: FlashRegion,
        S: Fn() -> SystemStatus,
    {
        for _ in 0..MAX_BYTES_PER_SERVICE {
            let byte = match self.transport.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return,
                Err(err) => {
                    warn!(error = %err, "Admin link receive failed");
                    return;
                }
            };

            let line = self.assembler.push(byte);
            if let Err(err) = self.transport.write_all(&[byte]) {
                warn!(error = %err, "Admin link echo failed");
            }

            let Some(line) = line else {
                continue;
            };

            let reply = self.session.handle_line(&line, store, &status());
            debug!(ok = reply.is_ok(), "Admin reply");
            let text = format!("\r\n{reply}\r\n");
            if let Err(err) = self.transport.write_all(text.as_bytes()) {
                warn!(error = %err, "Admin link reply failed");
                return;
            }
        }
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
