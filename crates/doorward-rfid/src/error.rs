//! Card protocol errors.
//!
//! None of these escape [`CardEngine::tick`](crate::CardEngine::tick): the
//! engine logs them, counts them and returns to `Idle`. Only
//! [`CardEngine::init`](crate::CardEngine::init) reports them to the caller.

use crate::engine::CardEngineState;
use doorward_hardware::HardwareError;

/// Result type alias for card engine operations.
pub type Result<T> = std::result::Result<T, CardError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// A handshake step got no completion within the step timeout.
    #[error("{step} timed out after {timeout_ms}ms")]
    Timeout {
        step: CardEngineState,
        timeout_ms: u32,
    },

    /// The reader flagged a framing, parity, collision or overflow fault.
    #[error("Reader reported error flags 0x{flags:02X}")]
    Protocol { flags: u8 },

    /// Fewer bytes than UID plus check byte were received.
    #[error("Incomplete anticollision frame: {received} bytes")]
    IncompleteFrame { received: u8 },

    /// UID bytes did not XOR to the received check byte.
    #[error("UID check byte mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    Checksum { expected: u8, received: u8 },

    /// Register access failed.
    #[error(transparent)]
    Bus(#[from] HardwareError),
}
