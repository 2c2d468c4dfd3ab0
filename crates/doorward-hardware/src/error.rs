//! Error types for hardware operations.
//!
//! Bus transfers, flash erase/program cycles and serial I/O can fail; these
//! errors describe the failure without deciding what to do about it. The
//! callers (card engine, configuration store, admin link) fold them into
//! their own state decisions.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Bus transfer error.
    #[error("Bus error: {message}")]
    Bus { message: String },

    /// Flash erase cycle failed.
    #[error("Flash erase failed: {message}")]
    FlashErase { message: String },

    /// Flash program cycle failed.
    #[error("Flash program failed: {message}")]
    FlashProgram { message: String },

    /// Access outside the bounds of the storage region.
    #[error("Out of bounds: offset {offset} + {len} exceeds {capacity} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Serial transport error.
    #[error("Serial error: {message}")]
    Serial { message: String },
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new bus error.
    pub fn bus(message: impl Into<String>) -> Self {
        Self::Bus {
            message: message.into(),
        }
    }

    /// Create a new flash erase error.
    pub fn flash_erase(message: impl Into<String>) -> Self {
        Self::FlashErase {
            message: message.into(),
        }
    }

    /// Create a new flash program error.
    pub fn flash_program(message: impl Into<String>) -> Self {
        Self::FlashProgram {
            message: message.into(),
        }
    }

    /// Create a new serial error.
    pub fn serial(message: impl Into<String>) -> Self {
        Self::Serial {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("MFRC522");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: MFRC522");
    }

    #[test]
    fn test_flash_errors() {
        assert_eq!(
            HardwareError::flash_erase("sector locked").to_string(),
            "Flash erase failed: sector locked"
        );
        assert_eq!(
            HardwareError::flash_program("verify mismatch").to_string(),
            "Flash program failed: verify mismatch"
        );
    }

    #[test]
    fn test_out_of_bounds_display() {
        let error = HardwareError::OutOfBounds {
            offset: 1000,
            len: 100,
            capacity: 1024,
        };
        assert_eq!(
            error.to_string(),
            "Out of bounds: offset 1000 + 100 exceeds 1024 bytes"
        );
    }
}
