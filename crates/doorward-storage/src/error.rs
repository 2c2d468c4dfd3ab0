use doorward_core::CardUid;
use doorward_hardware::HardwareError;
use thiserror::Error;

/// Configuration store errors.
///
/// None of these stop the controller: the admin link turns them into an
/// `ERR` reply and the store keeps serving its cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// PIN, password or identifier failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] doorward_core::Error),

    /// No empty slot left in the identifier table
    #[error("Identifier table full ({capacity} slots)")]
    CapacityExhausted { capacity: usize },

    /// Identifier is already in the table
    #[error("Identifier {0} already stored")]
    DuplicateIdentifier(CardUid),

    /// Identifier is not in the table
    #[error("Identifier {0} not found")]
    IdentifierNotFound(CardUid),

    /// Flash erase, program or read failed
    #[error("Flash error: {0}")]
    Flash(#[from] HardwareError),

    /// Stored bytes do not form a valid record
    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },
}

impl StorageError {
    pub(crate) fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
