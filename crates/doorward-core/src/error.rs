use thiserror::Error;

/// Validation errors for values entering the system from the keypad,
/// the card reader or the admin link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("Invalid admin password: {0}")]
    InvalidPassword(String),

    #[error("Invalid card identifier: {0}")]
    InvalidCardId(String),

    #[error("Invalid key: {0:?}")]
    InvalidKey(char),

    #[error("Invalid alarm volume: {0}%")]
    InvalidVolume(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
