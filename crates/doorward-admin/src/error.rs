//! Admin command errors. Each one becomes an `ERR` reply.

use doorward_storage::StorageError;

/// Result type alias for admin commands.
pub type Result<T> = std::result::Result<T, AdminError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// A privileged command arrived before a successful `LOGIN`.
    #[error("login required")]
    SessionRequired,

    #[error("login failed")]
    LoginFailed,

    #[error("{command} needs an argument")]
    MissingArgument { command: &'static str },

    #[error("{0}")]
    InvalidArgument(#[from] doorward_core::Error),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("{command} not implemented")]
    NotImplemented { command: &'static str },

    #[error("{0}")]
    Storage(#[from] StorageError),
}
