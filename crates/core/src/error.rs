//! Storage error model.

use thiserror::Error;

/// Result type used by storage backends.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a key-value storage backend.
///
/// Callers in the access-control layer treat every variant as recoverable:
/// the operation degrades to in-memory state and the failure is logged.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing medium holds data that is not a valid store.
    #[error("storage is corrupt: {0}")]
    Corrupt(String),

    /// A value could not be encoded for storage.
    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
