//! Error types for editor operations.

use thiserror::Error;

/// Result type for editor operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in editor operations.
///
/// Missing element ids are deliberately absent: mutating or deleting an
/// element that no longer exists is a no-op, not an error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persisted state serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key-value slot could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A background descriptor could not be understood.
    #[error("Invalid background descriptor: {0}")]
    InvalidBackground(String),
}

/// Errors raised by a [`KeyValueStore`](crate::persistence::KeyValueStore).
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred while touching a file-backed slot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage backend is not available in this environment.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the write (quota exceeded, read-only, ...).
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}
