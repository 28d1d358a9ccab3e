//! Storage error types
//!
//! Defines all errors that can occur in the storage layer.

use thiserror::Error;

/// Errors that can occur in the store
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite rejected a statement
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored row could not be mapped to a record
    #[error("Corrupt row in {collection}: {message}")]
    Corrupt {
        collection: &'static str,
        message: String,
    },

    /// Requested document does not exist
    #[error("{collection} not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    /// Unique constraint violated (e.g. duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Payload failed a required-field check
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StorageError {
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            collection,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
