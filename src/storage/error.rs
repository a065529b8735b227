//! Error types for the key-value store

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](super::KeyValueStore) backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused the write because it is full
    #[error("Storage quota exceeded while writing {key}")]
    QuotaExceeded {
        /// Key being written
        key: String,
    },

    /// The backend is switched off or unreachable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error
    #[error("I/O error on {key}: {source}")]
    Io {
        /// Key being accessed
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The stored value is not valid JSON for the expected record
    #[error("Corrupt record {key}: {source}")]
    Corrupt {
        /// Key being decoded
        key: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The record could not be encoded
    #[error("Failed to encode {key}: {source}")]
    Encode {
        /// Key being encoded
        key: String,
        /// Encoder error
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Whether retrying later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. } | StorageError::Unavailable(_))
    }
}
