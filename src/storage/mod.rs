//! Persistence port
//!
//! The engine never touches a filesystem or browser store directly. It talks to a
//! [`KeyValueStore`] through [`Records`], which owns the failure policy: every read or
//! write error is logged and the in-memory state carries on with defaults.

pub mod error;
pub mod file;
pub mod memory;

use serde::Serialize;
use serde_json::Value;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Key of the per-item progress map
pub const PROGRESS_KEY: &str = "thai-learning-progress";
/// Key of the manually flagged item ids
pub const MANUAL_KEY: &str = "thai-learning-manual-unfamiliar";
/// Key of the stage gate record
pub const STAGE_GATE_KEY: &str = "thai-learning-stage-gate";
/// Key of the daily progress record
pub const DAILY_KEY: &str = "thai-learning-daily";

/// A string key-value store that may fail on any access
pub trait KeyValueStore {
    /// Read a value; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// JSON records on top of a [`KeyValueStore`], with log-and-default failure handling
pub struct Records {
    store: Box<dyn KeyValueStore>,
}

impl Records {
    /// Wrap a backend
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read a record as loose JSON
    ///
    /// Returns `None` when the key is missing or unreadable. Callers decode the value
    /// field by field so a partially broken record still yields whatever is valid.
    pub fn load(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, transient = e.is_transient(), "Failed to read record: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(source) => {
                let e = StorageError::Corrupt { key: key.to_string(), source };
                tracing::warn!(key, "Discarding unreadable record: {}", e);
                None
            }
        }
    }

    /// Write a record, returning whether it reached the backend
    pub fn save<T: Serialize>(&mut self, key: &str, record: &T) -> bool {
        let encoded = match serde_json::to_string(record) {
            Ok(encoded) => encoded,
            Err(source) => {
                let e = StorageError::Encode { key: key.to_string(), source };
                tracing::warn!(key, "Failed to encode record: {}", e);
                return false;
            }
        };

        match self.store.set(key, &encoded) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, transient = e.is_transient(), "Failed to save record: {}", e);
                false
            }
        }
    }

    /// Delete a record, returning whether the backend accepted it
    pub fn remove(&mut self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, "Failed to remove record: {}", e);
                false
            }
        }
    }
}
