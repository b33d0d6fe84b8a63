//! Local key/value storage owned by the application.
//!
//! This is the terminal counterpart of browser local storage: string keys
//! mapping to serialized string values.
//!
//! - `FileStorage`: one file per key under the application data directory
//! - `MemoryStorage`: in-process map, nothing survives a restart

pub mod file;
pub mod memory;

use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key/value store.
///
/// All access happens on the UI thread, so implementations use interior
/// mutability without locking.
pub trait LocalStorage {
    /// Read the value stored under `key`, `Ok(None)` if there is none
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every entry owned by this storage
    fn clear(&self) -> Result<(), StorageError>;

    /// Keys currently stored, in no particular order
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Keys become file names, so only a conservative character set is allowed
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !key.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("user").is_ok());
        assert!(validate_key("last-route_v2.0").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../user").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("with space").is_err());
    }
}
