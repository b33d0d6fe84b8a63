use std::cell::RefCell;
use std::collections::HashMap;

use super::{validate_key, LocalStorage, StorageError};

/// In-process storage, used when nothing should outlive the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.borrow_mut().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set_item("user", "x").unwrap();
        storage.set_item("other", "y").unwrap();
        assert_eq!(storage.get_item("user").unwrap().as_deref(), Some("x"));

        storage.remove_item("user").unwrap();
        assert_eq!(storage.get_item("user").unwrap(), None);

        storage.clear().unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }
}
