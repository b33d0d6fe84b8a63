use std::path::{Path, PathBuf};

use tracing::debug;

use super::{validate_key, LocalStorage, StorageError};

/// Extension of every file managed by `FileStorage`
const ENTRY_EXTENSION: &str = "json";

/// Directory-backed storage: each key is one `<key>.json` file.
///
/// `clear` only removes files with the entry extension, leaving anything
/// else in the directory alone.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION)))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        // Write to a sibling file and rename so a crash never leaves half an entry
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(key, path = ?path, "Stored entry");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        let keys = self.keys()?;
        for key in &keys {
            self.remove_item(key)?;
        }
        debug!(removed = keys.len(), dir = ?self.dir, "Cleared storage");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, FileStorage) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = FileStorage::new(dir.path().join("storage")).expect("create storage");
        (dir, storage)
    }

    #[test]
    fn test_missing_key_is_none() {
        let (_dir, storage) = storage();
        assert_eq!(storage.get_item("user").unwrap(), None);
    }

    #[test]
    fn test_set_get_remove() {
        let (_dir, storage) = storage();

        storage.set_item("user", r#"{"a":1}"#).unwrap();
        assert_eq!(storage.get_item("user").unwrap().as_deref(), Some(r#"{"a":1}"#));

        storage.set_item("user", "replaced").unwrap();
        assert_eq!(storage.get_item("user").unwrap().as_deref(), Some("replaced"));

        storage.remove_item("user").unwrap();
        assert_eq!(storage.get_item("user").unwrap(), None);

        // Removing again is fine
        storage.remove_item("user").unwrap();
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage");

        FileStorage::new(path.clone()).unwrap().set_item("user", "x").unwrap();
        let reopened = FileStorage::new(path).unwrap();
        assert_eq!(reopened.get_item("user").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_clear_only_touches_entries() {
        let (_dir, storage) = storage();
        storage.set_item("user", "1").unwrap();
        storage.set_item("theme", "2").unwrap();
        std::fs::write(storage.dir().join("notes.txt"), "keep me").unwrap();

        storage.clear().unwrap();

        assert!(storage.keys().unwrap().is_empty());
        assert!(storage.dir().join("notes.txt").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let (_dir, storage) = storage();
        // A non-empty directory where the entry should go makes the rename fail
        let blocker = storage.dir().join("user.json");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("inside"), "x").unwrap();

        assert!(matches!(storage.set_item("user", "value"), Err(StorageError::Io(_))));
        assert!(!storage.dir().join("user.tmp").exists());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (_dir, storage) = storage();
        assert!(matches!(
            storage.set_item("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
