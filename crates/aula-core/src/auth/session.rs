use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::observable::{Observable, SubscriptionId};
use crate::storage::{LocalStorage, StorageError};

/// Storage key holding the serialized session
pub const SESSION_KEY: &str = "user";

/// Identity returned by the auth endpoint.
///
/// The reference server omits `role`, so it defaults to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub ok: bool,
    #[serde(default)]
    pub role: String,
    pub username: String,
}

impl Session {
    /// Role for display, with a placeholder when the server sent none
    pub fn role_display(&self) -> &str {
        if self.role.is_empty() {
            "-"
        } else {
            &self.role
        }
    }
}

/// The current session, mirrored between local storage and an observable
/// in-memory slot.
///
/// Clones share the same slot and storage. Writes hit storage first and
/// only then replace the in-memory value, so after every successful call
/// both copies agree.
#[derive(Clone)]
pub struct SessionStore {
    storage: Rc<dyn LocalStorage>,
    user: Observable<Option<Session>>,
}

impl SessionStore {
    /// Create the store, restoring any persisted session.
    ///
    /// A missing, unreadable or malformed entry yields an empty store.
    pub fn new(storage: Rc<dyn LocalStorage>) -> Self {
        let restored = Self::read_user(storage.as_ref());
        debug!(restored = restored.is_some(), "Session store initialized");
        Self {
            storage,
            user: Observable::new(restored),
        }
    }

    fn read_user(storage: &dyn LocalStorage) -> Option<Session> {
        let raw = match storage.get_item(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed persisted session");
                None
            }
        }
    }

    /// The session currently held in memory
    pub fn current(&self) -> Option<Session> {
        self.user.get()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.with(Option::is_some)
    }

    /// Persist `session` and make it the current one, replacing any previous
    pub fn set(&self, session: Session) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(&session)?;
        self.storage.set_item(SESSION_KEY, &serialized)?;
        debug!(username = %session.username, "Session stored");
        self.user.set(Some(session));
        Ok(())
    }

    /// Forget the session
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_item(SESSION_KEY)?;
        debug!("Session cleared");
        self.user.set(None);
        Ok(())
    }

    /// Remove every persisted entry owned by the application, session included
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.storage.clear()?;
        debug!("All local storage cleared");
        self.user.set(None);
        Ok(())
    }

    /// Be called with the new value after every write
    pub fn subscribe(&self, callback: impl Fn(&Option<Session>) + 'static) -> SubscriptionId {
        self.user.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.user.unsubscribe(id)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::storage::{FileStorage, MemoryStorage};

    fn alice() -> Session {
        Session {
            ok: true,
            role: "admin".to_string(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn test_empty_storage_starts_logged_out() {
        let store = SessionStore::new(Rc::new(MemoryStorage::new()));
        assert_eq!(store.current(), None);
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_set_roundtrips_through_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Rc<dyn LocalStorage> = Rc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());

        let store = SessionStore::new(Rc::clone(&storage));
        store.set(alice()).unwrap();
        assert!(store.is_logged_in());

        let fresh = SessionStore::new(Rc::new(FileStorage::new(dir.path().to_path_buf()).unwrap()));
        assert_eq!(fresh.current(), Some(alice()));
    }

    #[test]
    fn test_persisted_copy_matches_memory() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.set(alice()).unwrap();

        let raw = storage.get_item(SESSION_KEY).unwrap().unwrap();
        let persisted: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(Some(persisted), store.current());
    }

    #[test]
    fn test_set_replaces_previous_session() {
        let store = SessionStore::new(Rc::new(MemoryStorage::new()));
        store.set(alice()).unwrap();

        let bob = Session {
            ok: true,
            role: String::new(),
            username: "bob".to_string(),
        };
        store.set(bob.clone()).unwrap();
        assert_eq!(store.current(), Some(bob));
    }

    #[test]
    fn test_malformed_entry_yields_no_session() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set_item(SESSION_KEY, "{not json").unwrap();

        let store = SessionStore::new(storage);
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_wrong_shape_entry_yields_no_session() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set_item(SESSION_KEY, r#"{"token": 42}"#).unwrap();

        assert_eq!(SessionStore::new(storage).current(), None);
    }

    #[test]
    fn test_missing_role_defaults_to_empty() {
        let session: Session = serde_json::from_str(r#"{"ok":true,"username":"alice"}"#).unwrap();
        assert_eq!(session.role, "");
        assert_eq!(session.role_display(), "-");
    }

    #[test]
    fn test_clear_removes_persisted_entry() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.set(alice()).unwrap();

        store.clear().unwrap();
        assert_eq!(store.current(), None);
        assert_eq!(storage.get_item(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_all_removes_every_entry() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set_item("theme", "dark").unwrap();
        let store = SessionStore::new(storage.clone());
        store.set(alice()).unwrap();

        store.clear_all().unwrap();
        assert_eq!(store.current(), None);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_observers_are_notified() {
        let store = SessionStore::new(Rc::new(MemoryStorage::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        store.subscribe(move |s| sink.borrow_mut().push(s.as_ref().map(|s| s.username.clone())));

        store.set(alice()).unwrap();
        store.clear().unwrap();

        assert_eq!(*seen.borrow(), vec![Some("alice".to_string()), None]);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new(Rc::new(MemoryStorage::new()));
        let other = store.clone();
        store.set(alice()).unwrap();
        assert_eq!(other.current(), Some(alice()));
    }
}
