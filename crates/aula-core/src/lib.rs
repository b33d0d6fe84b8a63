//! Core library for aula, the classroom login client.
//!
//! The pieces, leaves first:
//!
//! - `observable`: single-threaded value holder with change callbacks
//! - `storage`: application-owned key/value storage (files or memory)
//! - `auth`: credentials, the session and the session store
//! - `api`: HTTP client for the auth endpoint
//! - `login`: form validation and the login state machine
//! - `config`: user configuration on disk

pub mod api;
pub mod auth;
pub mod config;
pub mod login;
pub mod observable;
pub mod storage;

pub use api::{ApiClient, AuthError, Authenticator};
pub use auth::{Credentials, Session, SessionStore};
pub use config::Config;
pub use login::{LoginFlow, LoginState, Navigator, SubmitOutcome};
pub use observable::Observable;
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
