//! Authentication state: the credentials a user submits and the session
//! the auth endpoint hands back.
//!
//! This module provides:
//! - `Credentials`: transient username/password pair for one submit
//! - `Session`: the authenticated identity and role
//! - `SessionStore`: the current session, persisted to local storage and
//!   observable by the rest of the application

pub mod credentials;
pub mod session;

pub use credentials::Credentials;
pub use session::{Session, SessionStore, SESSION_KEY};
