use std::fmt;

use serde::Serialize;

/// Username/password pair sent to the auth endpoint.
///
/// Built for a single submit attempt and dropped once the request settles;
/// never persisted.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("alice", "secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_serializes_as_request_body() {
        let creds = Credentials::new("alice", "secret");
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json, serde_json::json!({"username": "alice", "password": "secret"}));
    }
}
