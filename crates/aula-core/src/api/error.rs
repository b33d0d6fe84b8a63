use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Server returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => AuthError::InvalidCredentials,
            code => AuthError::Http {
                status: code,
                message: Self::truncate_body(body),
            },
        }
    }

    /// HTTP status behind this error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::InvalidCredentials => Some(401),
            AuthError::Http { status, .. } => Some(*status),
            AuthError::Network(e) => e.status().map(|s| s.as_u16()),
            AuthError::InvalidResponse(_) => None,
        }
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials)
    }
}
