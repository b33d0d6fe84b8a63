//! API client for the classroom auth server.
//!
//! The server exposes a single `POST /auth` endpoint that checks a
//! username/password pair and answers with the session payload.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::auth::{Credentials, Session};

use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the auth server when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:18080";

/// Path of the login endpoint, relative to the base URL
const AUTH_PATH: &str = "/auth";

/// Anything that can turn credentials into a session.
///
/// The login flow only sees this trait; `ApiClient` is the HTTP
/// implementation.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError>;
}

/// HTTP client for the auth server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (trailing slashes are ignored).
    ///
    /// No request timeout is configured; requests run until the transport
    /// gives up.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aula/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self) -> String {
        format!("{}{}", self.base_url, AUTH_PATH)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl Authenticator for ApiClient {
    /// Post the credentials and parse the session from a 2xx answer
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let url = self.auth_url();
        debug!(url = %url, username = %credentials.username, "Sending login request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(credentials)
            .send()
            .await?;

        let response = match Self::check_response(response).await {
            Ok(response) => response,
            Err(e) => {
                debug!(status = ?e.status(), "Login request rejected");
                return Err(e);
            }
        };

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Auth response did not match the session shape");
            AuthError::InvalidResponse(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_url_joins_base() {
        let client = ApiClient::new("http://localhost:18080").unwrap();
        assert_eq!(client.auth_url(), "http://localhost:18080/auth");
    }

    #[test]
    fn test_trailing_slashes_are_trimmed() {
        let client = ApiClient::new("http://example.test/api//").unwrap();
        assert_eq!(client.base_url(), "http://example.test/api");
        assert_eq!(client.auth_url(), "http://example.test/api/auth");
    }
}
