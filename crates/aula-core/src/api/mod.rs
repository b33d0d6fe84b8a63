//! HTTP client for the classroom auth endpoint.
//!
//! This module provides the `ApiClient` for posting credentials to
//! `<base-url>/auth`, and the `Authenticator` trait the login flow depends
//! on so the transport can be swapped out in tests.

pub mod client;
pub mod error;

pub use client::{ApiClient, Authenticator, DEFAULT_API_BASE_URL};
pub use error::AuthError;
