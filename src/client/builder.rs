//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_client::Client;
//!
//! # fn example() -> tictactoe_client::Result<()> {
//! let client = Client::builder()
//!     .base_url("https://tictactoe.example.com")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::endpoint::ws_scheme;
use crate::transport::{Connector, WsConnector};

use super::core::Client;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Environment variable read by [`ClientBuilder::from_env`].
pub const BASE_URL_ENV: &str = "TICTACTOE_API_URL";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Server base URL.
    base_url: Option<String>,
    /// Transport override.
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `TICTACTOE_API_URL`, if set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(url) = env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            builder.base_url = Some(url);
        }
        builder
    }

    /// Sets the server base URL.
    ///
    /// # Arguments
    ///
    /// * `url` - `http`, `https`, `ws` or `wss` origin, optionally with a path prefix
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Overrides the transport used for game sockets.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the base URL does not parse
    /// - [`Error::InvalidUrl`] if its scheme is unsupported or it has no host
    /// - [`Error::Http`] if the HTTP client cannot be created
    pub fn build(self) -> Result<Client> {
        let base_url = self.validate_base_url()?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector) as Arc<dyn Connector>);

        Client::new(base_url, connector)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the base URL configuration.
    fn validate_base_url(&self) -> Result<Url> {
        let raw = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        let url = Url::parse(raw.trim()).map_err(|e| {
            Error::config(format!(
                "Invalid base URL '{raw}': {e}\n\
                 Example: Client::builder().base_url(\"http://127.0.0.1:8000\")"
            ))
        })?;

        ws_scheme(&url)?;

        if url.host_str().is_none() {
            return Err(Error::invalid_url(raw, "missing host"));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.base_url.is_none());
        assert!(builder.connector.is_none());
    }

    #[test]
    fn test_base_url_sets_value() {
        let builder = ClientBuilder::new().base_url("https://example.com");
        assert_eq!(builder.base_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_build_uses_default_base_url() {
        let client = ClientBuilder::new().build().unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_build_accepts_ws_schemes() {
        assert!(ClientBuilder::new().base_url("wss://h").build().is_ok());
        assert!(ClientBuilder::new().base_url("ws://h:9000").build().is_ok());
    }

    #[test]
    fn test_build_fails_with_garbage_url() {
        let err = ClientBuilder::new().base_url("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Invalid base URL"));
    }

    #[test]
    fn test_build_fails_with_unsupported_scheme() {
        let err = ClientBuilder::new()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_builder_is_clone_and_debug() {
        let builder = ClientBuilder::new().base_url("http://h");
        let cloned = builder.clone();
        assert_eq!(builder.base_url, cloned.base_url);
        assert!(format!("{builder:?}").contains("custom_connector"));
    }
}
