//! Game server client and session factory.
//!
//! The [`Client`] holds the server configuration and opens [`Session`]s.
//! It also exposes the REST endpoints used around a session.
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_client::{Client, PlayerId};
//!
//! # async fn example() -> tictactoe_client::Result<()> {
//! let client = Client::builder().build()?;
//!
//! let game_id = client.create_game().await?;
//! let (session, _events) = client.session();
//! session.connect(game_id, PlayerId::guest())?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::identifiers::{GameId, PlayerId};
use crate::protocol::GameState;
use crate::session::{Session, SessionEvent};
use crate::transport::{Connector, game_socket_url};

use super::api;
use super::builder::ClientBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Server base URL.
    base_url: Url,
    /// Transport for game sockets.
    connector: Arc<dyn Connector>,
    /// HTTP client for the REST endpoints.
    http: reqwest::Client,
}

// ============================================================================
// Client
// ============================================================================

/// Tic-tac-toe server client.
///
/// Cheap to clone; clones share configuration and the HTTP pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the configured base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns the socket URL for a game and player.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if the URL
    /// cannot be built.
    pub fn socket_url(&self, game_id: &GameId, player_id: &PlayerId) -> Result<Url> {
        game_socket_url(&self.inner.base_url, game_id, player_id)
    }

    /// Creates an unbound session and the receiver for its events.
    #[must_use]
    pub fn session(&self) -> (Session, mpsc::UnboundedReceiver<SessionEvent>) {
        Session::new(self.inner.base_url.clone(), Arc::clone(&self.inner.connector))
    }

    /// Mints a fresh game via `POST /api/create_game`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) if the request fails.
    pub async fn create_game(&self) -> Result<GameId> {
        api::create_game(&self.inner.http, &self.inner.base_url).await
    }

    /// Fetches a snapshot via `GET /api/game/{id}`.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`](crate::Error::Protocol) if the game does not exist
    /// - [`Error::Http`](crate::Error::Http) if the request fails
    pub async fn fetch_game(&self, game_id: &GameId) -> Result<GameState> {
        api::fetch_game(&self.inner.http, &self.inner.base_url, game_id).await
    }
}

// ============================================================================
// Client - Internal API
// ============================================================================

impl Client {
    /// Creates a new client instance.
    pub(crate) fn new(base_url: Url, connector: Arc<dyn Connector>) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;

        debug!(%base_url, "Client initialized");

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                connector,
                http,
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::mock::{MockConnector, settle};

    #[test]
    fn test_client_is_clone_and_debug() {
        fn assert_clone<T: Clone>() {}
        fn assert_debug<T: fmt::Debug>() {}
        assert_clone::<Client>();
        assert_debug::<Client>();
    }

    #[test]
    fn test_socket_url() {
        let client = Client::builder()
            .base_url("https://example.com")
            .build()
            .unwrap();
        let url = client
            .socket_url(&GameId::random(), &PlayerId::new("guest_1"))
            .unwrap();
        assert_eq!(url.as_str(), "wss://example.com/ws/random/guest_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_uses_configured_connector() {
        let (connector, mut peers) = MockConnector::new();
        let client = Client::builder()
            .base_url("http://game.local:8000")
            .connector(connector)
            .build()
            .unwrap();

        let (session, _events) = client.session();
        session.connect("g1".into(), "p1".into()).unwrap();

        let peer = peers.recv().await.unwrap();
        settle().await;
        assert_eq!(peer.url.as_str(), "ws://game.local:8000/ws/g1/p1");
        assert!(session.is_connected());
    }
}
