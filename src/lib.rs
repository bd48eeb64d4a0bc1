//! Tic-tac-toe client - Resilient realtime connection to a game server.
//!
//! This library binds a player to a game over a WebSocket and keeps that
//! binding alive across network failures.
//!
//! # Architecture
//!
//! The client is split into two layers:
//!
//! - **Connection**: one socket URL, a heartbeat while open, and a fixed
//!   delay reconnect loop that only an explicit close ends
//! - **Session**: the (game, player) binding, the latest game snapshot and
//!   the matchmaking redirect that rebinds to a new game
//!
//! Key design principles:
//!
//! - Each [`Session`] owns at most one [`Connection`]
//! - A superseded connection is closed terminally before its replacement opens
//! - Frames that are not valid JSON are still delivered, raw
//! - Nothing is buffered while disconnected; sends report rejection
//!
//! # Quick Start
//!
//! ```no_run
//! use tictactoe_client::{Client, GameId, PlayerId, Result, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .base_url("http://127.0.0.1:8000")
//!         .build()?;
//!
//!     let (session, mut events) = client.session();
//!     session.connect(GameId::random(), PlayerId::guest())?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let SessionEvent::State(game) = event {
//!             println!("{}", game.board_rows().join("\n"));
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client factory and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Game model and wire messages |
//! | [`session`] | Game session and matchmaking redirect |
//! | [`transport`] | Reconnecting WebSocket connection |

// ============================================================================
// Modules
// ============================================================================

/// Client factory and configuration.
///
/// Use [`Client::builder()`] to create a configured client instance.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for games and players.
pub mod identifiers;

/// Game model and wire message types.
pub mod protocol;

/// Game session bound to a (game, player) pair.
pub mod session;

/// WebSocket transport layer.
///
/// Connection lifecycle, heartbeat and reconnect handling.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{GameId, PlayerId};

// Protocol types
pub use protocol::{BOARD_CELLS, Cell, ClientMessage, Frame, GameState, PlayerInfo, ServerMessage};

// Session types
pub use session::{REDIRECT_DELAY, Session, SessionEvent, SessionStatus};

// Transport types
pub use transport::{
    Connection, ConnectionEvent, ConnectionState, Connector, HEARTBEAT_INTERVAL,
    RECONNECT_DELAY, Socket, WsConnector,
};
