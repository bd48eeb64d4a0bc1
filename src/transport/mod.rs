//! WebSocket transport layer.
//!
//! This module owns the channel to the game server: one resilient
//! [`Connection`] per socket URL.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                            ┌─────────────────┐
//! │  Session         │                            │  Game server    │
//! │                  │         WebSocket          │                 │
//! │  → Connection    │◄──────────────────────────►│  /ws/{g}/{p}    │
//! │    (event loop)  │   JSON frames + ping       │                 │
//! └──────────────────┘                            └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::open` - Spawn the event loop, start the handshake
//! 2. `Open` - Heartbeat every 10 s, frames flow both ways
//! 3. Transport drop - Notify, wait 1 s, handshake again (forever)
//! 4. `Connection::close` - Terminal; nothing reconnects afterwards
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection handle and event loop |
//! | `endpoint` | Socket URL construction |
//! | `socket` | Transport seam and the tungstenite connector |
//! | `state` | Lifecycle state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Connection handle and event loop.
pub mod connection;

/// Game socket URL construction.
pub mod endpoint;

/// Transport sockets and connectors.
pub mod socket;

/// Lifecycle state machine.
pub mod state;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{
    Connection, ConnectionEvent, ConnectionHandler, HEARTBEAT_INTERVAL, RECONNECT_DELAY,
};
pub use endpoint::game_socket_url;
pub use socket::{Connector, FrameSink, FrameStream, Socket, WsConnector};
pub use state::{CloseKind, ConnectionState, Transition};
