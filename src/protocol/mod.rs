//! WebSocket protocol message types.
//!
//! This module defines the JSON frames exchanged with the game server
//! and the game snapshot they carry.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `ClientMessage` | Local → Server | Moves, joins, heartbeats |
//! | `ServerMessage` | Server → Local | Snapshots, redirects, notices |
//! | `Frame` | Server → Local | Decoded inbound frame, tolerant of junk |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `game` | `GameState` snapshot and board cells |
//! | `message` | Client/server messages and frame decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Game state snapshot.
pub mod game;

/// Wire messages.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use game::{BOARD_CELLS, Cell, GameState, PlayerInfo};
pub use message::{ClientMessage, Frame, ServerMessage};
