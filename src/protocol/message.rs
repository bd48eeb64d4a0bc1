//! Wire messages exchanged with the game server.
//!
//! Every frame is a JSON object discriminated by its `type` field.
//!
//! | Direction | `type` | Fields |
//! |-----------|--------|--------|
//! | out | `move` | `index` |
//! | out | `join` | `game_id`, `player_id` |
//! | out | `ping` | |
//! | in | `joined` | `game` |
//! | in | `state` | `game` |
//! | in | `match_found` | `game_id` |
//! | in | `info` | `message` |
//! | in | `error` | `message` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{GameId, PlayerId};

use super::GameState;

// ============================================================================
// ClientMessage
// ============================================================================

/// A message from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Place a mark on cell `index` (0..=8).
    Move {
        /// Board cell index.
        index: u8,
    },

    /// Explicit join request.
    Join {
        /// Game to join.
        game_id: GameId,
        /// Joining player.
        player_id: PlayerId,
    },

    /// Heartbeat.
    Ping,
}

impl ClientMessage {
    /// Creates a move message.
    #[inline]
    #[must_use]
    pub fn play(index: u8) -> Self {
        Self::Move { index }
    }

    /// Creates a join message.
    #[inline]
    #[must_use]
    pub fn join(game_id: GameId, player_id: PlayerId) -> Self {
        Self::Join { game_id, player_id }
    }

    /// Serializes the message to its JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A message from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the socket joins a game.
    Joined {
        /// Current snapshot.
        game: GameState,
    },

    /// Sent after every change to the game.
    State {
        /// Current snapshot.
        game: GameState,
    },

    /// Matchmaking redirect: reconnect under `game_id`.
    MatchFound {
        /// Game the client must rebind to.
        game_id: GameId,
    },

    /// Informational notice.
    Info {
        /// Notice text.
        message: String,
    },

    /// Server-side rejection (e.g. "Not your turn").
    Error {
        /// Error text.
        message: String,
    },
}

impl ServerMessage {
    /// Returns the snapshot carried by `joined` and `state`.
    #[inline]
    #[must_use]
    pub fn game(&self) -> Option<&GameState> {
        match self {
            Self::Joined { game } | Self::State { game } => Some(game),
            _ => None,
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A decoded inbound text frame.
///
/// Frames that fail to decode are passed through rather than dropped so
/// the subscriber can still log or inspect them.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A recognized server message.
    Message(ServerMessage),

    /// Valid JSON that matches no known message.
    Json(Value),

    /// Payload that is not JSON at all, forwarded unchanged.
    Raw(String),
}

impl Frame {
    /// Decodes a text frame.
    ///
    /// Never fails: unparseable input becomes [`Frame::Raw`].
    #[must_use]
    pub fn decode(text: &str) -> Self {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => return Self::Raw(text.to_owned()),
        };

        match ServerMessage::deserialize(&value) {
            Ok(message) => Self::Message(message),
            Err(_) => Self::Json(value),
        }
    }

    /// Returns the server message if the frame was recognized.
    #[inline]
    #[must_use]
    pub fn as_message(&self) -> Option<&ServerMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
