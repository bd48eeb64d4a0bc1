//! Type-safe identifiers for games and players.
//!
//! Newtype wrappers prevent passing a player ID where a game ID is
//! expected. Both serialize as plain JSON strings.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Game ID the server treats as "pair me with anyone".
const RANDOM_GAME: &str = "random";

/// Prefix for locally minted player IDs.
const GUEST_PREFIX: &str = "guest_";

// ============================================================================
// GameId
// ============================================================================

/// Identifier of a game on the server.
///
/// May hold the `"random"` sentinel, in which case the server answers
/// with a `match_found` redirect once an opponent is available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Creates a game ID from a string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the random matchmaking sentinel.
    #[inline]
    #[must_use]
    pub fn random() -> Self {
        Self(RANDOM_GAME.to_string())
    }

    /// Returns `true` if this is the random matchmaking sentinel.
    #[inline]
    #[must_use]
    pub fn is_random(&self) -> bool {
        self.0 == RANDOM_GAME
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// PlayerId
// ============================================================================

/// Identifier of a player.
///
/// The caller is responsible for persisting it across sessions so the
/// server recognizes a returning player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player ID from a string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh guest identity: `guest_` plus 8 hex chars.
    #[must_use]
    pub fn guest() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("{GUEST_PREFIX}{}", &uuid[..8]))
    }

    /// Returns `true` if the ID was minted by [`PlayerId::guest`].
    #[inline]
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.0.starts_with(GUEST_PREFIX)
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
