//! Game state snapshot as sent by the server.
//!
//! The server is authoritative: the client stores and displays these
//! snapshots but never computes or mutates them.
//!
//! # Format
//!
//! ```json
//! {
//!   "id": "g1",
//!   "board": [-1, 0, -1, -1, 1, -1, -1, -1, -1],
//!   "players": { "p1": { "symbol": 0, "moves": [1] } },
//!   "turn": "p2",
//!   "winner": null
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::identifiers::{GameId, PlayerId};

// ============================================================================
// Constants
// ============================================================================

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

// ============================================================================
// Cell
// ============================================================================

/// Tri-state board cell, encoded on the wire as `-1`, `0` or `1`.
///
/// The same encoding is used for a player's symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Cell {
    /// No mark.
    #[default]
    Empty,
    /// First player's mark.
    X,
    /// Second player's mark.
    O,
}

impl Cell {
    /// Returns `true` if the cell holds no mark.
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

impl TryFrom<i8> for Cell {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Empty),
            0 => Ok(Self::X),
            1 => Ok(Self::O),
            other => Err(format!("invalid cell value: {other}")),
        }
    }
}

impl From<Cell> for i8 {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => -1,
            Cell::X => 0,
            Cell::O => 1,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Empty => '.',
            Self::X => 'X',
            Self::O => 'O',
        };
        write!(f, "{c}")
    }
}

// ============================================================================
// PlayerInfo
// ============================================================================

/// Per-player entry of a game snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Mark this player places.
    pub symbol: Cell,
    /// Indices of this player's live marks, oldest first.
    #[serde(default)]
    pub moves: Vec<u8>,
}

// ============================================================================
// GameState
// ============================================================================

/// Full game snapshot. Replaced wholesale on every `joined`/`state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Game ID.
    pub id: GameId,

    /// Board cells in row-major order.
    pub board: [Cell; BOARD_CELLS],

    /// Players keyed by ID.
    #[serde(default)]
    pub players: FxHashMap<PlayerId, PlayerInfo>,

    /// Player whose turn it is, if the game has started.
    #[serde(default)]
    pub turn: Option<PlayerId>,

    /// Winner, once decided.
    #[serde(default)]
    pub winner: Option<PlayerId>,
}

impl GameState {
    /// Returns the symbol assigned to `player`.
    #[must_use]
    pub fn symbol_of(&self, player: &PlayerId) -> Option<Cell> {
        self.players.get(player).map(|p| p.symbol)
    }

    /// Returns `true` if it is `player`'s turn.
    #[inline]
    #[must_use]
    pub fn is_turn_of(&self, player: &PlayerId) -> bool {
        self.turn.as_ref() == Some(player)
    }

    /// Returns `true` once the server has declared a winner.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Returns the other player in the game, if one has joined.
    #[must_use]
    pub fn opponent_of(&self, player: &PlayerId) -> Option<&PlayerId> {
        self.players.keys().find(|id| *id != player)
    }

    /// Renders the board as three text rows.
    #[must_use]
    pub fn board_rows(&self) -> [String; 3] {
        let row = |r: usize| {
            self.board[r * 3..r * 3 + 3]
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        [row(0), row(1), row(2)]
    }
}

// ============================================================================
// Tests
// ============================================================================
