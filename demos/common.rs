//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Board rendering

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tictactoe_client::{GameState, PlayerId};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub debug: bool,
    pub server: Option<String>,
    pub game: Option<String>,
    pub random: bool,
    pub create: bool,
    pub player: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => args.debug = true,
                "--random" => args.random = true,
                "--create" => args.create = true,
                "--server" => args.server = iter.next(),
                "--game" => args.game = iter.next(),
                "--player" => args.player = iter.next(),
                other => eprintln!("[warn] ignoring unknown argument '{other}'"),
            }
        }

        args
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "tictactoe_client=debug"
    } else {
        "tictactoe_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Print the board with cell indices for empty squares.
pub fn print_board(game: &GameState, me: &PlayerId) {
    println!();
    for (i, row) in game.board_rows().iter().enumerate() {
        let hints: Vec<String> = (i * 3..i * 3 + 3)
            .map(|cell| {
                if game.board[cell].is_empty() {
                    cell.to_string()
                } else {
                    " ".to_string()
                }
            })
            .collect();
        println!("    {row}      {}", hints.join(" "));
    }

    match (&game.winner, &game.turn) {
        (Some(winner), _) if winner == me => println!("\n    You won!"),
        (Some(winner), _) => println!("\n    {winner} won."),
        (None, Some(turn)) if turn == me => println!("\n    Your move (0-8, q to quit)"),
        (None, Some(_)) => println!("\n    Waiting for opponent..."),
        (None, None) => println!("\n    Waiting for a second player..."),
    }
}
