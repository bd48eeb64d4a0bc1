//! Interactive game in the terminal.
//!
//! Demonstrates:
//! - Building a client from the environment or `--server`
//! - Creating a game, joining one by ID, or entering matchmaking
//! - Reacting to session events (state, redirect, reconnect)
//! - Sending moves from stdin
//!
//! Usage:
//!   cargo run --example play -- --create
//!   cargo run --example play -- --game <id>
//!   cargo run --example play -- --random --player alice
//!   cargo run --example play -- --server http://host:8000 --random --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncBufReadExt, BufReader};

use common::Args;
use tictactoe_client::{ClientBuilder, GameId, PlayerId, Result, SessionEvent};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Tic-tac-toe ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    let mut builder = ClientBuilder::from_env();
    if let Some(server) = &args.server {
        builder = builder.base_url(server);
    }
    let client = builder.build()?;
    println!("[Setup] Server: {}", client.base_url());

    let player_id = args
        .player
        .as_deref()
        .map_or_else(PlayerId::guest, PlayerId::new);

    let game_id = if args.create {
        let id = client.create_game().await?;
        println!("        ✓ Created game {id} (share this ID)");
        id
    } else if let Some(id) = &args.game {
        GameId::new(id.as_str())
    } else {
        if !args.random {
            println!("        No --game given, entering matchmaking");
        }
        GameId::random()
    };

    println!("        Player: {player_id}\n");

    // ========================================================================
    // Session
    // ========================================================================

    let (session, mut events) = client.session();
    session.connect(game_id, player_id.clone())?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::Connected => println!("[Session] Connected"),
                    SessionEvent::Disconnected => {
                        println!("[Session] Disconnected, reconnecting...");
                    }
                    SessionEvent::State(game) => common::print_board(&game, &player_id),
                    SessionEvent::MatchFound(id) => println!("[Session] Match found: {id}"),
                    SessionEvent::Rebound { game_id, .. } => println!("[Session] Joined {game_id}"),
                    SessionEvent::Info(message) => println!("[Server] {message}"),
                    SessionEvent::ServerError(message) => println!("[Server] error: {message}"),
                    SessionEvent::Unrecognized(frame) => println!("[Server] ? {frame:?}"),
                    SessionEvent::TransportError(message) => {
                        println!("[Session] transport: {message}");
                    }
                }
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else { break };
                let input = line.trim();

                if input.eq_ignore_ascii_case("q") {
                    break;
                }

                match input.parse::<u8>() {
                    Ok(index) => {
                        if let Err(e) = session.play_move(index) {
                            println!("[Move] {e}");
                        }
                    }
                    Err(_) if input.is_empty() => {}
                    Err(_) => println!("[Move] enter a cell 0-8 or q"),
                }
            }
        }
    }

    session.disconnect();
    println!("\nBye.");

    Ok(())
}
