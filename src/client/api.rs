//! REST companion endpoints.
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/api/create_game` | `{ "game_id": string }` |
//! | `GET` | `/api/game/{id}` | `GameState` |

// ============================================================================
// Imports
// ============================================================================

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::GameId;
use crate::protocol::GameState;

// ============================================================================
// Types
// ============================================================================

/// Body of `POST /api/create_game`.
#[derive(Debug, Deserialize)]
struct CreateGameResponse {
    game_id: GameId,
}

// ============================================================================
// Functions
// ============================================================================

/// Builds `{base}{path}` over HTTP(S), mapping `ws`/`wss` bases back to
/// `http`/`https`.
pub(crate) fn api_url(base: &Url, path: &str) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => {
            return Err(Error::invalid_url(
                base.as_str(),
                format!("unsupported scheme '{other}'"),
            ));
        }
    };

    let mut http_base = base.clone();
    http_base
        .set_scheme(scheme)
        .map_err(|()| Error::invalid_url(base.as_str(), "cannot switch to HTTP scheme"))?;
    http_base.set_query(None);
    http_base.set_fragment(None);

    let prefix = http_base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{prefix}{path}"))?)
}

/// Mints a fresh game on the server.
pub(crate) async fn create_game(http: &reqwest::Client, base: &Url) -> Result<GameId> {
    let url = api_url(base, "/api/create_game")?;
    debug!(%url, "Creating game");

    let body: CreateGameResponse = http
        .post(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    info!(game_id = %body.game_id, "Game created");
    Ok(body.game_id)
}

/// Fetches a game snapshot.
pub(crate) async fn fetch_game(
    http: &reqwest::Client,
    base: &Url,
    game_id: &GameId,
) -> Result<GameState> {
    let path = format!("/api/game/{}", urlencoding::encode(game_id.as_str()));
    let url = api_url(base, &path)?;
    debug!(%url, "Fetching game");

    let response = http.get(url).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(Error::protocol(format!("game {game_id} not found")));
    }

    Ok(response.error_for_status()?.json().await?)
}

// ============================================================================
// Tests
// ============================================================================
