//! Game socket URL construction.
//!
//! Format: `{ws|wss}://{host}{base-path}/ws/{game_id}/{player_id}`
//!
//! The WebSocket scheme is derived from the base URL (`http` → `ws`,
//! `https` → `wss`; `ws`/`wss` are kept). Both path segments are
//! percent-encoded.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{GameId, PlayerId};

// ============================================================================
// Functions
// ============================================================================

/// Maps an HTTP(S) or WS(S) base URL to its WebSocket scheme.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] for any other scheme.
pub fn ws_scheme(base: &Url) -> Result<&'static str> {
    match base.scheme() {
        "http" | "ws" => Ok("ws"),
        "https" | "wss" => Ok("wss"),
        other => Err(Error::invalid_url(
            base.as_str(),
            format!("unsupported scheme '{other}'"),
        )),
    }
}

/// Builds the socket URL for a game and player.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the base URL has an unsupported
/// scheme or no host.
pub fn game_socket_url(base: &Url, game_id: &GameId, player_id: &PlayerId) -> Result<Url> {
    let scheme = ws_scheme(base)?;

    let mut ws_base = base.clone();
    ws_base
        .set_scheme(scheme)
        .map_err(|()| Error::invalid_url(base.as_str(), "cannot switch to WebSocket scheme"))?;
    ws_base.set_query(None);
    ws_base.set_fragment(None);

    if ws_base.host_str().is_none() {
        return Err(Error::invalid_url(base.as_str(), "missing host"));
    }

    let prefix = ws_base.as_str().trim_end_matches('/');
    let url = format!(
        "{prefix}/ws/{}/{}",
        urlencoding::encode(game_id.as_str()),
        urlencoding::encode(player_id.as_str()),
    );

    Ok(Url::parse(&url)?)
}

// ============================================================================
// Tests
// ============================================================================
