//! Game session: a (game, player) binding over a live connection.
//!
//! A [`Session`] owns at most one [`Connection`] at a time. Binding to a
//! new game or player closes the old connection terminally before the new
//! one is opened, and a matchmaking redirect (`match_found`) rebinds the
//! session to the announced game after a short deferral.
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_client::{Client, PlayerId, SessionEvent};
//!
//! # async fn example() -> tictactoe_client::Result<()> {
//! let client = Client::builder().base_url("http://127.0.0.1:8000").build()?;
//! let (session, mut events) = client.session();
//!
//! session.connect("random".into(), PlayerId::guest())?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::State(game) = event {
//!         println!("turn: {:?}", game.turn);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{GameId, PlayerId};
use crate::protocol::{BOARD_CELLS, ClientMessage, Frame, GameState, ServerMessage};
use crate::transport::{
    Connection, ConnectionEvent, ConnectionHandler, ConnectionState, Connector, game_socket_url,
};

// ============================================================================
// Constants
// ============================================================================

/// Deferral between a `match_found` and the rebind it triggers.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(50);

// ============================================================================
// SessionStatus
// ============================================================================

/// Coarse session status, suitable for a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No game bound.
    #[default]
    Idle,
    /// Bound, waiting for the transport to open.
    Connecting,
    /// Transport open.
    Connected,
    /// Transport dropped; reconnecting in the background.
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// SessionEvent
// ============================================================================

/// Notification published by a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The transport opened.
    Connected,
    /// The transport closed while connected.
    Disconnected,
    /// A new authoritative snapshot replaced the stored one.
    State(GameState),
    /// The server redirected this player to another game.
    MatchFound(GameId),
    /// The deferred rebind after a redirect completed.
    Rebound {
        /// Game now bound.
        game_id: GameId,
        /// Player, unchanged by the redirect.
        player_id: PlayerId,
    },
    /// Server notice.
    Info(String),
    /// Server-side rejection.
    ServerError(String),
    /// Inbound frame that matched no known message.
    Unrecognized(Frame),
    /// Transport-level error; reconnection is handled automatically.
    TransportError(String),
}

// ============================================================================
// Types
// ============================================================================

/// The live binding.
struct Binding {
    game_id: GameId,
    player_id: PlayerId,
    connection: Connection,
}

/// Mutable session state.
#[derive(Default)]
struct SessionState {
    /// Current binding, if any.
    binding: Option<Binding>,
    /// Last snapshot from the server.
    game: Option<GameState>,
    /// Connectivity flag.
    connected: bool,
    /// Status line.
    status: SessionStatus,
    /// Bumped on every bind/unbind; events tagged with an older epoch
    /// come from a superseded connection and are ignored.
    epoch: u64,
    /// Pending deferred rebind.
    redirect: Option<AbortHandle>,
}

/// Shared between the handle, connection handlers and the redirect task.
pub(crate) struct SessionInner {
    base_url: Url,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: Mutex<SessionState>,
}

// ============================================================================
// Session
// ============================================================================

/// A player's binding to a game on the server.
///
/// Dropping the session disconnects it and cancels any pending redirect.
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.base_url.as_str())
            .field("game_id", &self.game_id())
            .field("player_id", &self.player_id())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl Session {
    /// Creates an unbound session and the receiver for its events.
    #[must_use]
    pub fn new(
        base_url: Url,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            inner: Arc::new(SessionInner {
                base_url,
                connector,
                events,
                state: Mutex::new(SessionState::default()),
            }),
        };
        (session, rx)
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the last snapshot received.
    #[must_use]
    pub fn game(&self) -> Option<GameState> {
        self.inner.state.lock().game.clone()
    }

    /// Returns `true` while the transport is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    /// Returns the status line.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.lock().status
    }

    /// Returns the bound game.
    #[must_use]
    pub fn game_id(&self) -> Option<GameId> {
        let state = self.inner.state.lock();
        state.binding.as_ref().map(|b| b.game_id.clone())
    }

    /// Returns the bound player.
    #[must_use]
    pub fn player_id(&self) -> Option<PlayerId> {
        let state = self.inner.state.lock();
        state.binding.as_ref().map(|b| b.player_id.clone())
    }

    /// Returns the state of the owned connection.
    #[must_use]
    pub fn connection_state(&self) -> Option<ConnectionState> {
        let state = self.inner.state.lock();
        state.binding.as_ref().map(|b| b.connection.state())
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Binds the session to `game_id` as `player_id`.
    ///
    /// Any existing connection is closed terminally first, and a pending
    /// redirect is cancelled. Returns immediately; connectivity is
    /// reported through [`SessionEvent`]s.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if either ID is empty
    /// - [`Error::InvalidUrl`] if the socket URL cannot be built
    pub fn connect(&self, game_id: GameId, player_id: PlayerId) -> Result<()> {
        if game_id.as_str().is_empty() {
            return Err(Error::invalid_argument("game id must not be empty"));
        }
        if player_id.as_str().is_empty() {
            return Err(Error::invalid_argument("player id must not be empty"));
        }

        let url = game_socket_url(&self.inner.base_url, &game_id, &player_id)?;

        let mut state = self.inner.state.lock();
        self.inner.bind(&mut state, game_id, player_id, url);
        Ok(())
    }

    /// Sends a message on the current connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if nothing is bound or the
    /// connection is not open. The message is dropped, not queued.
    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        let state = self.inner.state.lock();
        let Some(binding) = state.binding.as_ref() else {
            warn!(?message, "No game bound, message dropped");
            return Err(Error::NotConnected);
        };

        if binding.connection.send(message) {
            trace!(?message, game_id = %binding.game_id, "Message sent");
            Ok(())
        } else {
            warn!(?message, game_id = %binding.game_id, "Connection not open, message dropped");
            Err(Error::NotConnected)
        }
    }

    /// Places a mark on cell `index`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `index` is not in `0..=8`
    /// - [`Error::NotConnected`] if the move could not be sent
    pub fn play_move(&self, index: u8) -> Result<()> {
        if usize::from(index) >= BOARD_CELLS {
            return Err(Error::invalid_argument(format!(
                "cell index {index} out of range 0..={}",
                BOARD_CELLS - 1
            )));
        }
        self.send(&ClientMessage::play(index))
    }

    /// Closes the connection terminally and clears the game state.
    ///
    /// Idempotent; safe to call while unbound.
    pub fn disconnect(&self) {
        let mut state = self.inner.state.lock();
        self.inner.unbind(&mut state);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ============================================================================
// SessionInner - Binding
// ============================================================================

impl SessionInner {
    /// Replaces the binding. The old connection reaches
    /// `Closed(Terminal)` before the new one is opened.
    fn bind(
        self: &Arc<Self>,
        state: &mut SessionState,
        game_id: GameId,
        player_id: PlayerId,
        url: Url,
    ) {
        if let Some(redirect) = state.redirect.take() {
            redirect.abort();
        }
        if let Some(old) = state.binding.take() {
            debug!(game_id = %old.game_id, player_id = %old.player_id, "Closing previous binding");
            old.connection.close();
        }

        state.epoch += 1;
        state.game = None;
        state.status = SessionStatus::Connecting;
        if std::mem::take(&mut state.connected) {
            self.emit(SessionEvent::Disconnected);
        }

        info!(%game_id, %player_id, %url, "Binding session");

        let handler = Self::handler(Arc::downgrade(self), state.epoch);
        let connection = Connection::open(url, Arc::clone(&self.connector), handler);

        state.binding = Some(Binding {
            game_id,
            player_id,
            connection,
        });
    }

    /// Drops the binding and resets state.
    fn unbind(&self, state: &mut SessionState) {
        if let Some(redirect) = state.redirect.take() {
            redirect.abort();
        }
        if let Some(old) = state.binding.take() {
            info!(game_id = %old.game_id, player_id = %old.player_id, "Session disconnected");
            old.connection.close();
        }

        state.epoch += 1;
        state.game = None;
        state.status = SessionStatus::Idle;
        if std::mem::take(&mut state.connected) {
            self.emit(SessionEvent::Disconnected);
        }
    }

    /// Builds the connection handler for one binding epoch.
    fn handler(session: Weak<Self>, epoch: u64) -> ConnectionHandler {
        Box::new(move |event| {
            if let Some(inner) = session.upgrade() {
                inner.on_connection_event(epoch, event);
            }
        })
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

// ============================================================================
// SessionInner - Event Handling
// ============================================================================

impl SessionInner {
    /// Applies one connection event, unless it belongs to a superseded
    /// binding.
    fn on_connection_event(self: &Arc<Self>, epoch: u64, event: ConnectionEvent) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            trace!(
                epoch,
                current = state.epoch,
                ?event,
                "Ignoring event from superseded connection"
            );
            return;
        }

        match event {
            ConnectionEvent::Opened => {
                state.connected = true;
                state.status = SessionStatus::Connected;
                self.emit(SessionEvent::Connected);
            }
            ConnectionEvent::Closed => {
                state.status = SessionStatus::Closed;
                if std::mem::take(&mut state.connected) {
                    self.emit(SessionEvent::Disconnected);
                }
            }
            ConnectionEvent::Error(message) => {
                self.emit(SessionEvent::TransportError(message));
            }
            ConnectionEvent::Message(frame) => self.on_frame(&mut state, frame),
        }
    }

    fn on_frame(self: &Arc<Self>, state: &mut SessionState, frame: Frame) {
        match frame {
            Frame::Message(ServerMessage::Joined { game } | ServerMessage::State { game }) => {
                trace!(game_id = %game.id, "Snapshot received");
                state.game = Some(game.clone());
                self.emit(SessionEvent::State(game));
            }
            Frame::Message(ServerMessage::MatchFound { game_id }) => {
                self.on_match_found(state, game_id);
            }
            Frame::Message(ServerMessage::Info { message }) => {
                info!(%message, "Server info");
                self.emit(SessionEvent::Info(message));
            }
            Frame::Message(ServerMessage::Error { message }) => {
                warn!(%message, "Server error");
                self.emit(SessionEvent::ServerError(message));
            }
            other => {
                debug!(frame = ?other, "Unrecognized frame");
                self.emit(SessionEvent::Unrecognized(other));
            }
        }
    }

    /// Schedules the rebind to `game_id` after [`REDIRECT_DELAY`]. The old
    /// connection stays live until then so in-flight snapshots still apply.
    fn on_match_found(self: &Arc<Self>, state: &mut SessionState, game_id: GameId) {
        let Some(binding) = state.binding.as_ref() else {
            return;
        };
        if state.redirect.is_some() {
            debug!(%game_id, "Redirect already pending, ignoring match_found");
            return;
        }
        info!(
            from = %binding.game_id,
            to = %game_id,
            player_id = %binding.player_id,
            "Match found, rebinding"
        );

        self.emit(SessionEvent::MatchFound(game_id.clone()));

        let session = Arc::downgrade(self);
        let epoch = state.epoch;
        let task = tokio::spawn(async move {
            sleep(REDIRECT_DELAY).await;
            if let Some(inner) = session.upgrade() {
                inner.complete_redirect(epoch, game_id);
            }
        });
        state.redirect = Some(task.abort_handle());
    }

    /// Runs the deferred rebind unless something rebound or unbound the
    /// session in the meantime. The old connection is closed terminally
    /// by `bind` before the new one opens.
    fn complete_redirect(self: &Arc<Self>, epoch: u64, game_id: GameId) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!(%game_id, "Redirect superseded");
            return;
        }
        // This task is the pending redirect; do not abort it.
        state.redirect = None;

        let Some(player_id) = state.binding.as_ref().map(|b| b.player_id.clone()) else {
            return;
        };

        match game_socket_url(&self.base_url, &game_id, &player_id) {
            Ok(url) => {
                self.bind(&mut state, game_id.clone(), player_id.clone(), url);
                self.emit(SessionEvent::Rebound { game_id, player_id });
            }
            Err(e) => {
                warn!(%game_id, error = %e, "Cannot rebind after redirect, keeping current game");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
