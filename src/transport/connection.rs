//! Resilient connection to one game socket URL.
//!
//! A [`Connection`] keeps a single transport open to a fixed URL: it
//! heartbeats while open, decodes inbound frames, gates outbound sends on
//! the open state, and reconnects after every drop until closed.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles, one at a time:
//!
//! - Transport handshakes (initial and after every drop)
//! - Inbound frames, decoded and passed to the handler in order
//! - Outbound frames queued by [`Connection::send`] and the heartbeat
//! - The fixed reconnect delay after a drop
//!
//! # Lifecycle
//!
//! ```text
//!            handshake ok               transport closed
//! Connecting ────────────► Open ─────────────────────────┐
//!     ▲  │                                               ▼
//!     │  └──── handshake failed ─────────────► Closed(Reconnecting)
//!     │                                               │
//!     └───────────────── 1000 ms later ───────────────┘
//!
//! close() from any state ──► Closed(Terminal)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, trace, warn};
use url::Url;

use crate::protocol::{ClientMessage, Frame};

use super::socket::{Connector, Socket};
use super::state::{ConnectionState, Transition};

// ============================================================================
// Constants
// ============================================================================

/// Interval between heartbeat pings while open.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10_000);

/// Fixed delay between a drop and the next handshake attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1_000);

// ============================================================================
// Types
// ============================================================================

/// Notification delivered to the connection's subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Handshake completed; sends are now accepted.
    Opened,
    /// An inbound frame.
    Message(Frame),
    /// The transport closed, dropped, or failed its handshake.
    Closed,
    /// Transport-level error. Causes no state change by itself.
    Error(String),
}

/// Subscriber callback.
///
/// Called on the connection task, synchronously and in order. Must not
/// block.
pub type ConnectionHandler = Box<dyn Fn(ConnectionEvent) + Send + Sync>;

/// Mutable connection state, guarded by one lock.
struct Inner {
    /// Current lifecycle state.
    state: ConnectionState,
    /// Cleared by `close()` before anything else happens.
    reconnect: bool,
    /// Writer queue of the live transport. `Some` only while open.
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// Heartbeat task. `Some` only while open.
    heartbeat: Option<AbortHandle>,
}

/// State shared between the handle and the event loop.
struct Shared {
    /// Target URL.
    url: Url,
    /// Guarded state.
    inner: Mutex<Inner>,
    /// Wakes the event loop when `close()` is called.
    shutdown: Notify,
}

// ============================================================================
// Connection
// ============================================================================

/// Resilient connection to one URL.
///
/// Owns at most one live transport at a time. Dropping the connection
/// closes it terminally.
pub struct Connection {
    shared: Arc<Shared>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.shared.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Opens a connection and starts its event loop.
    ///
    /// Returns immediately in [`ConnectionState::Connecting`]; the outcome
    /// is reported to `handler`. Must be called from within a tokio
    /// runtime.
    pub fn open(url: Url, connector: Arc<dyn Connector>, handler: ConnectionHandler) -> Self {
        let shared = Arc::new(Shared {
            url,
            inner: Mutex::new(Inner {
                state: ConnectionState::Connecting,
                reconnect: true,
                outbound: None,
                heartbeat: None,
            }),
            shutdown: Notify::new(),
        });

        tokio::spawn(Self::run_event_loop(
            Arc::clone(&shared),
            connector,
            handler,
        ));

        Self { shared }
    }

    /// Returns the target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// Returns `true` if the connection is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Returns `true` if a drop will still be followed by a reconnect.
    #[inline]
    #[must_use]
    pub fn reconnect_enabled(&self) -> bool {
        self.shared.inner.lock().reconnect
    }

    /// Returns `true` while the heartbeat timer is armed.
    #[inline]
    #[must_use]
    pub fn heartbeat_active(&self) -> bool {
        self.shared.inner.lock().heartbeat.is_some()
    }

    /// Sends a message if the connection is open.
    ///
    /// Returns `false` and does nothing otherwise. Messages are never
    /// buffered for a later transport.
    pub fn send(&self, message: &ClientMessage) -> bool {
        match message.to_json() {
            Ok(text) => self.shared.send_text(text),
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound message");
                false
            }
        }
    }

    /// Closes the connection for good.
    ///
    /// Disables reconnection and disarms the heartbeat before the
    /// transport is told to close, so a late close event can never
    /// schedule anything. Idempotent.
    pub fn close(&self) {
        let mut inner = self.shared.inner.lock();
        inner.reconnect = false;
        if let Some(heartbeat) = inner.heartbeat.take() {
            heartbeat.abort();
        }
        inner.outbound = None;

        if let Some(next) = inner.state.next(Transition::CloseRequested) {
            debug!(url = %self.shared.url, from = %inner.state, "Connection closed by request");
            inner.state = next;
            drop(inner);
            self.shared.shutdown.notify_one();
        }
    }

    /// Event loop: connect, pump frames, wait, reconnect.
    async fn run_event_loop(
        shared: Arc<Shared>,
        connector: Arc<dyn Connector>,
        handler: ConnectionHandler,
    ) {
        loop {
            debug!(url = %shared.url, "Connecting");

            let attempt = tokio::select! {
                result = connector.connect(&shared.url) => result,
                () = shared.shutdown.notified() => break,
            };

            let reconnect = match attempt {
                Ok(socket) => {
                    let Some(outbound_rx) = shared.mark_open() else {
                        debug!(url = %shared.url, "Closed during handshake, discarding transport");
                        break;
                    };
                    debug!(url = %shared.url, "Connection open");
                    handler(ConnectionEvent::Opened);

                    Self::pump(&shared, socket, outbound_rx, &handler).await;

                    let reconnect = shared.mark_closed();
                    handler(ConnectionEvent::Closed);
                    reconnect
                }
                Err(e) => {
                    warn!(url = %shared.url, error = %e, "Connection attempt failed");
                    handler(ConnectionEvent::Error(e.to_string()));

                    let reconnect = shared.mark_closed();
                    handler(ConnectionEvent::Closed);
                    reconnect
                }
            };

            if !reconnect {
                break;
            }

            debug!(
                url = %shared.url,
                delay_ms = RECONNECT_DELAY.as_millis() as u64,
                "Reconnect scheduled"
            );
            tokio::select! {
                () = sleep(RECONNECT_DELAY) => {}
                () = shared.shutdown.notified() => break,
            }

            if !shared.begin_reconnect() {
                break;
            }
        }

        debug!(url = %shared.url, "Event loop terminated");
    }

    /// Moves frames between one live transport and the handler until the
    /// transport closes or `close()` is called.
    async fn pump(
        shared: &Shared,
        socket: Socket,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        handler: &ConnectionHandler,
    ) {
        let Socket {
            mut sink,
            mut stream,
        } = socket;

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(text)) => {
                        trace!(len = text.len(), "Frame received");
                        handler(ConnectionEvent::Message(Frame::decode(&text)));
                    }
                    Some(Err(e)) => {
                        warn!(url = %shared.url, error = %e, "Transport error");
                        handler(ConnectionEvent::Error(e.to_string()));
                    }
                    None => {
                        debug!(url = %shared.url, "Transport closed by remote");
                        return;
                    }
                },

                outgoing = outbound_rx.recv() => match outgoing {
                    Some(text) => {
                        trace!(len = text.len(), "Frame sent");
                        if let Err(e) = sink.send(text).await {
                            warn!(url = %shared.url, error = %e, "Failed to write frame");
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        return;
                    }
                },

                () = shared.shutdown.notified() => {
                    let _ = sink.close().await;
                    return;
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Sole owner: nothing may keep reconnecting once the handle is gone.
        self.close();
    }
}

// ============================================================================
// Shared - Transitions
// ============================================================================

impl Shared {
    /// Queues a text frame on the live transport if open.
    fn send_text(&self, text: String) -> bool {
        let inner = self.inner.lock();
        if !inner.state.is_open() {
            return false;
        }
        inner
            .outbound
            .as_ref()
            .is_some_and(|tx| tx.send(text).is_ok())
    }

    /// `Connecting → Open`: installs the writer queue and arms the
    /// heartbeat. Returns `None` if the connection was closed meanwhile.
    fn mark_open(self: &Arc<Self>) -> Option<mpsc::UnboundedReceiver<String>> {
        let mut inner = self.inner.lock();
        inner.state = inner.state.next(Transition::HandshakeCompleted)?;

        let (tx, rx) = mpsc::unbounded_channel();
        inner.outbound = Some(tx);
        inner.heartbeat = Some(spawn_heartbeat(Arc::downgrade(self)));
        Some(rx)
    }

    /// `→ Closed`: drops the writer queue and disarms the heartbeat.
    /// Returns `true` if a reconnect should be scheduled.
    fn mark_closed(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.outbound = None;
        if let Some(heartbeat) = inner.heartbeat.take() {
            heartbeat.abort();
        }

        match inner.state.next(Transition::TransportClosed) {
            Some(next) => {
                inner.state = next;
                inner.reconnect
            }
            None => false,
        }
    }

    /// `Closed(Reconnecting) → Connecting`, checked when the timer fires.
    fn begin_reconnect(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.reconnect {
            return false;
        }
        match inner.state.next(Transition::ReconnectDue) {
            Some(next) => {
                inner.state = next;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Sends a `ping` every [`HEARTBEAT_INTERVAL`]; failures are ignored.
fn spawn_heartbeat(shared: Weak<Shared>) -> AbortHandle {
    tokio::spawn(async move {
        let Ok(ping) = ClientMessage::Ping.to_json() else {
            return;
        };

        let mut ticker = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if !shared.send_text(ping.clone()) {
                trace!("Heartbeat skipped, transport not open");
            }
        }
    })
    .abort_handle()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::{Instant, sleep};

    use crate::protocol::ServerMessage;
    use crate::transport::mock::{MockConnector, MockMode, MockPeer, settle};
    use crate::transport::state::CloseKind;

    fn url() -> Url {
        Url::parse("ws://test/ws/g1/p1").unwrap()
    }

    fn recorder() -> (ConnectionHandler, UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: ConnectionHandler = Box::new(move |event| {
            let _ = tx.send(event);
        });
        (handler, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn open_connection() -> (
        Connection,
        MockPeer,
        Arc<MockConnector>,
        UnboundedReceiver<MockPeer>,
        UnboundedReceiver<ConnectionEvent>,
    ) {
        let (connector, mut peers) = MockConnector::new();
        let (handler, events) = recorder();
        let conn = Connection::open(url(), connector.clone(), handler);
        let peer = peers.recv().await.unwrap();
        settle().await;
        (conn, peer, connector, peers, events)
    }

    #[test]
    fn test_constants() {
        assert_eq!(HEARTBEAT_INTERVAL.as_millis(), 10_000);
        assert_eq!(RECONNECT_DELAY.as_millis(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_connecting() {
        let (connector, _peers) = MockConnector::with_mode(MockMode::Hang);
        let (handler, _events) = recorder();
        let conn = Connection::open(url(), connector, handler);

        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(!conn.heartbeat_active());
        assert!(conn.reconnect_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_notifies_and_arms_heartbeat() {
        let (conn, peer, connector, _peers, mut events) = open_connection().await;

        assert_eq!(peer.url, url());
        assert_eq!(connector.dialed(), vec![url()]);
        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(conn.heartbeat_active());
        assert_eq!(drain(&mut events), vec![ConnectionEvent::Opened]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_connecting_is_rejected() {
        let (connector, _peers) = MockConnector::with_mode(MockMode::Hang);
        let (handler, _events) = recorder();
        let conn = Connection::open(url(), connector, handler);
        settle().await;

        assert!(!conn.send(&ClientMessage::play(4)));
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_open_reaches_server() {
        let (conn, mut peer, ..) = open_connection().await;

        assert!(conn.send(&ClientMessage::play(4)));
        settle().await;

        let sent: serde_json::Value = serde_json::from_str(&peer.try_recv().unwrap()).unwrap();
        assert_eq!(sent, json!({ "type": "move", "index": 4 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_frames_decoded_in_order() {
        let (_conn, peer, _connector, _peers, mut events) = open_connection().await;
        drain(&mut events);

        peer.push(r#"{"type":"info","message":"one"}"#);
        peer.push("not json");
        peer.push(r#"{"type":"mystery"}"#);
        settle().await;

        assert_eq!(
            drain(&mut events),
            vec![
                ConnectionEvent::Message(Frame::Message(ServerMessage::Info {
                    message: "one".into()
                })),
                ConnectionEvent::Message(Frame::Raw("not json".into())),
                ConnectionEvent::Message(Frame::Json(json!({ "type": "mystery" }))),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_pings_every_interval() {
        let (_conn, mut peer, ..) = open_connection().await;

        sleep(HEARTBEAT_INTERVAL - Duration::from_millis(1)).await;
        settle().await;
        assert!(peer.try_recv().is_none());

        sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(peer.try_recv().as_deref(), Some(r#"{"type":"ping"}"#));

        sleep(HEARTBEAT_INTERVAL).await;
        settle().await;
        assert_eq!(peer.try_recv().as_deref(), Some(r#"{"type":"ping"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_then_reconnects_after_delay() {
        let (conn, mut peer, connector, mut peers, mut events) = open_connection().await;
        drain(&mut events);

        peer.drop_transport();
        settle().await;
        let closed_at = Instant::now();

        assert_eq!(conn.state(), ConnectionState::Closed(CloseKind::Reconnecting));
        assert!(!conn.heartbeat_active());
        assert!(!conn.send(&ClientMessage::Ping));
        assert_eq!(drain(&mut events), vec![ConnectionEvent::Closed]);

        let second = peers.recv().await.unwrap();
        assert_eq!(Instant::now() - closed_at, RECONNECT_DELAY);
        assert_eq!(second.url, url());
        settle().await;

        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(conn.heartbeat_active());
        assert_eq!(connector.dial_count(), 2);
        assert_eq!(drain(&mut events), vec![ConnectionEvent::Opened]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_scheduled_once_per_close() {
        let (_conn, mut peer, connector, mut peers, _events) = open_connection().await;

        peer.drop_transport();
        settle().await;

        let _second = peers.recv().await.unwrap();
        settle().await;
        sleep(RECONNECT_DELAY * 5).await;
        settle().await;

        assert_eq!(connector.dial_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_handshake_retries_forever() {
        let (connector, mut peers) = MockConnector::with_mode(MockMode::Refuse);
        let (handler, mut events) = recorder();
        let conn = Connection::open(url(), connector.clone(), handler);
        settle().await;

        assert_eq!(conn.state(), ConnectionState::Closed(CloseKind::Reconnecting));
        let first = drain(&mut events);
        assert!(matches!(first[0], ConnectionEvent::Error(_)));
        assert_eq!(first[1], ConnectionEvent::Closed);

        for attempt in 2..=5 {
            sleep(RECONNECT_DELAY).await;
            settle().await;
            assert_eq!(connector.dial_count(), attempt);
        }

        connector.set_mode(MockMode::Accept);
        let _peer = peers.recv().await.unwrap();
        settle().await;
        assert!(conn.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_alone_changes_nothing() {
        let (conn, peer, _connector, _peers, mut events) = open_connection().await;
        drain(&mut events);

        peer.push_error("reset by peer");
        settle().await;

        assert!(conn.is_open());
        assert!(conn.heartbeat_active());
        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ConnectionEvent::Error(msg) if msg.contains("reset by peer")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_terminal_and_idempotent() {
        let (conn, mut peer, connector, _peers, _events) = open_connection().await;

        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed(CloseKind::Terminal));
        assert!(!conn.heartbeat_active());
        assert!(!conn.reconnect_enabled());

        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed(CloseKind::Terminal));

        settle().await;
        assert!(peer.recv().await.is_none(), "transport should be closed");

        sleep(RECONNECT_DELAY * 10).await;
        settle().await;
        assert_eq!(connector.dial_count(), 1);
        assert!(!conn.send(&ClientMessage::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_close_event_after_close_schedules_nothing() {
        let (conn, mut peer, connector, _peers, mut events) = open_connection().await;
        drain(&mut events);

        conn.close();
        peer.drop_transport();
        settle().await;

        sleep(HEARTBEAT_INTERVAL * 2).await;
        settle().await;

        assert_eq!(conn.state(), ConnectionState::Closed(CloseKind::Terminal));
        assert!(!conn.heartbeat_active());
        assert_eq!(connector.dial_count(), 1);
        assert!(peer.try_recv().is_none(), "no heartbeat after close");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_reconnect_wait_cancels_it() {
        let (conn, mut peer, connector, _peers, _events) = open_connection().await;

        peer.drop_transport();
        settle().await;
        sleep(RECONNECT_DELAY / 2).await;

        conn.close();
        sleep(RECONNECT_DELAY * 3).await;
        settle().await;

        assert_eq!(connector.dial_count(), 1);
        assert!(conn.state().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_handshake_discards_transport() {
        let (connector, _peers) = MockConnector::with_mode(MockMode::Hang);
        let (handler, mut events) = recorder();
        let conn = Connection::open(url(), connector.clone(), handler);
        settle().await;

        conn.close();
        settle().await;

        assert!(conn.state().is_terminal());
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_terminally() {
        let (conn, mut peer, connector, _peers, _events) = open_connection().await;

        drop(conn);
        settle().await;
        assert!(peer.recv().await.is_none());

        sleep(RECONNECT_DELAY * 3).await;
        settle().await;
        assert_eq!(connector.dial_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_buffering_across_reconnect() {
        let (conn, mut peer, _connector, mut peers, _events) = open_connection().await;

        peer.drop_transport();
        settle().await;
        assert!(!conn.send(&ClientMessage::play(1)));

        let mut second = peers.recv().await.unwrap();
        settle().await;
        assert!(second.try_recv().is_none());
    }
}
