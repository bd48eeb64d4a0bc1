//! Transport sockets and the connectors that open them.
//!
//! A [`Socket`] is one live transport: a sink of outbound text frames and
//! a stream of inbound ones. The stream ending means the transport closed.
//!
//! [`Connector`] is the seam between the connection state machine and the
//! network. [`WsConnector`] is the production implementation over
//! `tokio-tungstenite`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a socket.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half of a socket.
///
/// An `Err` item reports a transport error; only the end of the stream
/// means the transport closed.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Socket
// ============================================================================

/// One live transport to the server.
pub struct Socket {
    /// Outbound text frames.
    pub(crate) sink: FrameSink,
    /// Inbound text frames.
    pub(crate) stream: FrameStream,
}

impl Socket {
    /// Creates a socket from its two halves.
    #[inline]
    #[must_use]
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket").finish_non_exhaustive()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports to a URL.
///
/// Called once per connection attempt, including every reconnect.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Performs the transport handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails. The caller treats this as
    /// a transport close and schedules a reconnect.
    async fn connect(&self, url: &Url) -> Result<Socket>;
}

// ============================================================================
// WsConnector
// ============================================================================

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Socket> {
        let (ws_stream, response) = connect_async(url.as_str()).await?;
        debug!(%url, status = %response.status(), "WebSocket handshake completed");

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(Error::from)
            .with(|text: String| future::ready(Ok::<_, Error>(Message::Text(text.into()))));

        // A tungstenite error is fatal to the socket: yield it once, then end.
        let stream = ws_read
            .scan(false, |failed, message| {
                if *failed {
                    return future::ready(None);
                }
                *failed = message.is_err();
                future::ready(Some(message))
            })
            .filter_map(|message| future::ready(text_frame(message)));

        Ok(Socket::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Maps one tungstenite message to an inbound text frame.
///
/// Binary payloads pass through only when they are valid UTF-8; anything
/// else is logged and skipped rather than altered. Control frames are
/// skipped.
fn text_frame(message: std::result::Result<Message, WsError>) -> Option<Result<String>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
            Ok(text) => Some(Ok(text.to_owned())),
            Err(e) => {
                warn!(len = bytes.len(), error = %e, "Skipping non UTF-8 binary frame");
                None
            }
        },
        Ok(other) => {
            trace!(kind = ?other, "Ignoring control frame");
            None
        }
        Err(e) => Some(Err(Error::from(e))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ws_connector_refused() {
        // Port 1 on localhost is never a WebSocket server.
        let url = Url::parse("ws://127.0.0.1:1/ws/g1/p1").unwrap();
        let result = WsConnector.connect(&url).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_connection_error());
    }

    #[test]
    fn test_text_frame_passes_text_through() {
        let frame = text_frame(Ok(Message::Text("not json".into())));
        assert_eq!(frame.unwrap().unwrap(), "not json");
    }

    #[test]
    fn test_text_frame_accepts_utf8_binary() {
        let frame = text_frame(Ok(Message::Binary(b"{\"type\":\"info\"}".to_vec().into())));
        assert_eq!(frame.unwrap().unwrap(), r#"{"type":"info"}"#);
    }

    #[test]
    fn test_text_frame_skips_invalid_utf8_binary() {
        let frame = text_frame(Ok(Message::Binary(vec![0x7b, 0xff, 0xfe].into())));
        assert!(frame.is_none());
    }

    #[test]
    fn test_text_frame_skips_control_frames() {
        assert!(text_frame(Ok(Message::Ping(Vec::new().into()))).is_none());
        assert!(text_frame(Ok(Message::Pong(Vec::new().into()))).is_none());
    }

    #[test]
    fn test_text_frame_reports_errors() {
        let frame = text_frame(Err(WsError::ConnectionClosed));
        assert!(frame.unwrap().unwrap_err().is_connection_error());
    }
}
