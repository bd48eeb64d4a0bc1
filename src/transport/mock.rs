//! In-memory transport for tests.
//!
//! [`MockConnector`] records every URL dialled and, when accepting, hands
//! the server side of each socket to the test as a [`MockPeer`].

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{future, sink, stream};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

use super::socket::{Connector, Socket};

/// How the mock answers handshakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MockMode {
    /// Complete the handshake.
    Accept,
    /// Fail the handshake.
    Refuse,
    /// Never complete the handshake.
    Hang,
}

/// Connector backed by in-memory channels.
pub(crate) struct MockConnector {
    mode: Mutex<MockMode>,
    dialed: Mutex<Vec<Url>>,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Creates an accepting connector and the stream of its peers.
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        Self::with_mode(MockMode::Accept)
    }

    /// Creates a connector with the given mode.
    pub(crate) fn with_mode(mode: MockMode) -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            mode: Mutex::new(mode),
            dialed: Mutex::new(Vec::new()),
            peers,
        });
        (connector, rx)
    }

    pub(crate) fn set_mode(&self, mode: MockMode) {
        *self.mode.lock() = mode;
    }

    /// URLs dialled so far, in order.
    pub(crate) fn dialed(&self) -> Vec<Url> {
        self.dialed.lock().clone()
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.dialed.lock().len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Socket> {
        self.dialed.lock().push(url.clone());

        let mode = *self.mode.lock();
        match mode {
            MockMode::Refuse => return Err(Error::connection("connection refused")),
            MockMode::Hang => future::pending::<()>().await,
            MockMode::Accept => {}
        }

        let (to_client, inbound) = mpsc::unbounded_channel::<Result<String>>();
        let (outbound, from_client) = mpsc::unbounded_channel::<String>();

        let stream = stream::unfold(inbound, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let sink = sink::unfold(outbound, |tx, text: String| async move {
            tx.send(text).map_err(|_| Error::ConnectionClosed)?;
            Ok::<_, Error>(tx)
        });

        let _ = self.peers.send(MockPeer {
            url: url.clone(),
            to_client: Some(to_client),
            from_client,
        });

        Ok(Socket::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Server side of one mock socket.
pub(crate) struct MockPeer {
    /// URL the client dialled.
    pub(crate) url: Url,
    to_client: Option<mpsc::UnboundedSender<Result<String>>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MockPeer {
    /// Sends a text frame to the client.
    pub(crate) fn push(&self, text: impl Into<String>) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Ok(text.into()));
        }
    }

    /// Sends a JSON frame to the client.
    pub(crate) fn push_json(&self, value: serde_json::Value) {
        self.push(value.to_string());
    }

    /// Raises a transport error on the client without closing.
    pub(crate) fn push_error(&self, message: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Err(Error::connection(message)));
        }
    }

    /// Closes the transport from the server side.
    pub(crate) fn drop_transport(&mut self) {
        self.to_client = None;
    }

    /// Next frame the client sent, if any is ready.
    pub(crate) fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Waits for the next client frame; `None` once the client closed.
    pub(crate) async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

/// Lets every runnable task make progress without advancing time.
pub(crate) async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
