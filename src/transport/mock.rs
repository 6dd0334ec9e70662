/*!
 * In-memory transport for testing session behavior.
 *
 * Every successful `connect` hands a `MockPeer` to the test, which then plays
 * the server side of that connection:
 * - `MockConnector::new()` - Connections open immediately
 * - `MockConnector::refusing()` - Every connection attempt fails
 * - `MockConnector::stalled()` - Connection attempts never complete
 * - `MockConnector::holding_requests()` - Connections open, but the client's
 *   request frame is held until the peer releases it
 */

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc, oneshot, watch};

use crate::errors::TransportError;

use super::{Connection, Connector};

/// Behavior mode for connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Connections open immediately
    Accepting,
    /// Connections are refused
    Refusing,
    /// Connection attempts hang forever
    Stalled,
    /// Connections open, request frames wait for `MockPeer::release_request`
    HoldingRequests,
}

/// Something the mock server pushes to the client
#[derive(Debug, Clone, PartialEq)]
enum ServerMessage {
    Text(String),
    Error(String),
    Close,
}

/// Mock connector handing out scripted connections
#[derive(Clone)]
pub struct MockConnector {
    behavior: MockBehavior,
    attempts: Arc<AtomicUsize>,
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    peers_rx: Arc<Mutex<mpsc::UnboundedReceiver<MockPeer>>>,
}

impl MockConnector {
    /// Create a mock connector with the specified behavior
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            behavior,
            attempts: Arc::new(AtomicUsize::new(0)),
            peers_tx,
            peers_rx: Arc::new(Mutex::new(peers_rx)),
        }
    }

    /// Create a connector whose connections open immediately
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::Accepting)
    }

    /// Create a connector that refuses every connection
    pub fn refusing() -> Self {
        Self::with_behavior(MockBehavior::Refusing)
    }

    /// Create a connector whose connection attempts never complete
    pub fn stalled() -> Self {
        Self::with_behavior(MockBehavior::Stalled)
    }

    /// Create a connector that holds each request frame until released
    pub fn holding_requests() -> Self {
        Self::with_behavior(MockBehavior::HoldingRequests)
    }

    /// Number of connection attempts made so far
    pub fn connection_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the server side of the next opened connection
    pub async fn next_peer(&self) -> Option<MockPeer> {
        self.peers_rx.lock().await.recv().await
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnector")
            .field("behavior", &self.behavior)
            .field("attempts", &self.connection_attempts())
            .finish()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Refusing => {
                return Err(TransportError::Connect(format!("{}: connection refused", url)));
            }
            MockBehavior::Stalled => std::future::pending::<()>().await,
            MockBehavior::Accepting | MockBehavior::HoldingRequests => {}
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let (held_request, request_waiting, request_release) =
            if self.behavior == MockBehavior::HoldingRequests {
                let (waiting_tx, waiting_rx) = oneshot::channel();
                let (release_tx, release_rx) = oneshot::channel();
                (Some(HeldRequest { waiting_tx, release_rx }), Some(waiting_rx), Some(release_tx))
            } else {
                (None, None, None)
            };

        let peer = MockPeer {
            url: url.to_string(),
            to_client,
            from_client,
            closed: closed_rx,
            request_waiting,
            request_release,
        };
        self.peers_tx
            .send(peer)
            .map_err(|_| TransportError::Connect("mock connector dropped".to_string()))?;

        Ok(Box::new(MockConnection {
            incoming,
            outgoing,
            closed: closed_tx,
            held_request,
        }))
    }
}

/// Server side of one mock connection
pub struct MockPeer {
    url: String,
    to_client: mpsc::UnboundedSender<ServerMessage>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: watch::Receiver<bool>,
    request_waiting: Option<oneshot::Receiver<()>>,
    request_release: Option<oneshot::Sender<()>>,
}

impl MockPeer {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next frame sent by the client
    pub async fn recv_frame(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Push a raw text frame to the client
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(ServerMessage::Text(text.into())).is_ok()
    }

    /// Push a `{"chunk": ...}` frame
    pub fn send_chunk(&self, chunk: &str) -> bool {
        self.send_text(serde_json::json!({ "chunk": chunk }).to_string())
    }

    /// Push a `{"done": true}` frame
    pub fn send_done(&self) -> bool {
        self.send_text(r#"{"done":true}"#)
    }

    /// Push an `{"error": ...}` frame
    pub fn send_error(&self, message: &str) -> bool {
        self.send_text(serde_json::json!({ "error": message }).to_string())
    }

    /// Make the client's next read fail with a transport error
    pub fn fail(&self, reason: &str) -> bool {
        self.to_client.send(ServerMessage::Error(reason.to_string())).is_ok()
    }

    /// Close the connection from the server side
    pub fn close(&self) -> bool {
        self.to_client.send(ServerMessage::Close).is_ok()
    }

    /// Whether the client has closed (or dropped) its end
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.closed.has_changed().is_err()
    }

    /// Wait until the client is blocked sending its request frame
    ///
    /// Returns false for connectors that do not hold requests.
    pub async fn wait_request_held(&mut self) -> bool {
        match self.request_waiting.take() {
            Some(waiting) => waiting.await.is_ok(),
            None => false,
        }
    }

    /// Let a held request frame through
    pub fn release_request(&mut self) -> bool {
        self.request_release
            .take()
            .is_some_and(|release| release.send(()).is_ok())
    }

    /// Wait until the client closes its end
    pub async fn wait_closed(&mut self) {
        // An error means the client end was dropped, which counts as closed
        let _ = self.closed.wait_for(|closed| *closed).await;
    }
}

/// Client side of a held request frame
struct HeldRequest {
    waiting_tx: oneshot::Sender<()>,
    release_rx: oneshot::Receiver<()>,
}

struct MockConnection {
    incoming: mpsc::UnboundedReceiver<ServerMessage>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: watch::Sender<bool>,
    held_request: Option<HeldRequest>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, payload: String) -> Result<(), TransportError> {
        if let Some(held) = self.held_request.take() {
            let _ = held.waiting_tx.send(());
            if held.release_rx.await.is_err() {
                return Err(TransportError::Send("peer went away".to_string()));
            }
        }
        if *self.closed.borrow() {
            return Err(TransportError::Send("connection closed".to_string()));
        }
        self.outgoing
            .send(payload)
            .map_err(|_| TransportError::Send("peer went away".to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        if *self.closed.borrow() {
            return None;
        }
        match self.incoming.recv().await? {
            ServerMessage::Text(text) => Some(Ok(text)),
            ServerMessage::Error(reason) => Some(Err(TransportError::Receive(reason))),
            ServerMessage::Close => None,
        }
    }

    async fn close(&mut self) {
        self.incoming.close();
        self.closed.send_replace(true);
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.closed.send_replace(true);
    }
}
