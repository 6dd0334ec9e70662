/*!
 * Duplex transport used by translation sessions.
 *
 * A session only needs three things from its connection: send one text frame,
 * read text frames in delivery order, and close. These traits keep the session
 * client independent of the concrete socket implementation:
 * - `websocket`: tokio-tungstenite connection to a real backend
 * - `mock`: in-memory scripted peer for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::TransportError;

/// Opens duplex connections
///
/// Implementations must be shareable between sessions; each call to
/// `connect` yields an independent connection.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    /// Open a connection to the given URL
    ///
    /// # Returns
    /// * `Result<Box<dyn Connection>, TransportError>` - The open connection or the reason it failed
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// One open duplex connection, exclusively owned by a single session
#[async_trait]
pub trait Connection: Send {
    /// Send a text frame
    async fn send_text(&mut self, payload: String) -> Result<(), TransportError>;

    /// Receive the next text frame
    ///
    /// # Returns
    /// * `None` once the peer has closed the connection
    async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection; errors while closing are not reported
    async fn close(&mut self);
}

pub mod mock;
pub mod websocket;

pub use mock::{MockConnector, MockPeer};
pub use websocket::WebSocketConnector;
