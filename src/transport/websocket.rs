use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::errors::TransportError;

use super::{Connection, Connector};

/// Connector that opens WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        debug!("Opening WebSocket connection to {}", url);
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(format!("{}: {}", url, e)))?;

        Ok(Box::new(WebSocketConnection { stream }))
    }
}

/// Open WebSocket connection
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send_text(&mut self, payload: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_string())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("Skipping non UTF-8 binary frame ({} bytes)", bytes.len()),
                },
                Ok(Message::Close(frame)) => {
                    debug!("Peer closed the connection: {:?}", frame);
                    return None;
                }
                Ok(other) => trace!("Skipping control frame: {:?}", other),
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    return None;
                }
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!("Error while closing WebSocket: {}", e);
        }
    }
}
