/*!
 * Common test utilities for the translate-stream test suite
 */

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use translate_stream::endpoint::Endpoints;
use translate_stream::session::{SessionEvent, SessionUpdate};

/// Upper bound for anything a test waits on
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One step of a scripted WebSocket server
#[derive(Debug, Clone)]
pub enum ServerStep {
    /// Send a text frame
    Text(String),
    /// Close with a proper close handshake
    Close,
    /// Drop the TCP stream without a close handshake
    Drop,
    /// Keep the connection open until the client goes away
    Hold,
}

impl ServerStep {
    pub fn chunk(text: &str) -> Self {
        Self::Text(serde_json::json!({ "chunk": text }).to_string())
    }

    pub fn done() -> Self {
        Self::Text(r#"{"done":true}"#.to_string())
    }

    pub fn error(message: &str) -> Self {
        Self::Text(serde_json::json!({ "error": message }).to_string())
    }
}

/// Route `log` output through the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Endpoints pointing at a local test server
pub fn local_endpoints(port: u16) -> Endpoints {
    Endpoints::new(
        format!("http://127.0.0.1:{}", port),
        format!("ws://127.0.0.1:{}", port),
    )
}

/// Endpoints pointing at a port nothing listens on
pub async fn unreachable_endpoints() -> Result<Endpoints> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(local_endpoints(port))
}

/// Start a WebSocket server that accepts one connection and plays `script`
/// after the client's request frame
///
/// The join handle yields the request frame the client sent.
pub async fn spawn_ws_server(script: Vec<ServerStep>) -> Result<(Endpoints, JoinHandle<Option<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let handle = tokio::spawn(serve_ws_script(listener, script));
    Ok((local_endpoints(port), handle))
}

async fn serve_ws_script(listener: TcpListener, script: Vec<ServerStep>) -> Option<String> {
    let (stream, _) = listener.accept().await.ok()?;
    let mut ws = tokio_tungstenite::accept_async(stream).await.ok()?;

    let request = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => break text.as_str().to_string(),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    };

    for step in script {
        match step {
            ServerStep::Text(text) => {
                if ws.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            ServerStep::Close => {
                let _ = ws.close(None).await;
                break;
            }
            ServerStep::Drop => return Some(request),
            ServerStep::Hold => {
                while let Some(Ok(_)) = ws.next().await {}
                break;
            }
        }
    }

    Some(request)
}

/// Canned HTTP response
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Raw HTTP request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Start an HTTP server answering one connection per reply, in order
///
/// Every request is forwarded on the returned channel.
pub async fn spawn_http_server(
    replies: Vec<HttpReply>,
) -> Result<(Endpoints, mpsc::UnboundedReceiver<RecordedRequest>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if let Some(request) = read_http_request(&mut stream).await {
                let _ = tx.send(request);
            }
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                if reply.status < 400 { "OK" } else { "Error" },
                reply.body.len(),
                reply.body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Ok((local_endpoints(port), rx))
}

async fn read_http_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest { method, path, body })
}

/// Receive updates until one matches `predicate`, returning everything seen
pub async fn collect_until(
    updates: &mut mpsc::UnboundedReceiver<SessionUpdate>,
    predicate: impl Fn(&SessionUpdate) -> bool,
) -> Vec<SessionUpdate> {
    let mut seen = Vec::new();
    let result = tokio::time::timeout(TEST_TIMEOUT, async {
        while let Some(update) = updates.recv().await {
            let matched = predicate(&update);
            seen.push(update);
            if matched {
                return;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "Timed out waiting for update, saw {:?}", seen);
    seen
}

/// Receive updates until the session's connection ends
pub async fn collect_until_end(updates: &mut mpsc::UnboundedReceiver<SessionUpdate>) -> Vec<SessionUpdate> {
    collect_until(updates, |u| u.event.ends_session()).await
}

/// Events of a list of updates
pub fn events(updates: &[SessionUpdate]) -> Vec<SessionEvent> {
    updates.iter().map(|u| u.event.clone()).collect()
}
