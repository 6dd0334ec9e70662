/*!
 * Streaming translation session client.
 *
 * The client owns at most one live connection. Each connection is driven by
 * its own task, which feeds inputs back into the shared session state tagged
 * with the session id it was opened for. Starting a new session or cancelling
 * signals the old task to close its connection; anything it still delivers is
 * discarded by the id check.
 *
 * Observers are notified while the state lock is held, so every observer sees
 * every update in the order the transitions happened. Observers must not call
 * back into the client from `on_update`.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use crate::backend::ModelVariant;
use crate::endpoint::Endpoints;
use crate::errors::SessionError;
use crate::transport::{Connection, Connector};

use super::frames::RequestFrame;
use super::models::{SessionEvent, SessionId, SessionRequest, SessionSnapshot, SessionUpdate};
use super::state::{Applied, SessionInput, TranslationSession};

/// Receives every session update, synchronously and in order
pub trait SessionObserver: Send + Sync {
    fn on_update(&self, update: &SessionUpdate);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionUpdate) + Send + Sync,
{
    fn on_update(&self, update: &SessionUpdate) {
        self(update)
    }
}

/// Observer forwarding updates into an unbounded channel
struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionObserver for ChannelObserver {
    fn on_update(&self, update: &SessionUpdate) {
        // A dropped receiver just stops listening
        let _ = self.tx.send(update.clone());
    }
}

/// Handle on the connection task of the current session
struct ActiveConnection {
    id: SessionId,
    close_tx: oneshot::Sender<()>,
}

impl ActiveConnection {
    fn close(self) {
        debug!("Closing connection of session {}", self.id);
        // The task may already have finished on its own
        let _ = self.close_tx.send(());
    }
}

struct Inner {
    session: TranslationSession,
    active: Option<ActiveConnection>,
    observers: Vec<Box<dyn SessionObserver>>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl Inner {
    fn publish(&mut self, event: SessionEvent) {
        let update = SessionUpdate {
            event,
            snapshot: self.session.snapshot(),
        };
        for observer in &self.observers {
            observer.on_update(&update);
        }
        self.snapshots.send_replace(update.snapshot);
    }
}

/// State shared between the client and its connection tasks
struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn is_current(&self, id: SessionId) -> bool {
        let inner = self.inner.lock();
        inner.session.id() == id && inner.session.phase().is_loading()
    }

    fn apply(&self, id: SessionId, input: SessionInput) -> Applied {
        let mut inner = self.inner.lock();
        let applied = inner.session.apply(id, input);
        if let Applied::Updated(event) = &applied {
            if event.ends_session() && inner.active.as_ref().is_some_and(|a| a.id == id) {
                inner.active = None;
            }
            inner.publish(event.clone());
        }
        applied
    }
}

/// Client running one streaming translation session at a time
pub struct SessionClient {
    endpoints: Endpoints,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionClient {
    /// Create an idle client that connects through the given connector
    pub fn new(endpoints: Endpoints, connector: Arc<dyn Connector>) -> Self {
        let (snapshots_tx, snapshots) = watch::channel(SessionSnapshot::default());
        let inner = Inner {
            session: TranslationSession::new(),
            active: None,
            observers: Vec::new(),
            snapshots: snapshots_tx,
        };

        Self {
            endpoints,
            connector,
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
            }),
            snapshots,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Register an observer for all future updates
    pub fn add_observer(&self, observer: impl SessionObserver + 'static) {
        self.shared.inner.lock().observers.push(Box::new(observer));
    }

    /// Subscribe to all future updates through a channel
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_observer(ChannelObserver { tx });
        rx
    }

    /// Current state of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.inner.lock().session.snapshot()
    }

    /// Start translating `text`, replacing any session in flight
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        model: ModelVariant,
    ) -> Result<SessionId, SessionError> {
        self.start_request(SessionRequest::new(text, source_lang, target_lang, model))
    }

    /// Start a session from prepared request parameters
    pub fn start_request(&self, request: SessionRequest) -> Result<SessionId, SessionError> {
        if !request.has_content() {
            debug!("Ignoring translation request with empty text");
            return Err(SessionError::EmptyInput);
        }
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let request = Arc::new(request);
        let url = self.endpoints.stream_url();
        let (close_tx, close_rx) = oneshot::channel();

        let mut inner = self.shared.inner.lock();
        if let Some(previous) = inner.active.take() {
            previous.close();
        }

        let id = inner.session.restart(Arc::clone(&request));
        info!(
            "Starting session {}: {} -> {} ({} chars, model {})",
            id,
            request.source_lang,
            request.target_lang,
            request.text.chars().count(),
            request.model
        );
        inner.publish(SessionEvent::Started);

        runtime.spawn(drive_connection(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            url,
            id,
            request,
            close_rx,
        ));
        inner.active = Some(ActiveConnection { id, close_tx });

        Ok(id)
    }

    /// Start again with the parameters of the last session
    pub fn retry(&self) -> Result<SessionId, SessionError> {
        let request = self
            .shared
            .inner
            .lock()
            .session
            .request()
            .map(|r| r.as_ref().clone())
            .ok_or(SessionError::NothingToRetry)?;
        self.start_request(request)
    }

    /// Stop the session in flight; does nothing when there is none
    pub fn cancel(&self) {
        let mut inner = self.shared.inner.lock();
        if let Some(active) = inner.active.take() {
            active.close();
        }
        if let Some(event) = inner.session.cancel() {
            info!("Session {} cancelled", inner.session.id());
            inner.publish(event);
        }
    }

    /// Wait until the current session is no longer connecting or streaming
    pub async fn wait_until_settled(&self) -> SessionSnapshot {
        let mut snapshots = self.snapshots.clone();
        if let Ok(snapshot) = snapshots.wait_for(|s| !s.is_loading()).await {
            return snapshot.clone();
        }
        self.snapshot()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(active) = self.shared.inner.lock().active.take() {
            active.close();
        }
    }
}

/// Run one session's connection until it ends or is told to close
async fn drive_connection(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    url: String,
    id: SessionId,
    request: Arc<SessionRequest>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let opened = tokio::select! {
        _ = &mut close_rx => {
            debug!("Session {} closed while connecting", id);
            return;
        }
        opened = connector.connect(&url) => opened,
    };

    let mut connection = match opened {
        Ok(connection) => connection,
        Err(e) => {
            shared.apply(id, SessionInput::TransportError(e.to_string()));
            return;
        }
    };

    if !shared.is_current(id) {
        connection.close().await;
        return;
    }

    if let Err(reason) = send_request(connection.as_mut(), &request).await {
        shared.apply(id, SessionInput::TransportError(reason));
        connection.close().await;
        return;
    }

    if shared.apply(id, SessionInput::Opened).ends_connection() {
        connection.close().await;
        return;
    }

    loop {
        let received = tokio::select! {
            biased;
            _ = &mut close_rx => {
                connection.close().await;
                return;
            }
            received = connection.recv_text() => received,
        };

        let applied = match received {
            Some(Ok(text)) => shared.apply(id, SessionInput::Frame(text)),
            Some(Err(e)) => shared.apply(id, SessionInput::TransportError(e.to_string())),
            None => {
                shared.apply(id, SessionInput::Closed);
                return;
            }
        };

        if applied.ends_connection() {
            connection.close().await;
            return;
        }
    }
}

async fn send_request(connection: &mut dyn Connection, request: &SessionRequest) -> Result<(), String> {
    let payload = RequestFrame::from_request(request)
        .to_json()
        .map_err(|e| format!("failed to encode request frame: {}", e))?;
    connection.send_text(payload).await.map_err(|e| {
        warn!("Failed to send request frame: {}", e);
        e.to_string()
    })
}
