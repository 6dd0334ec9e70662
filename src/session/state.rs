/*!
 * Pure translation session state machine.
 *
 * ```text
 * Idle --start--> Connecting --opened--> Streaming
 * Streaming --chunk--> Streaming (append)
 * Streaming --done--> Done
 * Connecting|Streaming --error frame / transport error--> Failed
 * Connecting|Streaming --cancel--> Idle
 * Streaming --closed without terminal frame--> Idle
 * any --start--> Connecting (new session id)
 * ```
 *
 * Every input is tagged with the session id of the connection it came from.
 * Inputs from an older session are reported as stale and never touch state.
 */

use log::{debug, warn};
use std::sync::Arc;

use super::frames::{ServerFrame, parse_server_frame};
use super::models::{
    SessionEvent, SessionFailure, SessionId, SessionPhase, SessionRequest, SessionSnapshot,
};

/// Something that happened on a session's connection
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// Connection opened and request frame sent
    Opened,
    /// Raw text frame received
    Frame(String),
    /// Transport failed (open, send or receive)
    TransportError(String),
    /// Transport closed by the peer
    Closed,
}

/// Outcome of applying an input
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The input belongs to a session that is no longer current
    Stale,
    /// The input was absorbed without changing state
    Ignored,
    /// State changed; the event describes the transition
    Updated(SessionEvent),
}

impl Applied {
    /// Whether the connection that produced the input should now be closed
    pub fn ends_connection(&self) -> bool {
        match self {
            Self::Stale => true,
            Self::Ignored => false,
            Self::Updated(event) => event.ends_session(),
        }
    }
}

/// State of the current session of a client
#[derive(Debug, Default)]
pub struct TranslationSession {
    id: SessionId,
    request: Option<Arc<SessionRequest>>,
    phase: SessionPhase,
    text: String,
}

impl TranslationSession {
    /// Create an idle session that was never started
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn request(&self) -> Option<&Arc<SessionRequest>> {
        self.request.as_ref()
    }

    /// Begin a new session, discarding the previous one
    ///
    /// # Returns
    /// * `SessionId` - Id that inputs of the new connection must carry
    pub fn restart(&mut self, request: Arc<SessionRequest>) -> SessionId {
        self.id = self.id.next();
        self.request = Some(request);
        self.phase = SessionPhase::Connecting;
        self.text.clear();
        self.id
    }

    /// Stop the current session if it is in flight
    pub fn cancel(&mut self) -> Option<SessionEvent> {
        if !self.phase.is_loading() {
            return None;
        }
        self.phase = SessionPhase::Idle;
        Some(SessionEvent::Cancelled)
    }

    /// Apply an input coming from the connection of session `id`
    pub fn apply(&mut self, id: SessionId, input: SessionInput) -> Applied {
        if id != self.id {
            debug!("Discarding input from stale session {} (current {})", id, self.id);
            return Applied::Stale;
        }

        if !self.phase.is_loading() {
            debug!("Discarding input for session {} in phase {}", id, self.phase);
            return Applied::Ignored;
        }

        match input {
            SessionInput::Opened => {
                if self.phase != SessionPhase::Connecting {
                    return Applied::Ignored;
                }
                self.phase = SessionPhase::Streaming;
                Applied::Updated(SessionEvent::Streaming)
            }
            SessionInput::Frame(raw) => self.apply_frame(&raw),
            SessionInput::TransportError(reason) => {
                warn!("Session {} transport error: {}", id, reason);
                self.fail(SessionFailure::connection())
            }
            SessionInput::Closed => match self.phase {
                SessionPhase::Streaming => {
                    warn!(
                        "Session {} closed before completion ({} chars received)",
                        id,
                        self.text.chars().count()
                    );
                    self.phase = SessionPhase::Idle;
                    Applied::Updated(SessionEvent::ConnectionLost)
                }
                _ => self.fail(SessionFailure::connection()),
            },
        }
    }

    fn apply_frame(&mut self, raw: &str) -> Applied {
        if self.phase != SessionPhase::Streaming {
            warn!("Session {} received a frame before the request was sent", self.id);
            return Applied::Ignored;
        }

        let frame = match parse_server_frame(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to parse stream frame: {}. Raw frame: {}", e, truncate(raw, 200));
                return Applied::Ignored;
            }
        };

        match frame {
            ServerFrame::Chunk(chunk) => {
                self.text.push_str(&chunk);
                Applied::Updated(SessionEvent::Chunk(chunk))
            }
            ServerFrame::Done => {
                debug!("Session {} done ({} chars)", self.id, self.text.chars().count());
                self.phase = SessionPhase::Done;
                Applied::Updated(SessionEvent::Completed)
            }
            ServerFrame::Error(message) => {
                warn!("Session {} failed on server: {}", self.id, message);
                self.fail(SessionFailure::protocol(message))
            }
            ServerFrame::Unrecognized(value) => {
                debug!("Ignoring unrecognized frame: {}", value);
                Applied::Ignored
            }
        }
    }

    fn fail(&mut self, failure: SessionFailure) -> Applied {
        self.phase = SessionPhase::Failed(failure.clone());
        Applied::Updated(SessionEvent::Failed(failure))
    }

    /// Copy of the current state for consumers
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            phase: self.phase.clone(),
            text: self.text.clone(),
            request: self.request.clone(),
        }
    }
}

fn truncate(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() > max_chars {
        format!("{}...", raw.chars().take(max_chars).collect::<String>())
    } else {
        raw.to_string()
    }
}
