/*!
 * Session-facing models: request snapshot, phases, events and snapshots.
 *
 * The phase enum replaces a set of independent flags (loading, error, done),
 * so that combinations such as "loading and done" cannot be represented.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::backend::ModelVariant;

/// Message reported for any transport-level failure
pub const CONNECTION_FAILED_MESSAGE: &str = "Connection failed. Please check backend status.";

/// Monotonic generation number identifying one session of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable parameters of one translation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Text to translate
    pub text: String,
    /// Source language tag
    pub source_lang: String,
    /// Target language tag
    pub target_lang: String,
    /// Model variant to translate with
    pub model: ModelVariant,
}

impl SessionRequest {
    /// Create new request parameters
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        model: ModelVariant,
    ) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            model,
        }
    }

    /// Whether there is anything to translate
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Origin of a session failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The transport failed to open or dropped abnormally
    Connection,
    /// The server reported an error frame
    Protocol,
}

/// Why a session failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: FailureKind,
    /// Human-readable message for the caller
    pub message: String,
}

impl SessionFailure {
    /// Generic connectivity failure
    pub fn connection() -> Self {
        Self {
            kind: FailureKind::Connection,
            message: CONNECTION_FAILED_MESSAGE.to_string(),
        }
    }

    /// Failure reported by the server, passed through verbatim
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Protocol,
            message: message.into(),
        }
    }
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Lifecycle phase of a session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No request in flight (never started, cancelled, or closed early)
    #[default]
    Idle,
    /// Waiting for the connection to open
    Connecting,
    /// Request sent, receiving fragments
    Streaming,
    /// Server signaled completion
    Done,
    /// Connection or protocol failure
    Failed(SessionFailure),
}

impl SessionPhase {
    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming)
    }

    /// Whether the session reached `Done` or `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Short lowercase name for logging and display
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One typed transition of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new session was started and is connecting
    Started,
    /// The connection opened and the request frame was sent
    Streaming,
    /// A fragment was appended
    Chunk(String),
    /// The server signaled completion
    Completed,
    /// The session failed
    Failed(SessionFailure),
    /// The caller cancelled the session
    Cancelled,
    /// The transport closed before a terminal frame arrived
    ConnectionLost,
}

impl SessionEvent {
    /// Whether this event ends the session's connection
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed(_) | Self::Cancelled | Self::ConnectionLost
        )
    }
}

/// Read-only view of a session published to consumers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    /// Text accumulated so far
    pub text: String,
    /// Request the session was started with
    pub request: Option<Arc<SessionRequest>>,
}

impl SessionSnapshot {
    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Whether the server signaled completion
    pub fn is_done(&self) -> bool {
        self.phase == SessionPhase::Done
    }

    /// Failure message, present only in the `Failed` phase
    pub fn error_detail(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Failed(failure) => Some(&failure.message),
            _ => None,
        }
    }
}

/// Notification delivered to observers for every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub event: SessionEvent,
    pub snapshot: SessionSnapshot,
}
