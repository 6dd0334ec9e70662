/*!
 * Streaming translation sessions.
 *
 * This module provides:
 * - `models`: request snapshot, phases, events and published snapshots
 * - `frames`: request frame encoding and server frame classification
 * - `state`: the pure session state machine
 * - `client`: the async client owning the connection and its lifecycle
 */

pub mod client;
pub mod frames;
pub mod models;
pub mod state;

// Re-export main types
pub use client::{SessionClient, SessionObserver};
pub use frames::{RequestFrame, ServerFrame, parse_server_frame};
pub use models::{
    CONNECTION_FAILED_MESSAGE, FailureKind, SessionEvent, SessionFailure, SessionId, SessionPhase,
    SessionRequest, SessionSnapshot, SessionUpdate,
};
pub use state::{Applied, SessionInput, TranslationSession};
