/*!
 * # translate-stream - Streaming translation client
 *
 * A Rust library for talking to a streaming text-translation backend.
 *
 * ## Features
 *
 * - Streaming translation sessions over a WebSocket:
 *   - One request frame per session, fragments appended in delivery order
 *   - Explicit phases (idle, connecting, streaming, done, failed)
 *   - Cancellation and restart without cross-session corruption
 *   - Malformed frames are logged and skipped
 * - Endpoint resolution from an explicit override or the page origin
 * - Backend status probe, single-request translation and model switching
 * - ISO 639-1 and ISO 639-2 language tags with region subtags
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `endpoint`: HTTP and stream base URL resolution
 * - `session`: The streaming session client:
 *   - `session::state`: Pure session state machine
 *   - `session::frames`: Stream protocol framing
 *   - `session::client`: Connection lifecycle and update publishing
 * - `transport`: Duplex connection traits, WebSocket and mock implementations
 * - `backend`: HTTP API client and wire types
 * - `app_controller`: Main application controller
 * - `language_utils`: Language tag utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod backend;
pub mod endpoint;
pub mod errors;
pub mod language_utils;
pub mod session;
pub mod transport;

// Re-export main types for easier usage
pub use app_config::Config;
pub use backend::{BackendClient, ModelVariant, SystemStatus};
pub use endpoint::{Endpoints, PageOrigin};
pub use errors::{AppError, BackendError, EndpointError, FrameError, SessionError, TransportError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use session::{
    SessionClient, SessionEvent, SessionObserver, SessionPhase, SessionSnapshot, SessionUpdate,
};
