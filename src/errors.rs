/*!
 * Error types for the translate-stream client.
 *
 * This module contains custom error types for the different parts of the client,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised while classifying a single inbound stream frame
///
/// A frame error never ends a session; the frame is logged and skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The payload is not valid JSON
    #[error("Frame is not valid JSON: {0}")]
    InvalidJson(String),

    /// The payload is JSON but not an object
    #[error("Frame is not a JSON object")]
    NotAnObject,

    /// A known key carried a value of the wrong type
    #[error("Frame field '{field}' has unexpected type: {found}")]
    InvalidField {
        /// Name of the offending key
        field: &'static str,
        /// JSON type that was found instead
        found: &'static str,
    },
}

/// Errors from the duplex transport underneath a session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The connection could not be established
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// Writing to the connection failed
    #[error("Failed to send frame: {0}")]
    Send(String),

    /// Reading from the connection failed
    #[error("Failed to receive frame: {0}")]
    Receive(String),
}

/// Errors returned synchronously by the session client's public operations
///
/// Failures that happen after a session has started are not returned here;
/// they are reported through the session phase instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The text to translate is empty or whitespace-only
    #[error("Nothing to translate: input text is empty")]
    EmptyInput,

    /// `start` was called outside of a tokio runtime
    #[error("A tokio runtime is required to start a session")]
    NoRuntime,

    /// `retry` was called before any session was started
    #[error("No previous translation request to retry")]
    NothingToRetry,
}

/// Errors that can occur when talking to the backend HTTP API
#[derive(Error, Debug)]
pub enum BackendError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The non-streaming translate endpoint answered with a non-2xx status
    #[error("Translation failed (HTTP {status_code})")]
    TranslationFailed {
        /// HTTP status code
        status_code: u16,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Errors that can occur while resolving service endpoints
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EndpointError {
    /// The page origin could not be parsed
    #[error("Invalid origin '{0}'")]
    InvalidOrigin(String),

    /// The origin uses a scheme other than http or https
    #[error("Unsupported origin scheme '{0}'")]
    UnsupportedScheme(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the backend HTTP API
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from the session client
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Error from endpoint resolution
    #[error("Endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// A session ended without a successful translation
    #[error("Translation failed: {0}")]
    Translation(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}
