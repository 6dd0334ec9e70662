/*!
 * Stream protocol framing.
 *
 * Outbound: one request frame per session, sent right after the socket opens.
 * Inbound: JSON objects classified by which key they carry. The keys are
 * checked in the order `chunk`, `done`, `error`, and a falsy value (empty
 * string, null, false, zero) counts as absent.
 */

use serde::Serialize;
use serde_json::Value;

use crate::backend::{ContentType, ModelVariant};
use crate::errors::FrameError;

use super::models::SessionRequest;

/// Request frame sent once per session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestFrame<'a> {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    pub content: &'a str,
    pub model: ModelVariant,
}

impl<'a> RequestFrame<'a> {
    /// Build the frame from a session's request snapshot
    pub fn from_request(request: &'a SessionRequest) -> Self {
        Self {
            content_type: ContentType::Text,
            source_lang: &request.source_lang,
            target_lang: &request.target_lang,
            content: &request.text,
            model: request.model,
        }
    }

    /// Serialize the frame to its JSON text form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Classified server frame
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// Fragment of translated text
    Chunk(String),
    /// Stream completed successfully
    Done,
    /// Server-side failure message
    Error(String),
    /// Valid object without any recognized key
    Unrecognized(Value),
}

impl ServerFrame {
    /// Whether this frame ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Parse and classify one inbound text frame
pub fn parse_server_frame(raw: &str) -> Result<ServerFrame, FrameError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| FrameError::InvalidJson(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(FrameError::NotAnObject);
    };

    // An empty or null chunk counts as absent and falls through to `done`
    match map.get("chunk") {
        Some(Value::String(text)) if !text.is_empty() => return Ok(ServerFrame::Chunk(text.clone())),
        Some(Value::String(_)) | Some(Value::Null) | None => {}
        Some(other) => {
            return Err(FrameError::InvalidField {
                field: "chunk",
                found: json_type(other),
            });
        }
    }

    if map.get("done").is_some_and(is_truthy) {
        return Ok(ServerFrame::Done);
    }

    match map.get("error") {
        Some(Value::String(message)) if !message.is_empty() => {
            return Ok(ServerFrame::Error(message.clone()));
        }
        Some(other) if !other.is_string() && is_truthy(other) => {
            return Ok(ServerFrame::Error(other.to_string()));
        }
        _ => {}
    }

    Ok(ServerFrame::Unrecognized(Value::Object(map)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
