//! Shared chat wire model and JSON codec for the socket and REST transports.
//!
//! This crate owns the wire representation used by both `server` and `client`.
//! Socket frames are JSON text tagged by `type`; REST bodies reuse the same
//! `ChatMessage` shape so a record looks identical on either path.
//!
//! DESIGN
//! ======
//! Payload normalization lives here rather than in the hub so the client can
//! reject oversized or empty input before it ever touches the network, using
//! exactly the rules the hub will apply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// LIMITS
// =============================================================================

/// Capacity of the authoritative history and of the client-side cache.
pub const HISTORY_LIMIT: usize = 100;

/// Maximum display-name length, in UTF-16 code units, after trimming.
pub const NAME_LIMIT: usize = 30;

/// Maximum message length, in UTF-16 code units, after trimming.
pub const MESSAGE_LIMIT: usize = 200;

/// Socket frame `type` carried by chat submissions and broadcasts.
pub const MESSAGE_FRAME_TYPE: &str = "message";

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A chat record as stored by the hub and seen on the wire.
///
/// `timestamp` is assigned by the hub at append time and is the only ordering
/// authority; `client_id` is the opaque per-session origin id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    pub name: String,
    pub message: String,
    pub timestamp: i64,
    #[serde(rename = "clientId", default)]
    pub client_id: String,
}

impl ChatMessage {
    /// De-duplication key: `(origin id, server timestamp)`.
    #[must_use]
    pub fn dedup_key(&self) -> (String, i64) {
        (self.client_id.clone(), self.timestamp)
    }
}

// =============================================================================
// SOCKET FRAMES
// =============================================================================

/// Frames sent from the hub to a subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Full history snapshot, sent once right after the upgrade.
    History { messages: Vec<ChatMessage> },
    /// One newly appended record, sent to every subscriber.
    Message { message: ChatMessage },
}

/// Frames sent from a client to the hub.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Message {
        name: String,
        message: String,
        #[serde(rename = "clientId")]
        client_id: String,
    },
}

impl From<&Draft> for ClientFrame {
    fn from(draft: &Draft) -> Self {
        Self::Message { name: draft.name.clone(), message: draft.message.clone(), client_id: draft.client_id.clone() }
    }
}

// =============================================================================
// REST BODIES
// =============================================================================

/// Body of `POST /api/chat/send`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub name: String,
    pub message: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

impl From<&Draft> for SendRequest {
    fn from(draft: &Draft) -> Self {
        Self { name: draft.name.clone(), message: draft.message.clone(), client_id: draft.client_id.clone() }
    }
}

/// Success body of `POST /api/chat/send`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub message: ChatMessage,
}

/// Body of `GET /api/chat/history` and `GET /api/chat/messages`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

/// Error body returned by REST handlers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// PAYLOAD NORMALIZATION
// =============================================================================

/// Why a chat payload was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("frame type is not \"message\"")]
    UnknownType,
    #[error("field `{0}` must be a string")]
    FieldType(&'static str),
    #[error("please enter your name")]
    EmptyName,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("name is {len} UTF-16 units (max {max})")]
    NameTooLong { len: usize, max: usize },
    #[error("message is {len} UTF-16 units (max {max})")]
    MessageTooLong { len: usize, max: usize },
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAnObject | Self::UnknownType | Self::FieldType(_) => "E_MALFORMED",
            Self::EmptyName => "E_EMPTY_NAME",
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::NameTooLong { .. } => "E_NAME_TOO_LONG",
            Self::MessageTooLong { .. } => "E_MESSAGE_TOO_LONG",
        }
    }
}

/// A trimmed, length-checked submission that has not been timestamped yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub message: String,
    pub client_id: String,
}

impl Draft {
    /// Trim and validate the three submission fields.
    ///
    /// Lengths are counted in UTF-16 code units, the unit browser clients
    /// measure in, so a character outside the BMP counts as two.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when either field is empty after trimming
    /// or exceeds its length limit.
    pub fn normalize(name: &str, message: &str, client_id: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let message = message.trim();

        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let name_len = name.encode_utf16().count();
        if name_len > NAME_LIMIT {
            return Err(ValidationError::NameTooLong { len: name_len, max: NAME_LIMIT });
        }
        let message_len = message.encode_utf16().count();
        if message_len > MESSAGE_LIMIT {
            return Err(ValidationError::MessageTooLong { len: message_len, max: MESSAGE_LIMIT });
        }

        Ok(Self { name: name.to_owned(), message: message.to_owned(), client_id: client_id.trim().to_owned() })
    }

    /// Validate an untrusted JSON payload of shape `{name, message, clientId}`.
    ///
    /// A missing or null `clientId` is accepted as the empty id.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for non-object payloads, non-string
    /// fields, and anything [`Draft::normalize`] rejects.
    pub fn from_value(payload: &Value) -> Result<Self, ValidationError> {
        let Some(obj) = payload.as_object() else {
            return Err(ValidationError::NotAnObject);
        };
        let name = string_field(obj, "name")?.unwrap_or_default();
        let message = string_field(obj, "message")?.unwrap_or_default();
        let client_id = string_field(obj, "clientId")?.unwrap_or_default();
        Self::normalize(name, message, client_id)
    }

    /// Validate an untrusted socket frame; it must also carry `type:"message"`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownType`] for any other frame type, plus
    /// everything [`Draft::from_value`] rejects.
    pub fn from_frame(frame: &Value) -> Result<Self, ValidationError> {
        match frame.get("type").and_then(Value::as_str) {
            Some(MESSAGE_FRAME_TYPE) => Self::from_value(frame),
            _ if !frame.is_object() => Err(ValidationError::NotAnObject),
            _ => Err(ValidationError::UnknownType),
        }
    }

    /// Stamp the draft with a server-assigned timestamp.
    #[must_use]
    pub fn into_message(self, timestamp: i64) -> ChatMessage {
        ChatMessage { name: self.name, message: self.message, timestamp, client_id: self.client_id }
    }
}

fn string_field<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Option<&'a str>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ValidationError::FieldType(key)),
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Error returned by the decode helpers.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a frame as JSON text.
///
/// Serializing these plain structs cannot fail, so an encoding error
/// degrades to an empty string instead of a panic.
#[must_use]
pub fn encode_frame<T: Serialize>(frame: &T) -> String {
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode a hub-to-client frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text or unknown frame types.
pub fn decode_server_frame(text: &str) -> Result<ServerFrame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
