//! REST fallback routes for clients without a live socket.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use frames::{ErrorCode, ErrorResponse, MessagesResponse, SendResponse, ValidationError};
use tracing::debug;

use crate::state::AppState;

const INVALID_PAYLOAD: &str = "Invalid chat payload";

/// `GET /api/chat/history`: full current bounded history.
pub async fn history(State(state): State<AppState>) -> Json<MessagesResponse> {
    Json(MessagesResponse { messages: state.hub.history() })
}

/// `GET /api/chat/messages?since=<epoch-ms>`: messages newer than `since`.
pub async fn messages(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<MessagesResponse> {
    let since = params.get("since").map_or(0, |raw| parse_since(raw));
    Json(MessagesResponse { messages: state.hub.history_since(since) })
}

/// `POST /api/chat/send`: validate, append, broadcast, and echo the record.
pub async fn send(State(state): State<AppState>, body: Result<Json<serde_json::Value>, JsonRejection>) -> Response {
    let Json(payload) = match body {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "chat: unreadable send body");
            return invalid_payload(None);
        }
    };

    match state.hub.submit(&payload) {
        Ok(message) => Json(SendResponse { message }).into_response(),
        Err(e) => {
            debug!(code = e.error_code(), error = %e, "chat: rejected send");
            invalid_payload(Some(&e))
        }
    }
}

fn invalid_payload(err: Option<&ValidationError>) -> Response {
    let body = ErrorResponse {
        error: INVALID_PAYLOAD.to_owned(),
        code: Some(err.map_or("E_MALFORMED", |e| e.error_code()).to_owned()),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Lenient `since` parsing: leading whitespace is skipped, then an optional
/// sign and the leading decimal digits are read. Trailing junk is ignored
/// (`"123abc"` is 123). No digits at all counts as 0, so a bad cursor
/// returns everything.
fn parse_since(raw: &str) -> i64 {
    let raw = raw.trim_start();
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let end = raw.len() - unsigned.len() + digits;
    raw[..end].parse().unwrap_or(0)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
