//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the chat websocket and the REST fallback endpoints under
//! a single Axum router. Page serving and everything else in the host
//! application is mounted by whoever embeds this router.

pub mod chat;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// WebSocket path for live chat subscribers.
pub const WS_PATH: &str = "/chat";

/// Chat websocket + REST fallback routes.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(WS_PATH, get(ws::handle_ws))
        .route("/api/chat/history", get(chat::history))
        .route("/api/chat/messages", get(chat::messages))
        .route("/api/chat/send", post(chat::send))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
