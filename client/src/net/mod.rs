//! Transports to the hub.
//!
//! The connection manager only sees the two traits below, so tests can swap
//! in scripted transports while the binaries use the tokio-tungstenite
//! socket and the reqwest REST client.

pub mod http;
pub mod ws;

use async_trait::async_trait;
use frames::{ChatMessage, ClientFrame, ErrorCode, SendRequest, ServerFrame};
use tokio::sync::mpsc;

pub use http::HttpChatApi;
pub use ws::WsConnector;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected payload with status {status}")]
    Rejected { status: u16, code: Option<String> },
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::WsConnect(_) => "E_WS_CONNECT",
            Self::WsClosed => "E_WS_CLOSED",
            Self::Http(_) => "E_HTTP",
            Self::Rejected { .. } => "E_REJECTED",
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// An open socket, already past the handshake.
///
/// Dropping `outbound` closes the socket; `inbound` yields `None` once the
/// socket is gone for any reason.
#[derive(Debug)]
pub struct SocketLink {
    pub outbound: mpsc::UnboundedSender<ClientFrame>,
    pub inbound: mpsc::UnboundedReceiver<ServerFrame>,
}

#[async_trait]
pub trait SocketConnector: Send + Sync + 'static {
    /// Dial the hub and complete the handshake.
    async fn connect(&self) -> Result<SocketLink, TransportError>;
}

/// REST fallback endpoints.
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    /// `GET /api/chat/messages?since=`
    async fn fetch_since(&self, since: i64) -> Result<Vec<ChatMessage>, TransportError>;

    /// `GET /api/chat/history`
    async fn fetch_history(&self) -> Result<Vec<ChatMessage>, TransportError>;

    /// `POST /api/chat/send`; returns the stored record.
    async fn send(&self, request: &SendRequest) -> Result<ChatMessage, TransportError>;
}
