//! Scripted transports shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use frames::{ChatMessage, ClientFrame, SendRequest, ServerFrame};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::net::{ChatApi, SocketConnector, SocketLink, TransportError};

/// The hub's side of a scripted socket.
pub struct FarEnd {
    pub to_client: mpsc::UnboundedSender<ServerFrame>,
    pub from_client: mpsc::UnboundedReceiver<ClientFrame>,
}

pub fn socket_pair() -> (SocketLink, FarEnd) {
    let (outbound, from_client) = mpsc::unbounded_channel();
    let (to_client, inbound) = mpsc::unbounded_channel();
    (SocketLink { outbound, inbound }, FarEnd { to_client, from_client })
}

/// Hands out queued links; every dial beyond the queue fails.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Option<SocketLink>>>,
    dials: Mutex<Vec<Instant>>,
}

impl ScriptedConnector {
    /// Next dial fails.
    pub fn push_failure(&self) {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(None);
    }

    /// Next dial succeeds; returns the hub end.
    pub fn push_link(&self) -> FarEnd {
        let (link, far) = socket_pair();
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(Some(link));
        far
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn dial_times(&self) -> Vec<Instant> {
        self.dials.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl SocketConnector for ScriptedConnector {
    async fn connect(&self) -> Result<SocketLink, TransportError> {
        self.dials.lock().unwrap_or_else(PoisonError::into_inner).push(Instant::now());
        let next = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        next.flatten().ok_or(TransportError::WsClosed)
    }
}

/// In-memory stand-in for the REST endpoints.
#[derive(Default)]
pub struct FakeApi {
    messages: Mutex<Vec<ChatMessage>>,
    since_seen: Mutex<Vec<i64>>,
    sends: AtomicUsize,
    next_ts: AtomicUsize,
    reject: AtomicBool,
}

impl FakeApi {
    /// Make a record visible to polls, as if another client had sent it.
    pub fn publish(&self, message: ChatMessage) {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }

    pub fn reject_sends(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub fn poll_count(&self) -> usize {
        self.since_seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn since_values(&self) -> Vec<i64> {
        self.since_seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn fetch_since(&self, since: i64) -> Result<Vec<ChatMessage>, TransportError> {
        self.since_seen.lock().unwrap_or_else(PoisonError::into_inner).push(since);
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(messages.iter().filter(|m| m.timestamp > since).cloned().collect())
    }

    async fn fetch_history(&self) -> Result<Vec<ChatMessage>, TransportError> {
        Ok(self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn send(&self, request: &SendRequest) -> Result<ChatMessage, TransportError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected { status: 400, code: Some("E_MALFORMED".into()) });
        }
        let ts = 1_000 + i64::try_from(self.next_ts.fetch_add(1, Ordering::SeqCst)).unwrap_or(0);
        let message = ChatMessage {
            name: request.name.clone(),
            message: request.message.clone(),
            timestamp: ts,
            client_id: request.client_id.clone(),
        };
        self.publish(message.clone());
        Ok(message)
    }
}

pub fn msg(origin: &str, ts: i64, text: &str) -> ChatMessage {
    ChatMessage { name: "Alice".into(), message: text.into(), timestamp: ts, client_id: origin.into() }
}
