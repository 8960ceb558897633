//! `ChatClient`: what a front end talks to.
//!
//! Runs a submission through local validation, the session guard, and the
//! connection manager, in that order, and records the success.

use std::sync::Arc;

use frames::{ChatMessage, Draft, ErrorCode, ValidationError};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::cache::MessageCache;
use crate::config::ClientConfig;
use crate::manager::{ChatConnectionManager, ChatEvent, ConnectionSnapshot, Delivery};
use crate::net::{ChatApi, SocketConnector, TransportError};
use crate::session::{RateLimitError, SessionGuard};
use crate::store::MessageStore;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::RateLimit(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Validation(e) => e.retryable(),
            Self::RateLimit(e) => e.retryable(),
            Self::Transport(e) => e.retryable(),
        }
    }
}

impl ChatError {
    /// Short text suitable for a status line.
    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::EmptyName) => "Please enter your name".to_owned(),
            Self::Validation(ValidationError::EmptyMessage) => "Message cannot be empty".to_owned(),
            Self::Validation(ValidationError::NameTooLong { max, .. }) => {
                format!("Name must be at most {max} characters")
            }
            Self::Validation(ValidationError::MessageTooLong { max, .. }) => {
                format!("Message must be at most {max} characters")
            }
            Self::Validation(_) => "Invalid chat payload".to_owned(),
            Self::RateLimit(e @ RateLimitError::Cooldown { .. }) => {
                format!("Wait {}s before sending another message", e.remaining_secs())
            }
            Self::RateLimit(RateLimitError::NameLocked { .. }) => {
                "You must keep the same name in this session".to_owned()
            }
            Self::Transport(_) => "Message failed to send".to_owned(),
        }
    }
}

pub struct ChatClient {
    guard: SessionGuard,
    manager: ChatConnectionManager,
}

impl ChatClient {
    /// Preload `cache`, then connect to the hub at `config.base_url`.
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn start(config: &ClientConfig, cache: Box<dyn MessageCache>) -> Self {
        let store = preloaded(cache);
        Self { guard: SessionGuard::new(config.cooldown), manager: ChatConnectionManager::start(config, store) }
    }

    /// Like [`ChatClient::start`] with explicit transports.
    #[must_use]
    pub fn with_transports(
        config: &ClientConfig,
        connector: Arc<dyn SocketConnector>,
        api: Arc<dyn ChatApi>,
        cache: Box<dyn MessageCache>,
    ) -> Self {
        let store = preloaded(cache);
        Self {
            guard: SessionGuard::new(config.cooldown),
            manager: ChatConnectionManager::with_transports(config, connector, api, store),
        }
    }

    /// Validate, rate-limit, and deliver one message.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] when the payload is invalid, the session guard
    /// refuses it, or the fallback transport fails. Nothing is recorded
    /// against the session in those cases.
    pub async fn submit(&mut self, name: &str, message: &str) -> Result<Delivery, ChatError> {
        let draft = Draft::normalize(name, message, self.guard.origin_id())?;
        self.guard.check(&draft.name)?;
        let delivery = self.manager.send(&draft).await?;
        self.guard.record_success(&draft.name);
        debug!(name = %draft.name, socket = matches!(delivery, Delivery::Socket), "chat: submitted");
        Ok(delivery)
    }

    #[must_use]
    pub fn origin_id(&self) -> &str {
        self.guard.origin_id()
    }

    #[must_use]
    pub fn locked_name(&self) -> Option<&str> {
        self.guard.locked_name()
    }

    #[must_use]
    pub fn manager(&self) -> &ChatConnectionManager {
        &self.manager
    }

    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.manager.messages()
    }

    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.manager.status()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.manager.subscribe()
    }

    pub fn reconnect_now(&self) {
        self.manager.reconnect_now();
    }

    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}

fn preloaded(cache: Box<dyn MessageCache>) -> MessageStore {
    let mut store = MessageStore::new(cache);
    store.preload_from_cache();
    store
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
