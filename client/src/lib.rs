//! Chat client: local message store, session guard, and a connection
//! manager that prefers the hub's websocket and falls back to REST polling.
//!
//! ARCHITECTURE
//! ============
//! - `store`    arrival-ordered display list with dedup and a persisted cache
//! - `session`  cooldown and name lock, checked before anything is sent
//! - `manager`  driver task owning socket phase, backoff, and polling
//! - `net`      transport traits plus tokio-tungstenite and reqwest impls
//! - `chat`     [`ChatClient`], the facade a front end drives

pub mod backoff;
pub mod cache;
pub mod chat;
pub mod config;
pub mod manager;
pub mod net;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheError, FileCache, MemoryCache, MessageCache};
pub use chat::{ChatClient, ChatError};
pub use config::ClientConfig;
pub use manager::{ChatConnectionManager, ChatEvent, ConnectionSnapshot, Delivery, TransportPhase};
pub use net::{ChatApi, HttpChatApi, SocketConnector, TransportError, WsConnector};
pub use session::{RateLimitError, SessionGuard};
pub use store::MessageStore;
