//! Server configuration parsed from environment variables.
//!
//! Every knob has a typed default, so an empty environment yields a working
//! server. Unparsable values fall back to the default instead of aborting.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 25;
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;

/// Tuning knobs for the chat hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of the bounded history (FIFO eviction beyond this).
    pub history_limit: usize,
    /// Period of the liveness sweep.
    pub heartbeat_interval: Duration,
    /// Per-subscriber outbound queue depth. A subscriber whose queue fills
    /// up is dropped from the broadcast set.
    pub subscriber_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_limit: frames::HISTORY_LIMIT,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }
}

impl HubConfig {
    /// Build hub config from environment variables.
    ///
    /// Optional:
    /// - `CHAT_HISTORY_LIMIT`: default 100, clamped to at least 1
    /// - `CHAT_HEARTBEAT_SECS`: default 25, clamped to at least 1
    /// - `CHAT_SUBSCRIBER_QUEUE`: default 256, clamped to at least 1
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            history_limit: env_parse("CHAT_HISTORY_LIMIT", defaults.history_limit).max(1),
            heartbeat_interval: Duration::from_secs(env_parse("CHAT_HEARTBEAT_SECS", DEFAULT_HEARTBEAT_SECS).max(1)),
            subscriber_queue: env_parse("CHAT_SUBSCRIBER_QUEUE", defaults.subscriber_queue).max(1),
        }
    }
}

/// Top-level server config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub hub: HubConfig,
}

impl ServerConfig {
    /// Build server config from environment variables (`PORT` plus the
    /// [`HubConfig::from_env`] keys).
    #[must_use]
    pub fn from_env() -> Self {
        Self { port: env_parse("PORT", DEFAULT_PORT), hub: HubConfig::from_env() }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
