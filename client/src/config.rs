//! Client tuning knobs.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(2000);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(15_000);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// WebSocket path served by the hub.
pub const WS_PATH: &str = "/chat";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// HTTP origin of the hub, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub backoff_multiplier: f64,
    pub poll_interval: Duration,
    pub cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// HTTP origin without a trailing slash.
    #[must_use]
    pub fn http_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Socket URL derived from the HTTP origin (`http` → `ws`, `https` → `wss`).
    #[must_use]
    pub fn ws_url(&self) -> String {
        let base = self.http_base();
        let origin = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_owned()
        };
        format!("{origin}{WS_PATH}")
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
