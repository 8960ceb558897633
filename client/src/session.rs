//! Per-session send policy: cooldown and name lock.
//!
//! Purely local. A rejected send never touches the network. The cooldown is
//! checked before the name lock, and only successful sends move either.

use std::time::{Duration, Instant};

use frames::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("cooldown active for another {remaining:?}")]
    Cooldown { remaining: Duration },
    #[error("session is locked to name {locked:?}")]
    NameLocked { locked: String },
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cooldown { .. } => "E_COOLDOWN",
            Self::NameLocked { .. } => "E_NAME_LOCKED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Cooldown { .. })
    }
}

impl RateLimitError {
    /// Remaining cooldown rounded up to whole seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        match self {
            Self::Cooldown { remaining } => remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            Self::NameLocked { .. } => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionGuard {
    origin_id: String,
    locked_name: Option<String>,
    last_sent_at: Option<Instant>,
    cooldown: Duration,
}

impl SessionGuard {
    /// Fresh session with a random origin id.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self::with_origin_id(uuid::Uuid::new_v4().to_string(), cooldown)
    }

    #[must_use]
    pub fn with_origin_id(origin_id: impl Into<String>, cooldown: Duration) -> Self {
        Self { origin_id: origin_id.into(), locked_name: None, last_sent_at: None, cooldown }
    }

    #[must_use]
    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }

    #[must_use]
    pub fn locked_name(&self) -> Option<&str> {
        self.locked_name.as_deref()
    }

    /// # Errors
    ///
    /// See [`SessionGuard::check_at`].
    pub fn check(&self, name: &str) -> Result<(), RateLimitError> {
        self.check_at(name, Instant::now())
    }

    /// Decide whether a send under `name` may go out at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Cooldown`] inside the cooldown window and
    /// [`RateLimitError::NameLocked`] for a name other than the locked one.
    pub fn check_at(&self, name: &str, now: Instant) -> Result<(), RateLimitError> {
        if let Some(last) = self.last_sent_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.cooldown {
                return Err(RateLimitError::Cooldown { remaining: self.cooldown - elapsed });
            }
        }
        if let Some(locked) = &self.locked_name {
            if locked != name {
                return Err(RateLimitError::NameLocked { locked: locked.clone() });
            }
        }
        Ok(())
    }

    pub fn record_success(&mut self, name: &str) {
        self.record_success_at(name, Instant::now());
    }

    /// Start the cooldown and lock the name on the first success.
    pub fn record_success_at(&mut self, name: &str, now: Instant) {
        self.last_sent_at = Some(now);
        if self.locked_name.is_none() {
            self.locked_name = Some(name.to_owned());
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
