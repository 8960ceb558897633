//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the chat hub, which is constructed explicitly at startup rather
//! than living in a global.

use crate::config::HubConfig;
use crate::services::hub::ChatHub;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; the hub is internally Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub hub: ChatHub,
}

impl AppState {
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self { hub: ChatHub::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` with default hub limits. The sweeper is not
    /// started.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(HubConfig::default())
    }

    /// Append a valid message through the hub and return it.
    pub fn seed_message(state: &AppState, name: &str, message: &str) -> frames::ChatMessage {
        state
            .hub
            .submit(&serde_json::json!({"name": name, "message": message, "clientId": "seed"}))
            .expect("seed message should be valid")
    }
}
