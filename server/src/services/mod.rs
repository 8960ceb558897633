//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own chat state and its invariants so route handlers can
//! stay focused on protocol translation.

pub mod hub;
