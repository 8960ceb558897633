//! Persisted message cache.
//!
//! One bounded slot holding the most recent messages so a restarted client
//! can render something before live data arrives. The cache is best-effort:
//! callers log failures and carry on without it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use frames::{ChatMessage, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for CacheError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_CACHE_IO",
            Self::Json(_) => "E_CACHE_CORRUPT",
        }
    }
}

/// Get/set over a single list of recent messages.
pub trait MessageCache: Send {
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the slot cannot be read or decoded.
    fn load(&self) -> Result<Vec<ChatMessage>, CacheError>;

    /// Overwrite the slot.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the slot cannot be written.
    fn store(&mut self, messages: &[ChatMessage]) -> Result<(), CacheError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process cache. Clones share the same slot, which lets a test hand one
/// clone to a store and inspect or reuse the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    slot: Arc<Mutex<Vec<ChatMessage>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl MessageCache for MemoryCache {
    fn load(&self) -> Result<Vec<ChatMessage>, CacheError> {
        Ok(self.snapshot())
    }

    fn store(&mut self, messages: &[ChatMessage]) -> Result<(), CacheError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = messages.to_vec();
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON array in a file. A missing file loads as empty.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageCache for FileCache {
    fn load(&self) -> Result<Vec<ChatMessage>, CacheError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, messages: &[ChatMessage]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec(messages)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
