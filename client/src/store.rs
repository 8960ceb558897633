//! Local message display and cache merge.
//!
//! DESIGN
//! ======
//! Messages reach a client from four directions: socket broadcasts, poll
//! results, the direct response to a fallback send, and the history replay
//! sent on every (re)connect. The store reconciles them:
//! - display order is arrival order and is never re-sorted
//! - a `(origin id, server timestamp)` key seen once is never shown twice
//! - the high-water mark tracks the newest server timestamp seen on the
//!   socket, in a poll result, or in a history replay, which is what polling
//!   asks for
//!
//! A fallback send's own echo is displayed through [`MessageStore::append_confirmed`]
//! and leaves the mark alone. Other clients' messages older than it may still
//! be waiting on the hub, and raising the cursor past them would skip them.
//!
//! The cache mirrors the last [`HISTORY_LIMIT`] records. Any cache failure is
//! logged once and the store carries on memory-only.

use std::collections::{HashSet, VecDeque};

use frames::{ChatMessage, ErrorCode, HISTORY_LIMIT};
use tracing::{debug, warn};

use crate::cache::{CacheError, MessageCache};

pub struct MessageStore {
    displayed: Vec<ChatMessage>,
    seen: HashSet<(String, i64)>,
    high_water_mark: i64,
    cached: VecDeque<ChatMessage>,
    cache: Box<dyn MessageCache>,
    degraded: bool,
}

impl MessageStore {
    #[must_use]
    pub fn new(cache: Box<dyn MessageCache>) -> Self {
        Self {
            displayed: Vec::new(),
            seen: HashSet::new(),
            high_water_mark: 0,
            cached: VecDeque::with_capacity(HISTORY_LIMIT),
            cache,
            degraded: false,
        }
    }

    /// Render whatever the cache holds. Returns how many records were shown.
    pub fn preload_from_cache(&mut self) -> usize {
        if self.degraded {
            return 0;
        }
        let cached = match self.cache.load() {
            Ok(messages) => messages,
            Err(e) => {
                self.degrade(&e);
                return 0;
            }
        };

        let mut shown = 0;
        for message in cached {
            if self.remember(&message) {
                self.push_cached(message.clone());
                self.displayed.push(message);
                shown += 1;
            }
        }
        debug!(shown, high_water_mark = self.high_water_mark, "store: preloaded from cache");
        shown
    }

    /// Append a live record unless it was already seen. Returns `true` when
    /// the record was new and is now displayed.
    pub fn append_and_cache(&mut self, message: ChatMessage) -> bool {
        if !self.remember(&message) {
            return false;
        }
        self.push_cached(message.clone());
        self.displayed.push(message);
        self.persist();
        true
    }

    /// Display and cache our own record as echoed by a fallback send, without
    /// touching the high-water mark. The next poll returns it again and the
    /// dedup key drops it there.
    pub fn append_confirmed(&mut self, message: ChatMessage) -> bool {
        if !self.seen.insert(message.dedup_key()) {
            return false;
        }
        self.push_cached(message.clone());
        self.displayed.push(message);
        self.persist();
        true
    }

    /// Replace the displayed and cached sets with an authoritative snapshot.
    pub fn replace_history(&mut self, messages: Vec<ChatMessage>) {
        self.displayed.clear();
        self.seen.clear();
        self.cached.clear();
        for message in messages {
            if self.remember(&message) {
                self.push_cached(message.clone());
                self.displayed.push(message);
            }
        }
        self.persist();
    }

    #[must_use]
    pub fn displayed(&self) -> &[ChatMessage] {
        &self.displayed
    }

    /// Newest server timestamp seen so far; `0` before anything arrives.
    #[must_use]
    pub fn high_water_mark(&self) -> i64 {
        self.high_water_mark
    }

    /// `true` once a cache failure has switched the store to memory-only.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Record the dedup key and advance the high-water mark. Returns `false`
    /// for a duplicate.
    fn remember(&mut self, message: &ChatMessage) -> bool {
        if !self.seen.insert(message.dedup_key()) {
            return false;
        }
        self.high_water_mark = self.high_water_mark.max(message.timestamp);
        true
    }

    fn push_cached(&mut self, message: ChatMessage) {
        self.cached.push_back(message);
        while self.cached.len() > HISTORY_LIMIT {
            self.cached.pop_front();
        }
    }

    fn persist(&mut self) {
        if self.degraded {
            return;
        }
        if let Err(e) = self.cache.store(self.cached.make_contiguous()) {
            self.degrade(&e);
        }
    }

    fn degrade(&mut self, error: &CacheError) {
        warn!(code = error.error_code(), error = %error, "store: cache unavailable, continuing without it");
        self.degraded = true;
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
