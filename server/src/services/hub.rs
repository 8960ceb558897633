//! Chat hub: authoritative bounded history and subscriber broadcast.
//!
//! DESIGN
//! ======
//! History and the subscriber map sit behind one mutex. `submit` validates,
//! timestamps, appends, and fans out to every subscriber while holding it, so
//! two submissions can never interleave and broadcast order always equals
//! history order. The lock is never held across an await: fan-out uses
//! `try_send` into each connection's bounded queue.
//!
//! LIVENESS
//! ========
//! A sweeper task pings every subscriber on a fixed period. A subscriber
//! that has not answered the previous ping is removed; dropping its queue
//! sender makes the socket task close the connection. Subscribers whose
//! queue is full or closed are dropped the same way during broadcast.
//!
//! LIFECYCLE
//! =========
//! `ChatHub::new` → `start` (spawns the sweeper) → `shutdown` (aborts the
//! sweeper, drops every subscriber). History survives disconnects.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use frames::{ChatMessage, Draft, ServerFrame, ValidationError};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::HubConfig;

// =============================================================================
// TYPES
// =============================================================================

/// Item queued for a single socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Pre-encoded JSON text frame, shared across all subscribers.
    Frame(Arc<str>),
    /// Liveness check; the socket task turns this into a WebSocket ping.
    Ping,
}

/// Handle returned by [`ChatHub::connect`].
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    /// History snapshot taken atomically with registration, so nothing is
    /// missed or repeated between it and the first queued broadcast.
    pub history: Vec<ChatMessage>,
    pub rx: mpsc::Receiver<Outbound>,
}

/// Outcome of one liveness sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub pinged: usize,
    pub reclaimed: usize,
}

struct Subscriber {
    tx: mpsc::Sender<Outbound>,
    /// Cleared by each sweep, set again when the peer answers the ping.
    alive: bool,
}

struct HubInner {
    history: VecDeque<ChatMessage>,
    subscribers: HashMap<Uuid, Subscriber>,
    last_timestamp: i64,
}

// =============================================================================
// HUB
// =============================================================================

#[derive(Clone)]
pub struct ChatHub {
    inner: Arc<Mutex<HubInner>>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: HubConfig,
}

impl ChatHub {
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                history: VecDeque::with_capacity(config.history_limit),
                subscribers: HashMap::new(),
                last_timestamp: 0,
            })),
            sweeper: Arc::new(Mutex::new(None)),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> HubConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Subscribers
    // -------------------------------------------------------------------------

    /// Register a subscriber and snapshot the current history.
    #[must_use]
    pub fn connect(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.config.subscriber_queue);
        let id = Uuid::new_v4();
        let mut inner = self.lock();
        inner.subscribers.insert(id, Subscriber { tx, alive: true });
        let history = inner.history.iter().cloned().collect();
        Subscription { id, history, rx }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: Uuid) -> bool {
        self.lock().subscribers.remove(&id).is_some()
    }

    /// Record that a subscriber answered the last ping.
    pub fn mark_alive(&self, id: Uuid) {
        if let Some(sub) = self.lock().subscribers.get_mut(&id) {
            sub.alive = true;
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Validate an untrusted `{name, message, clientId}` payload and append it.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] describing why the payload was refused.
    /// Nothing is stored or broadcast in that case.
    pub fn submit(&self, payload: &Value) -> Result<ChatMessage, ValidationError> {
        let draft = Draft::from_value(payload)?;
        Ok(self.append(draft))
    }

    /// Like [`ChatHub::submit`], but for a raw socket frame that must also
    /// carry `type:"message"`.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] describing why the frame was refused.
    pub fn submit_frame(&self, frame: &Value) -> Result<ChatMessage, ValidationError> {
        let draft = Draft::from_frame(frame)?;
        Ok(self.append(draft))
    }

    /// Timestamp, append, evict, and broadcast as one step.
    pub fn append(&self, draft: Draft) -> ChatMessage {
        let mut inner = self.lock();

        // Strictly increasing, so a `since` cursor never splits a millisecond.
        let timestamp = now_ms().max(inner.last_timestamp + 1);
        inner.last_timestamp = timestamp;
        let message = draft.into_message(timestamp);

        inner.history.push_back(message.clone());
        while inner.history.len() > self.config.history_limit {
            inner.history.pop_front();
        }

        let frame: Arc<str> = frames::encode_frame(&ServerFrame::Message { message: message.clone() }).into();
        let dropped = broadcast_locked(&mut inner, &frame);
        debug!(
            name = %message.name,
            timestamp,
            history_len = inner.history.len(),
            subscribers = inner.subscribers.len(),
            dropped,
            "hub: message appended"
        );

        message
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Full current history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.lock().history.iter().cloned().collect()
    }

    /// Messages with `timestamp > since`, in history order.
    #[must_use]
    pub fn history_since(&self, since: i64) -> Vec<ChatMessage> {
        self.lock()
            .history
            .iter()
            .filter(|m| m.timestamp > since)
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------------
    // Liveness
    // -------------------------------------------------------------------------

    /// Reclaim subscribers that missed the previous ping and ping the rest.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut inner = self.lock();
        inner.subscribers.retain(|id, sub| {
            if !sub.alive {
                info!(subscriber_id = %id, "hub: reclaiming unresponsive subscriber");
                report.reclaimed += 1;
                return false;
            }
            sub.alive = false;
            match sub.tx.try_send(Outbound::Ping) {
                Ok(()) => {
                    report.pinged += 1;
                    true
                }
                // A backed-up queue still gets one more period to answer.
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Closed(_)) => {
                    report.reclaimed += 1;
                    false
                }
            }
        });
        report
    }

    /// Spawn the periodic liveness sweep. Calling it again is a no-op.
    pub fn start(&self) {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let hub = self.clone();
        let period = self.config.heartbeat_interval;
        info!(period_secs = period.as_secs(), "hub: liveness sweep started");
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = hub.sweep();
                debug!(pinged = report.pinged, reclaimed = report.reclaimed, "hub: sweep complete");
            }
        }));
    }

    /// Stop the sweeper and drop every subscriber. History is kept.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        let dropped = {
            let mut inner = self.lock();
            let n = inner.subscribers.len();
            inner.subscribers.clear();
            n
        };
        info!(dropped, "hub: shut down");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Queue `frame` for every subscriber, removing the ones that cannot take it.
/// Returns how many were removed.
fn broadcast_locked(inner: &mut HubInner, frame: &Arc<str>) -> usize {
    let before = inner.subscribers.len();
    inner.subscribers.retain(|id, sub| match sub.tx.try_send(Outbound::Frame(Arc::clone(frame))) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(subscriber_id = %id, "hub: subscriber queue full, dropping subscriber");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    });
    before - inner.subscribers.len()
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
