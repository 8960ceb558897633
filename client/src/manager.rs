//! Connection manager: socket-first delivery with polling fallback.
//!
//! DESIGN
//! ======
//! A single driver task owns the socket phase, the one reconnect timer, the
//! one poll interval, and at most one in-flight handshake and one in-flight
//! poll, all multiplexed in one `select!` loop. Replacing the phase replaces
//! its timer, so two poll loops or two pending reconnects cannot exist.
//!
//! STATE MACHINE
//! =============
//! ```text
//!   Connecting ──handshake ok──▶ Open ──close/error──▶ Backoff
//!       ▲  │                                             │
//!       │  └──────────handshake failed──────────────────▶│
//!       └──────────────timer fired / reconnect_now───────┘
//! ```
//! Polling runs whenever the phase is not `Open`. Entering `Open` resets the
//! backoff; entering `Backoff` schedules the current delay and grows the next.
//! There is no handshake timeout: a hung dial keeps polling alive until it
//! resolves.
//!
//! SENDING
//! =======
//! `send` asks the driver to queue the frame on an open socket; the echoed
//! broadcast confirms it. Without an open socket the caller posts over REST,
//! injects the confirmed record into the store right away, and nudges the
//! driver to redial.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use frames::{ChatMessage, ClientFrame, Draft, ErrorCode, SendRequest, ServerFrame};
use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::net::{ChatApi, HttpChatApi, SocketConnector, SocketLink, TransportError, WsConnector};
use crate::store::MessageStore;

const EVENT_CAPACITY: usize = 256;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// PUBLIC TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Connecting,
    Open,
    Backoff,
}

/// Observable connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub phase: TransportPhase,
    /// `true` whenever the phase is not `Open`.
    pub polling: bool,
    /// Delay of the pending reconnect while in `Backoff`; otherwise the delay
    /// the next failure would wait.
    pub backoff_delay: Duration,
    pub high_water_mark: i64,
}

impl ConnectionSnapshot {
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match (self.phase, self.polling) {
            (TransportPhase::Open, _) => "Connected",
            (TransportPhase::Connecting, _) => "Connecting...",
            (TransportPhase::Backoff, true) => "Polling for updates...",
            (TransportPhase::Backoff, false) => "Disconnected. Retrying...",
        }
    }
}

/// Change to the displayed message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Appended(ChatMessage),
    /// The list was replaced by a history replay; carries the new list.
    Replaced(Vec<ChatMessage>),
}

/// How a successful send left the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the open socket; the broadcast echo will render it.
    Socket,
    /// Stored by the hub via REST and already rendered locally.
    Fallback(ChatMessage),
}

enum Command {
    Send { frame: ClientFrame, reply: oneshot::Sender<bool> },
    Reconnect,
    Shutdown,
}

type SharedStore = Arc<Mutex<MessageStore>>;

fn lock_store(store: &SharedStore) -> MutexGuard<'_, MessageStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// HANDLE
// =============================================================================

/// Handle to the driver task. Dropping it stops the driver and closes the
/// socket.
pub struct ChatConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<watch::Sender<ConnectionSnapshot>>,
    events: broadcast::Sender<ChatEvent>,
    store: SharedStore,
    api: Arc<dyn ChatApi>,
    driver: JoinHandle<()>,
}

impl ChatConnectionManager {
    /// Start against a live hub using the websocket and REST transports.
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn start(config: &ClientConfig, store: MessageStore) -> Self {
        Self::with_transports(
            config,
            Arc::new(WsConnector::new(config.ws_url())),
            Arc::new(HttpChatApi::new(config.http_base())),
            store,
        )
    }

    /// Start with explicit transports. Dialing and polling begin at once.
    #[must_use]
    pub fn with_transports(
        config: &ClientConfig,
        connector: Arc<dyn SocketConnector>,
        api: Arc<dyn ChatApi>,
        store: MessageStore,
    ) -> Self {
        let store = Arc::new(Mutex::new(store));
        let backoff = Backoff::new(config.backoff_base, config.backoff_max, config.backoff_multiplier);
        let (status, _) = watch::channel(ConnectionSnapshot {
            phase: TransportPhase::Connecting,
            polling: true,
            backoff_delay: backoff.current(),
            high_water_mark: lock_store(&store).high_water_mark(),
        });
        let status = Arc::new(status);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (commands, command_rx) = mpsc::unbounded_channel();

        let mut driver = Driver {
            phase: dial(&connector),
            connector,
            api: Arc::clone(&api),
            store: Arc::clone(&store),
            events: events.clone(),
            status: Arc::clone(&status),
            backoff,
            poll_interval: config.poll_interval.max(MIN_POLL_INTERVAL),
            polling: None,
        };
        driver.ensure_polling();
        let driver = tokio::spawn(driver.run(command_rx));

        Self { commands, status, events, store, api, driver }
    }

    /// Deliver a validated draft over the best available transport.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] from the REST fallback. Socket sends
    /// never fail here; a socket that dies afterwards simply drops the frame.
    pub async fn send(&self, draft: &Draft) -> Result<Delivery, TransportError> {
        let (reply, queued) = oneshot::channel();
        let asked = self.commands.send(Command::Send { frame: ClientFrame::from(draft), reply }).is_ok();
        if asked && queued.await.unwrap_or(false) {
            debug!(name = %draft.name, "chat: queued on socket");
            return Ok(Delivery::Socket);
        }

        info!("chat: socket not open, sending via fallback");
        self.reconnect_now();
        let message = self.api.send(&SendRequest::from(draft)).await?;
        self.inject(message.clone());
        Ok(Delivery::Fallback(message))
    }

    /// Skip the pending backoff wait and dial now. No-op unless in `Backoff`.
    pub fn reconnect_now(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Stop the driver: closes the socket and drops both timers.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        *self.status.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Currently displayed messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        lock_store(&self.store).displayed().to_vec()
    }

    /// Show a fallback-confirmed record. The poll cursor stays put so older
    /// messages still on the hub are fetched by the next poll.
    fn inject(&self, message: ChatMessage) {
        let appended = lock_store(&self.store).append_confirmed(message.clone());
        if appended {
            let _ = self.events.send(ChatEvent::Appended(message));
        }
    }
}

impl Drop for ChatConnectionManager {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

// =============================================================================
// DRIVER
// =============================================================================

enum Phase {
    Connecting(BoxFuture<'static, Result<SocketLink, TransportError>>),
    Open(SocketLink),
    Backoff { delay: Duration, timer: Pin<Box<Sleep>> },
}

impl Phase {
    fn kind(&self) -> TransportPhase {
        match self {
            Self::Connecting(_) => TransportPhase::Connecting,
            Self::Open(_) => TransportPhase::Open,
            Self::Backoff { .. } => TransportPhase::Backoff,
        }
    }
}

struct Polling {
    ticker: Interval,
    inflight: Option<BoxFuture<'static, Result<Vec<ChatMessage>, TransportError>>>,
}

enum PhaseEvent {
    Handshake(Result<SocketLink, TransportError>),
    Frame(ServerFrame),
    Closed,
    RetryDue,
}

enum PollEvent {
    Due,
    Fetched(Result<Vec<ChatMessage>, TransportError>),
}

struct Driver {
    connector: Arc<dyn SocketConnector>,
    api: Arc<dyn ChatApi>,
    store: SharedStore,
    events: broadcast::Sender<ChatEvent>,
    status: Arc<watch::Sender<ConnectionSnapshot>>,
    backoff: Backoff,
    poll_interval: Duration,
    phase: Phase,
    polling: Option<Polling>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!("chat: connection manager started");
        self.publish();
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Send { frame, reply }) => {
                        let _ = reply.send(self.send_on_socket(frame));
                    }
                    Some(Command::Reconnect) => self.reconnect_now(),
                    Some(Command::Shutdown) | None => break,
                },
                event = next_phase_event(&mut self.phase) => self.on_phase_event(event),
                event = next_poll_event(&mut self.polling) => self.on_poll_event(event),
            }
        }
        info!("chat: connection manager stopped");
    }

    // -------------------------------------------------------------------------
    // Socket phase
    // -------------------------------------------------------------------------

    fn on_phase_event(&mut self, event: PhaseEvent) {
        match event {
            PhaseEvent::Handshake(Ok(link)) => {
                info!("chat: socket open");
                self.backoff.reset();
                self.phase = Phase::Open(link);
                self.stop_polling();
            }
            PhaseEvent::Handshake(Err(e)) => {
                warn!(code = e.error_code(), error = %e, "chat: connect failed");
                self.enter_backoff();
            }
            PhaseEvent::Frame(frame) => self.apply_frame(frame),
            PhaseEvent::Closed => {
                info!("chat: socket closed");
                self.enter_backoff();
            }
            PhaseEvent::RetryDue => self.phase = dial(&self.connector),
        }
        self.publish();
    }

    fn enter_backoff(&mut self) {
        let delay = self.backoff.next_delay();
        info!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "chat: reconnect scheduled");
        self.phase = Phase::Backoff { delay, timer: Box::pin(tokio::time::sleep(delay)) };
        self.ensure_polling();
    }

    fn reconnect_now(&mut self) {
        if matches!(self.phase, Phase::Backoff { .. }) {
            info!("chat: reconnect requested");
            self.phase = dial(&self.connector);
            self.publish();
        }
    }

    fn send_on_socket(&self, frame: ClientFrame) -> bool {
        match &self.phase {
            Phase::Open(link) => link.outbound.send(frame).is_ok(),
            _ => false,
        }
    }

    fn apply_frame(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::History { messages } => {
                let displayed = {
                    let mut store = lock_store(&self.store);
                    store.replace_history(messages);
                    store.displayed().to_vec()
                };
                debug!(count = displayed.len(), "chat: history replaced");
                let _ = self.events.send(ChatEvent::Replaced(displayed));
            }
            ServerFrame::Message { message } => self.append(message),
        }
    }

    fn append(&self, message: ChatMessage) {
        if lock_store(&self.store).append_and_cache(message.clone()) {
            let _ = self.events.send(ChatEvent::Appended(message));
        }
    }

    // -------------------------------------------------------------------------
    // Polling
    // -------------------------------------------------------------------------

    fn ensure_polling(&mut self) {
        if self.polling.is_some() {
            return;
        }
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.polling = Some(Polling { ticker, inflight: None });
        info!("chat: polling started");
    }

    fn stop_polling(&mut self) {
        if self.polling.take().is_some() {
            info!("chat: polling stopped");
        }
    }

    fn on_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Due => {
                let since = lock_store(&self.store).high_water_mark();
                let api = Arc::clone(&self.api);
                if let Some(polling) = self.polling.as_mut() {
                    polling.inflight = Some(Box::pin(async move { api.fetch_since(since).await }));
                }
                debug!(since, "chat: poll");
            }
            PollEvent::Fetched(Ok(messages)) => {
                debug!(count = messages.len(), "chat: poll returned");
                for message in messages {
                    self.append(message);
                }
                self.publish();
            }
            PollEvent::Fetched(Err(e)) => {
                warn!(code = e.error_code(), error = %e, "chat: poll failed");
            }
        }
    }

    fn publish(&self) {
        let snapshot = ConnectionSnapshot {
            phase: self.phase.kind(),
            polling: self.polling.is_some(),
            backoff_delay: match &self.phase {
                Phase::Backoff { delay, .. } => *delay,
                _ => self.backoff.current(),
            },
            high_water_mark: lock_store(&self.store).high_water_mark(),
        };
        self.status.send_if_modified(|current| {
            let changed = *current != snapshot;
            *current = snapshot;
            changed
        });
    }
}

fn dial(connector: &Arc<dyn SocketConnector>) -> Phase {
    let connector = Arc::clone(connector);
    debug!("chat: dialing");
    Phase::Connecting(Box::pin(async move { connector.connect().await }))
}

async fn next_phase_event(phase: &mut Phase) -> PhaseEvent {
    match phase {
        Phase::Connecting(handshake) => PhaseEvent::Handshake(handshake.await),
        Phase::Open(link) => match link.inbound.recv().await {
            Some(frame) => PhaseEvent::Frame(frame),
            None => PhaseEvent::Closed,
        },
        Phase::Backoff { timer, .. } => {
            timer.as_mut().await;
            PhaseEvent::RetryDue
        }
    }
}

async fn next_poll_event(polling: &mut Option<Polling>) -> PollEvent {
    let Some(polling) = polling else {
        return std::future::pending().await;
    };
    if let Some(request) = polling.inflight.as_mut() {
        let result = request.await;
        polling.inflight = None;
        return PollEvent::Fetched(result);
    }
    polling.ticker.tick().await;
    PollEvent::Due
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
