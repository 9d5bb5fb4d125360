//! Session: one tenant's connection, lifecycle state and outbound queue
//!
//! All mutable fields live behind a single mutex that is never held across
//! an await. Connection events arrive through a per-link pump task and are
//! fed to the pure `transition` function; the resulting effects are carried
//! out after the lock is released.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::address::normalize_destination;
use super::queue::{AttemptStatus, DeliveryLog, DeliveryRecord, OutboundQueue, QueuedMessage};
use super::reconnect::ReconnectPolicy;
use super::state::{Effect, LifecycleEvent, SessionState, transition};
use crate::config::SessionConfig;
use crate::connection::{CloseReason, ConnectRequest, Connection, ConnectionEvent, ConnectionFactory};
use crate::credentials::CredentialStore;
use crate::error::{ConnectionError, SessionError};
use crate::events::{CourierEvent, EventBus};

/// Point-in-time view of a session, safe to hand to API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub state: SessionState,
    /// Present only while waiting for pairing
    pub pairing_code: Option<String>,
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub queue_length: usize,
    pub is_draining: bool,
    pub reconnect_attempts: usize,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

pub(super) struct SessionInner {
    pub(super) state: SessionState,
    pairing_code: Option<String>,
    pub(super) connection: Option<Arc<dyn Connection>>,
    /// Bumped whenever the connection is replaced or torn down
    generation: u64,
    pump: Option<JoinHandle<()>>,
    opened_at: Option<Instant>,
    pub(super) queue: OutboundQueue,
    pub(super) draining: bool,
    messages_sent: u64,
    messages_failed: u64,
    deliveries: DeliveryLog,
    reconnect: ReconnectPolicy,
    /// Set while a scheduled reconnect has not yet started initializing
    reconnect_pending: bool,
    last_error: Option<String>,
    pub(super) last_activity: DateTime<Utc>,
    pub(super) removed: bool,
}

/// Work collected under the lock, performed after it is released
#[derive(Default)]
struct Outcome {
    changes: Vec<(SessionState, SessionState)>,
    pairing_codes: Vec<String>,
    drain: bool,
    reconnect: Option<(Duration, u64)>,
    teardown: Option<Arc<dyn Connection>>,
}

/// A managed messaging session
pub struct Session {
    id: String,
    name: String,
    owner_id: String,
    created_at: DateTime<Utc>,
    pub(super) config: SessionConfig,
    factory: Arc<dyn ConnectionFactory>,
    credentials: Arc<dyn CredentialStore>,
    event_bus: Arc<dyn EventBus>,
    pub(super) inner: Mutex<SessionInner>,
    state_tx: watch::Sender<SessionState>,
    pub(super) weak_self: Weak<Session>,
}

impl Session {
    /// Create a session in `INITIALIZING`; call `initialize` to connect
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
        config: SessionConfig,
        factory: Arc<dyn ConnectionFactory>,
        credentials: Arc<dyn CredentialStore>,
        event_bus: Arc<dyn EventBus>,
    ) -> Arc<Self> {
        let now = Utc::now();
        let (state_tx, _) = watch::channel(SessionState::Initializing);
        let inner = SessionInner {
            state: SessionState::Initializing,
            pairing_code: None,
            connection: None,
            generation: 0,
            pump: None,
            opened_at: None,
            queue: OutboundQueue::new(config.queue_capacity),
            draining: false,
            messages_sent: 0,
            messages_failed: 0,
            deliveries: DeliveryLog::new(config.history_limit),
            reconnect: ReconnectPolicy::new(config.reconnect.clone()),
            reconnect_pending: false,
            last_error: None,
            last_activity: now,
            removed: false,
        };

        Arc::new_cyclic(|weak| Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            created_at: now,
            config,
            factory,
            credentials,
            event_bus,
            inner: Mutex::new(inner),
            state_tx,
            weak_self: weak.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn pairing_code(&self) -> Option<String> {
        self.inner.lock().pairing_code.clone()
    }

    pub fn messages_sent(&self) -> u64 {
        self.inner.lock().messages_sent
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.lock().draining
    }

    /// Watch lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Most recent delivery records, oldest first
    pub fn recent_deliveries(&self) -> Vec<DeliveryRecord> {
        self.inner.lock().deliveries.snapshot()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
            state: inner.state,
            pairing_code: inner.pairing_code.clone(),
            messages_sent: inner.messages_sent,
            messages_failed: inner.messages_failed,
            queue_length: inner.queue.len(),
            is_draining: inner.draining,
            reconnect_attempts: inner.reconnect.recent_attempts(),
            last_error: inner.last_error.clone(),
            created_at: self.created_at,
            last_activity: inner.last_activity,
        }
    }

    /// Establish a fresh connection, replacing any previous one
    ///
    /// Setup failures move the session to `ERROR` and are returned.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let (generation, stale) = {
            let mut inner = self.inner.lock();
            if inner.removed {
                return Err(SessionError::Removed);
            }
            if inner.state.is_terminal() {
                return Err(match inner.state {
                    SessionState::LoggedOut => SessionError::LoggedOut,
                    _ => SessionError::Setup("session is in ERROR; reinitialize it".to_string()),
                });
            }
            inner.generation += 1;
            inner.reconnect_pending = false;
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            inner.opened_at = None;
            (inner.generation, inner.connection.take())
        };

        if let Some(stale) = stale {
            stale.close().await;
        }

        debug!(session_id = %self.id, generation, "initializing connection");

        let credentials = match self.credentials.load(&self.id).await {
            Ok(credentials) => credentials,
            Err(e) => {
                self.fail_setup(generation, e.to_string()).await;
                return Err(e.into());
            }
        };

        let request = ConnectRequest {
            session_id: self.id.clone(),
            credentials,
        };
        let link = match self.factory.connect(request).await {
            Ok(link) => link,
            Err(e) => {
                self.fail_setup(generation, e.to_string()).await;
                return Err(e.into());
            }
        };

        let superseded = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.removed || inner.state.is_terminal() {
                true
            } else {
                inner.connection = Some(Arc::clone(&link.handle));
                inner.pump = Some(spawn_pump(
                    self.weak_self.clone(),
                    generation,
                    link.events,
                ));
                false
            }
        };

        if superseded {
            debug!(session_id = %self.id, generation, "connection attempt superseded");
            link.handle.close().await;
        }
        Ok(())
    }

    /// Explicitly restart a session, including one in `ERROR`
    ///
    /// Logged-out sessions cannot be revived; delete and recreate them.
    pub async fn reinitialize(&self) -> Result<(), SessionError> {
        let change = {
            let mut inner = self.inner.lock();
            if inner.removed {
                return Err(SessionError::Removed);
            }
            if inner.state == SessionState::LoggedOut {
                return Err(SessionError::LoggedOut);
            }
            let from = inner.state;
            inner.state = SessionState::Initializing;
            inner.pairing_code = None;
            inner.last_error = None;
            inner.last_activity = Utc::now();
            inner.reconnect.reset();
            (from != SessionState::Initializing).then_some((from, SessionState::Initializing))
        };

        info!(session_id = %self.id, "reinitializing session");
        if let Some((from, to)) = change {
            self.announce_change(from, to).await;
        }
        self.initialize().await
    }

    /// Queue a message for paced delivery
    ///
    /// Returns the queue length after insertion.
    pub fn enqueue(&self, destination: &str, payload: &str) -> Result<usize, SessionError> {
        let destination = normalize_destination(destination, &self.config.address_domain)?;

        let (len, start) = {
            let mut inner = self.inner.lock();
            if inner.removed {
                return Err(SessionError::Removed);
            }
            if inner.state != SessionState::Connected {
                return Err(SessionError::NotConnected {
                    state: inner.state.to_string(),
                });
            }
            let len = inner
                .queue
                .push(QueuedMessage::new(destination, payload.to_string()))?;
            inner.last_activity = Utc::now();
            (len, !inner.draining)
        };

        debug!(session_id = %self.id, queue_length = len, "message enqueued");
        if start {
            self.trigger_drain();
        }
        Ok(len)
    }

    /// Deliver one message immediately, bypassing the queue
    pub async fn send_message(
        &self,
        destination: &str,
        payload: &str,
    ) -> Result<DeliveryRecord, SessionError> {
        let destination = normalize_destination(destination, &self.config.address_domain)?;

        let connection = {
            let inner = self.inner.lock();
            if inner.removed {
                return Err(SessionError::Removed);
            }
            match (&inner.connection, inner.state) {
                (Some(connection), SessionState::Connected) => Arc::clone(connection),
                _ => {
                    return Err(SessionError::NotConnected {
                        state: inner.state.to_string(),
                    });
                }
            }
        };

        let message = QueuedMessage::new(destination, payload.to_string());
        let outcome = connection.send(&message.destination, &message.payload).await;
        let record = self.record_delivery(message, &outcome, false).await;
        outcome?;
        Ok(record)
    }

    /// Sever the connection for good, optionally logging out first
    ///
    /// Pending messages are discarded. Used by delete and shutdown.
    pub async fn disconnect(&self, logout: bool) {
        let (connection, was_connected, dropped) = {
            let mut inner = self.inner.lock();
            inner.removed = true;
            inner.generation += 1;
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            inner.opened_at = None;
            inner.pairing_code = None;
            let dropped = inner.queue.clear();
            (
                inner.connection.take(),
                inner.state == SessionState::Connected,
                dropped,
            )
        };

        if dropped > 0 {
            info!(session_id = %self.id, dropped, "discarded pending messages");
        }

        let Some(connection) = connection else {
            return;
        };
        if logout && was_connected {
            if let Err(e) = connection.logout().await {
                warn!(session_id = %self.id, error = %e, "logout failed, closing link");
                connection.close().await;
            }
        } else {
            connection.close().await;
        }
    }

    /// Apply one connection event; returns false once the link is stale
    async fn handle_event(&self, generation: u64, event: ConnectionEvent) -> bool {
        let lifecycle = match event {
            ConnectionEvent::PairingChallenge { code } => LifecycleEvent::PairingChallenge(code),
            ConnectionEvent::Opened => LifecycleEvent::Opened,
            ConnectionEvent::Closed { reason } => LifecycleEvent::Closed(reason),
            ConnectionEvent::CredentialsUpdated { credentials } => {
                if !self.is_current(generation) {
                    return false;
                }
                if let Err(e) = self.credentials.save(&self.id, &credentials).await {
                    error!(session_id = %self.id, error = %e, "failed to persist credentials");
                }
                return true;
            }
        };
        self.apply(Some(generation), lifecycle).await
    }

    fn is_current(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        inner.generation == generation && !inner.removed
    }

    async fn fail_setup(&self, generation: u64, message: String) {
        error!(session_id = %self.id, error = %message, "session setup failed");
        self.apply(Some(generation), LifecycleEvent::SetupFailed(message))
            .await;
    }

    /// Run the state machine for `event`
    ///
    /// `generation` ties the event to the link that produced it; events from
    /// a replaced link are dropped.
    async fn apply(&self, generation: Option<u64>, event: LifecycleEvent) -> bool {
        let mut outcome = Outcome::default();
        {
            let mut inner = self.inner.lock();
            if inner.removed {
                return false;
            }
            if generation.is_some_and(|g| g != inner.generation) {
                return false;
            }
            self.step(&mut inner, &event, &mut outcome);
        }

        if let Some(connection) = outcome.teardown.take() {
            connection.close().await;
        }
        for (from, to) in &outcome.changes {
            self.announce_change(*from, *to).await;
        }
        for code in outcome.pairing_codes {
            self.event_bus
                .publish(CourierEvent::PairingChallenge {
                    session_id: self.id.clone(),
                    code,
                })
                .await;
        }
        if let Some((delay, expected)) = outcome.reconnect {
            self.schedule_reconnect(delay, expected);
        }
        if outcome.drain {
            self.trigger_drain();
        }
        true
    }

    /// Apply a transition to the locked state, collecting deferred work
    fn step(&self, inner: &mut SessionInner, event: &LifecycleEvent, outcome: &mut Outcome) {
        let from = inner.state;
        let t = transition(from, event);
        if !t.applied {
            debug!(session_id = %self.id, state = %from, ?event, "event ignored");
            return;
        }

        inner.state = t.next;
        inner.last_activity = Utc::now();
        match event {
            LifecycleEvent::Opened => inner.opened_at = Some(Instant::now()),
            LifecycleEvent::Closed(reason) => {
                if let Some(opened_at) = inner.opened_at.take() {
                    inner.reconnect.link_closed_after(opened_at.elapsed());
                }
                inner.last_error = Some(match reason {
                    CloseReason::LoggedOut => "logged out remotely".to_string(),
                    CloseReason::Transient { message } => format!("link closed: {}", message),
                });
            }
            LifecycleEvent::SetupFailed(message) => inner.last_error = Some(message.clone()),
            LifecycleEvent::PairingChallenge(_) => {}
        }
        if from != t.next {
            outcome.changes.push((from, t.next));
        }

        for effect in t.effects {
            match effect {
                Effect::StorePairing(code) => {
                    inner.pairing_code = Some(code.clone());
                    outcome.pairing_codes.push(code);
                }
                Effect::ClearPairing => inner.pairing_code = None,
                Effect::TriggerDrain => {
                    outcome.drain = !inner.queue.is_empty() && !inner.draining;
                }
                Effect::ScheduleReconnect if inner.reconnect_pending => {
                    debug!(session_id = %self.id, "reconnect already pending");
                }
                Effect::ScheduleReconnect => match inner.reconnect.next_delay() {
                    Some(delay) => {
                        inner.reconnect_pending = true;
                        outcome.reconnect = Some((delay, inner.generation));
                    }
                    None => {
                        warn!(session_id = %self.id, "reconnect budget exhausted");
                        let exhausted =
                            LifecycleEvent::SetupFailed("reconnect budget exhausted".to_string());
                        self.step(inner, &exhausted, outcome);
                    }
                },
                Effect::Teardown => {
                    inner.generation += 1;
                    inner.opened_at = None;
                    // The pump may be the caller; detach it instead of aborting.
                    inner.pump.take();
                    if let Some(connection) = inner.connection.take() {
                        outcome.teardown = Some(connection);
                    }
                }
            }
        }
    }

    async fn announce_change(&self, from: SessionState, to: SessionState) {
        info!(session_id = %self.id, %from, %to, "session state changed");
        self.state_tx.send_replace(to);
        self.event_bus
            .publish(CourierEvent::SessionStateChanged {
                session_id: self.id.clone(),
                from,
                to,
            })
            .await;
    }

    fn schedule_reconnect(&self, delay: Duration, expected_generation: u64) {
        let weak = self.weak_self.clone();
        info!(session_id = %self.id, delay_ms = delay.as_millis() as u64, "scheduling reconnect");

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let Some(session) = weak.upgrade() else {
                return;
            };
            {
                let mut inner = session.inner.lock();
                if inner.removed || inner.generation != expected_generation {
                    return;
                }
                if inner.state != SessionState::Disconnected {
                    inner.reconnect_pending = false;
                    return;
                }
            }
            if let Err(e) = session.initialize().await {
                warn!(session_id = %session.id, error = %e, "reconnect attempt failed");
            }
        });
    }

    /// Update counters and history after one delivery attempt
    pub(super) async fn record_delivery(
        &self,
        message: QueuedMessage,
        outcome: &Result<(), ConnectionError>,
        queued: bool,
    ) -> DeliveryRecord {
        let status = match outcome {
            Ok(()) => AttemptStatus::Sent,
            Err(e) => AttemptStatus::Failed {
                error: e.to_string(),
            },
        };
        let record = DeliveryRecord {
            message_id: message.id,
            destination: message.destination,
            status,
            enqueued_at: message.enqueued_at,
            attempted_at: Utc::now(),
            queued,
        };

        {
            let mut inner = self.inner.lock();
            match &record.status {
                AttemptStatus::Sent => inner.messages_sent += 1,
                _ => inner.messages_failed += 1,
            }
            inner.last_activity = record.attempted_at;
            inner.deliveries.record(record.clone());
        }

        let event = match &record.status {
            AttemptStatus::Failed { error } => {
                warn!(
                    session_id = %self.id,
                    destination = %record.destination,
                    error = %error,
                    "delivery failed"
                );
                CourierEvent::MessageFailed {
                    session_id: self.id.clone(),
                    message_id: record.message_id.clone(),
                    destination: record.destination.clone(),
                    error: error.clone(),
                }
            }
            _ => {
                debug!(session_id = %self.id, destination = %record.destination, "delivered");
                CourierEvent::MessageDelivered {
                    session_id: self.id.clone(),
                    message_id: record.message_id.clone(),
                    destination: record.destination.clone(),
                }
            }
        };
        self.event_bus.publish(event).await;
        record
    }
}

/// Forward one link's events into its session until the link goes stale
fn spawn_pump(
    session: Weak<Session>,
    generation: u64,
    mut events: mpsc::Receiver<ConnectionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            if !session.handle_event(generation, event).await {
                break;
            }
        }
    })
}
