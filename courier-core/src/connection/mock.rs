//! Mock connections for testing
//!
//! MockConnectionFactory records every link it hands out so tests can drive
//! a session by emitting lifecycle events into it, and records every send
//! attempt in the order the connection observed it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::traits::{
    CloseReason, ConnectRequest, Connection, ConnectionEvent, ConnectionFactory, ConnectionLink,
};
use crate::credentials::Credentials;
use crate::error::ConnectionError;

/// Capacity of each mock link's event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One send attempt observed by a mock connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    /// Index of the link that carried the attempt
    pub link: usize,
    pub destination: String,
    pub payload: String,
    pub succeeded: bool,
}

/// State shared between the factory and all its connections
#[derive(Default)]
struct MockShared {
    attempts: Mutex<Vec<SendAttempt>>,
    failing_destinations: Mutex<HashSet<String>>,
    send_delay: Mutex<Duration>,
}

/// Mock implementation of Connection
pub struct MockConnection {
    index: usize,
    shared: Arc<MockShared>,
    closed: AtomicBool,
    logged_out: AtomicBool,
}

impl MockConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&self, destination: &str, payload: &str) -> Result<(), ConnectionError> {
        let delay = *self.shared.send_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let succeeded = !self.shared.failing_destinations.lock().contains(destination);
        self.shared.attempts.lock().push(SendAttempt {
            link: self.index,
            destination: destination.to_string(),
            payload: payload.to_string(),
            succeeded,
        });

        if succeeded {
            Ok(())
        } else {
            Err(ConnectionError::SendFailed {
                destination: destination.to_string(),
                message: "scripted failure".to_string(),
            })
        }
    }

    async fn logout(&self) -> Result<(), ConnectionError> {
        self.logged_out.store(true, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Test-side controller for one link handed out by the factory
#[derive(Clone)]
pub struct MockLink {
    /// The request the session connected with
    pub request: ConnectRequest,
    connection: Arc<MockConnection>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl MockLink {
    /// Emit an arbitrary event into the owning session
    ///
    /// Events sent after the session dropped this link are discarded.
    pub async fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event).await;
    }

    pub async fn pairing_challenge(&self, code: &str) {
        self.emit(ConnectionEvent::PairingChallenge {
            code: code.to_string(),
        })
        .await;
    }

    pub async fn open(&self) {
        self.emit(ConnectionEvent::Opened).await;
    }

    pub async fn close_with(&self, reason: CloseReason) {
        self.connection.closed.store(true, Ordering::SeqCst);
        self.emit(ConnectionEvent::Closed { reason }).await;
    }

    pub async fn update_credentials(&self, credentials: Credentials) {
        self.emit(ConnectionEvent::CredentialsUpdated { credentials })
            .await;
    }

    /// The connection handle behind this link
    pub fn connection(&self) -> &MockConnection {
        &self.connection
    }
}

/// Factory for creating MockConnection instances
#[derive(Default)]
pub struct MockConnectionFactory {
    shared: Arc<MockShared>,
    links: Mutex<Vec<MockLink>>,
    setup_failures: Mutex<VecDeque<String>>,
}

impl MockConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every send by `delay` (simulates a slow network)
    pub fn with_send_delay(self, delay: Duration) -> Self {
        *self.shared.send_delay.lock() = delay;
        self
    }

    /// Make every send to `destination` fail
    pub fn fail_destination(&self, destination: impl Into<String>) {
        self.shared
            .failing_destinations
            .lock()
            .insert(destination.into());
    }

    /// Make the next `connect` call fail with a setup error
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        self.setup_failures.lock().push_back(message.into());
    }

    /// Number of links handed out so far
    pub fn connect_count(&self) -> usize {
        self.links.lock().len()
    }

    /// Controller for the `index`-th link (0-based)
    pub fn link(&self, index: usize) -> Option<MockLink> {
        self.links.lock().get(index).cloned()
    }

    /// Controller for the most recent link
    pub fn last_link(&self) -> Option<MockLink> {
        self.links.lock().last().cloned()
    }

    /// Every send attempt across all links, in observation order
    pub fn attempts(&self) -> Vec<SendAttempt> {
        self.shared.attempts.lock().clone()
    }

    /// Destinations of successful sends, in order
    pub fn delivered(&self) -> Vec<String> {
        self.shared
            .attempts
            .lock()
            .iter()
            .filter(|a| a.succeeded)
            .map(|a| a.destination.clone())
            .collect()
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn connect(&self, request: ConnectRequest) -> Result<ConnectionLink, ConnectionError> {
        if let Some(message) = self.setup_failures.lock().pop_front() {
            return Err(ConnectionError::SetupFailed(message));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut links = self.links.lock();
        let connection = Arc::new(MockConnection {
            index: links.len(),
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
            logged_out: AtomicBool::new(false),
        });
        links.push(MockLink {
            request,
            connection: Arc::clone(&connection),
            events: tx,
        });

        Ok(ConnectionLink {
            handle: connection,
            events: rx,
        })
    }
}
