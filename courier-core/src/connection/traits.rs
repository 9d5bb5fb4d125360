//! Connection trait and related types
//!
//! A connection is one authenticated link to the messaging network. The
//! protocol client behind it is pluggable: sessions only see the events it
//! emits and the `send` primitive it offers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::credentials::Credentials;
use crate::error::ConnectionError;

/// Why a link closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloseReason {
    /// The account was logged out remotely; the credentials are dead
    LoggedOut,
    /// Any other closure (network loss, server restart, stream error)
    Transient { message: String },
}

impl CloseReason {
    /// Convenience constructor for transient closures
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Lifecycle events emitted by a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// A pairing challenge must be presented out-of-band
    PairingChallenge { code: String },
    /// The link is open and can deliver messages
    Opened,
    /// The link closed
    Closed { reason: CloseReason },
    /// Credential material changed and must be persisted
    CredentialsUpdated { credentials: Credentials },
}

/// What a session hands to the factory when (re)connecting
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Session the link belongs to
    pub session_id: String,
    /// Previously persisted credentials, if any
    pub credentials: Option<Credentials>,
}

/// A freshly established link: the handle plus its event stream
///
/// The receiver is the only consumer of the link's events.
pub struct ConnectionLink {
    pub handle: Arc<dyn Connection>,
    pub events: mpsc::Receiver<ConnectionEvent>,
}

/// Trait for connection handles
#[async_trait]
pub trait Connection: Send + Sync {
    /// Deliver one payload to an already-normalized destination address
    async fn send(&self, destination: &str, payload: &str) -> Result<(), ConnectionError>;

    /// Log the account out remotely, invalidating its credentials
    async fn logout(&self) -> Result<(), ConnectionError>;

    /// Sever the link without logging out
    async fn close(&self);
}

/// Factory for establishing connections
///
/// Enables dependency injection of protocol clients.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Establish a new link; failures here are setup failures
    async fn connect(&self, request: ConnectRequest) -> Result<ConnectionLink, ConnectionError>;
}
