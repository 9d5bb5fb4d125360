//! Event type definitions

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Events published by sessions and the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CourierEvent {
    /// A session was registered
    SessionCreated {
        session_id: String,
        owner_id: String,
        name: String,
    },

    /// A session moved between lifecycle states
    SessionStateChanged {
        session_id: String,
        from: SessionState,
        to: SessionState,
    },

    /// A new pairing artifact is available
    PairingChallenge { session_id: String, code: String },

    /// A message was accepted by the connection
    MessageDelivered {
        session_id: String,
        message_id: String,
        destination: String,
    },

    /// A message could not be delivered; it will not be retried
    MessageFailed {
        session_id: String,
        message_id: String,
        destination: String,
        error: String,
    },

    /// A session was deleted from the registry
    SessionRemoved { session_id: String },
}

impl CourierEvent {
    /// Get the session ID this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::SessionStateChanged { session_id, .. }
            | Self::PairingChallenge { session_id, .. }
            | Self::MessageDelivered { session_id, .. }
            | Self::MessageFailed { session_id, .. }
            | Self::SessionRemoved { session_id } => session_id,
        }
    }
}
