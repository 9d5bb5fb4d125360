//! Error types for courier-core

use thiserror::Error;

/// Errors related to session management
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session is not connected (state: {state})")]
    NotConnected { state: String },

    #[error("Outbound queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Invalid destination: {0:?}")]
    InvalidDestination(String),

    #[error("Session is logged out; delete and recreate it to pair again")]
    LoggedOut,

    #[error("Session has been removed")]
    Removed,

    #[error("Session setup failed: {0}")]
    Setup(String),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Errors reported by a connection handle or its factory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Failed to establish connection: {0}")]
    SetupFailed(String),

    #[error("Delivery to {destination} failed: {message}")]
    SendFailed { destination: String, message: String },

    #[error("Connection is closed")]
    Closed,
}

/// Errors from credential storage
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored credentials are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_not_found_displays_correctly() {
        let error = SessionError::NotFound("abc123".to_string());
        assert!(error.to_string().contains("Session not found"));
        assert!(error.to_string().contains("abc123"));
    }

    #[test]
    fn session_error_not_connected_names_state() {
        let error = SessionError::NotConnected {
            state: "WAITING_FOR_PAIRING".to_string(),
        };
        assert!(error.to_string().contains("not connected"));
        assert!(error.to_string().contains("WAITING_FOR_PAIRING"));
    }

    #[test]
    fn session_error_queue_full_names_capacity() {
        let error = SessionError::QueueFull { capacity: 5 };
        assert!(error.to_string().contains("capacity 5"));
    }

    #[test]
    fn connection_error_send_failed_displays_destination() {
        let error = ConnectionError::SendFailed {
            destination: "123@s.whatsapp.net".to_string(),
            message: "timeout".to_string(),
        };
        assert!(error.to_string().contains("123@s.whatsapp.net"));
        assert!(error.to_string().contains("timeout"));
    }

    #[test]
    fn session_error_converts_from_connection_error() {
        let session_error: SessionError = ConnectionError::Closed.into();
        assert!(matches!(session_error, SessionError::Connection(_)));
    }

    #[test]
    fn credential_error_converts_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: CredentialError = io_error.into();
        assert!(error.to_string().contains("denied"));
    }
}
