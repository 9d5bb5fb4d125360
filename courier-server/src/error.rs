//! Server error types

use axum::Json;
use axum::http::StatusCode;
use courier_core::{ConnectionError, SessionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the courier server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body returned with every non-2xx API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error half of every API handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

impl From<SessionError> for ErrorResponse {
    fn from(e: SessionError) -> Self {
        let (_, Json(body)) = session_error(e);
        body
    }
}

/// Map a session error onto a status code and error body
pub(crate) fn session_error(e: SessionError) -> ApiError {
    let (status, code) = match &e {
        SessionError::NotFound(_) | SessionError::Removed => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SessionError::NotConnected { .. } => (StatusCode::CONFLICT, "NOT_CONNECTED"),
        SessionError::LoggedOut => (StatusCode::CONFLICT, "LOGGED_OUT"),
        SessionError::QueueFull { .. } => (StatusCode::TOO_MANY_REQUESTS, "QUEUE_FULL"),
        SessionError::InvalidDestination(_) => (StatusCode::BAD_REQUEST, "INVALID_DESTINATION"),
        SessionError::Connection(ConnectionError::SendFailed { .. }) => {
            (StatusCode::BAD_GATEWAY, "SEND_FAILED")
        }
        SessionError::Setup(_) | SessionError::Connection(_) => {
            (StatusCode::BAD_GATEWAY, "CONNECTION_FAILED")
        }
        SessionError::Credential(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    api_error(status, code, e.to_string())
}
