//! Simulated protocol client for local development
//!
//! Stands in for a real messaging-network client when running the server
//! without one. Unpaired sessions receive a pairing challenge and are
//! "paired" automatically after a delay; paired sessions open directly.
//! Sends are logged and always succeed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{
    ConnectRequest, Connection, ConnectionEvent, ConnectionFactory, ConnectionLink,
};
use crate::credentials::Credentials;
use crate::error::ConnectionError;

/// Connection that logs payloads instead of delivering them
struct SimulatedConnection {
    session_id: String,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for SimulatedConnection {
    async fn send(&self, destination: &str, payload: &str) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }
        info!(
            session_id = %self.session_id,
            destination,
            bytes = payload.len(),
            "simulated delivery"
        );
        Ok(())
    }

    async fn logout(&self) -> Result<(), ConnectionError> {
        self.closed.store(true, Ordering::SeqCst);
        debug!(session_id = %self.session_id, "simulated logout");
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory for simulated connections
#[derive(Debug, Clone)]
pub struct SimulatedConnectionFactory {
    pair_after: Duration,
}

impl SimulatedConnectionFactory {
    /// Create a factory that completes pairing `pair_after` the challenge
    pub fn new(pair_after: Duration) -> Self {
        Self { pair_after }
    }
}

impl Default for SimulatedConnectionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ConnectionFactory for SimulatedConnectionFactory {
    async fn connect(&self, request: ConnectRequest) -> Result<ConnectionLink, ConnectionError> {
        let (tx, rx) = mpsc::channel(8);
        let handle = Arc::new(SimulatedConnection {
            session_id: request.session_id.clone(),
            closed: AtomicBool::new(false),
        });
        let pair_after = self.pair_after;

        tokio::spawn(async move {
            if request.credentials.is_none() {
                let code = format!("2@{}", Uuid::new_v4().simple());
                if tx
                    .send(ConnectionEvent::PairingChallenge { code })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(pair_after).await;

                let credentials = Credentials::new(serde_json::json!({
                    "device": Uuid::new_v4().to_string(),
                    "paired_at": Utc::now().to_rfc3339(),
                }));
                if tx
                    .send(ConnectionEvent::CredentialsUpdated { credentials })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            let _ = tx.send(ConnectionEvent::Opened).await;
        });

        Ok(ConnectionLink { handle, events: rx })
    }
}
