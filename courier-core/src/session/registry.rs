//! SessionRegistry for managing many tenants' sessions
//!
//! The registry owns every live session, keyed by a generated id. It uses a
//! ConnectionFactory for dependency injection of protocol clients.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::handle::{Session, SessionSnapshot};
use crate::config::SessionConfig;
use crate::connection::ConnectionFactory;
use crate::credentials::CredentialStore;
use crate::error::SessionError;
use crate::events::{CourierEvent, EventBus};

/// Manages all messaging sessions
///
/// SessionRegistry provides:
/// - Session creation with unique IDs and background initialization
/// - Lookup by ID, optionally scoped to an owner
/// - Deletion with remote logout and credential cleanup
/// - Graceful shutdown of every session
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    factory: Arc<dyn ConnectionFactory>,
    credentials: Arc<dyn CredentialStore>,
    event_bus: Arc<dyn EventBus>,
    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        credentials: Arc<dyn CredentialStore>,
        event_bus: Arc<dyn EventBus>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
            credentials,
            event_bus,
            config,
        }
    }

    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a new session and start connecting it
    ///
    /// Returns immediately; the link is established in the background.
    pub async fn create(
        &self,
        name: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Arc<Session> {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(
            id.clone(),
            name,
            owner_id,
            self.config.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.credentials),
            Arc::clone(&self.event_bus),
        );

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::clone(&session));

        info!(session_id = %id, owner_id = %session.owner_id(), "session created");
        self.event_bus
            .publish(CourierEvent::SessionCreated {
                session_id: id,
                owner_id: session.owner_id().to_string(),
                name: session.name().to_string(),
            })
            .await;

        let starting = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = starting.initialize().await {
                warn!(session_id = %starting.id(), error = %e, "initial connect failed");
            }
        });

        session
    }

    /// Get a session by ID
    pub async fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Get a session by ID, hiding sessions that belong to someone else
    pub async fn get_owned(&self, id: &str, owner_id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self.get(id).await?;
        if session.owner_id() != owner_id {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(session)
    }

    /// Snapshots of one owner's sessions, oldest first
    pub async fn list_by_owner(&self, owner_id: &str) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.owner_id() == owner_id)
            .map(|s| s.snapshot())
            .collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Snapshots of every session, oldest first
    pub async fn list_all(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| s.snapshot())
            .collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Remove a session, log it out and forget its credentials
    ///
    /// Returns false if no such session existed.
    pub async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        let Some(session) = self.sessions.write().await.remove(id) else {
            return Ok(false);
        };

        session.disconnect(true).await;
        self.credentials.remove(id).await?;

        info!(session_id = %id, "session deleted");
        self.event_bus
            .publish(CourierEvent::SessionRemoved {
                session_id: id.to_string(),
            })
            .await;
        Ok(true)
    }

    /// Explicitly restart a session's connection
    pub async fn reinitialize(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self.get(id).await?;
        session.reinitialize().await?;
        Ok(session)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every link without logging out; credentials are kept
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        info!(count = sessions.len(), "shutting down sessions");
        for (_, session) in sessions {
            session.disconnect(false).await;
        }
    }
}
