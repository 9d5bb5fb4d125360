//! Shared application state for the courier server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_core::{
    ConnectionFactory, CredentialStore, EventBus, MemoryCredentialStore, MemoryEventBus,
    SessionConfig, SessionRegistry, SimulatedConnectionFactory,
};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Registry owning every session
    pub registry: Arc<SessionRegistry>,
    /// Event bus for publishing/subscribing to events
    pub event_bus: Arc<MemoryEventBus>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state around a registry built from the given collaborators
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        credentials: Arc<dyn CredentialStore>,
        config: SessionConfig,
    ) -> Self {
        let event_bus = Arc::new(MemoryEventBus::new(10_000));
        let registry = Arc::new(SessionRegistry::new(
            factory,
            credentials,
            Arc::clone(&event_bus) as Arc<dyn EventBus>,
            config,
        ));
        Self::with_components(registry, event_bus)
    }

    /// Create AppState with custom components (for testing)
    pub fn with_components(registry: Arc<SessionRegistry>, event_bus: Arc<MemoryEventBus>) -> Self {
        Self {
            registry,
            event_bus,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    /// Simulated connections and in-memory credentials
    fn default() -> Self {
        Self::new(
            Arc::new(SimulatedConnectionFactory::default()),
            Arc::new(MemoryCredentialStore::new()),
            SessionConfig::default(),
        )
    }
}
