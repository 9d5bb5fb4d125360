//! Shared harness for session integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use courier_core::connection::MockLink;
use courier_core::{
    CredentialStore, MemoryCredentialStore, MemoryEventBus, MockConnectionFactory,
    ReconnectConfig, Session, SessionConfig, SessionState,
};

pub const DOMAIN: &str = "s.whatsapp.net";

/// A standalone session wired to mock collaborators
pub struct Harness {
    pub session: Arc<Session>,
    pub factory: Arc<MockConnectionFactory>,
    pub store: Arc<dyn CredentialStore>,
    pub bus: Arc<MemoryEventBus>,
}

/// Fast pacing and immediate, unbounded reconnects
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        pacing_interval_ms: 1,
        reconnect: ReconnectConfig::unbounded(),
        ..SessionConfig::default()
    }
}

pub fn address(number: &str) -> String {
    format!("{}@{}", number, DOMAIN)
}

/// Build a session and start its first connection attempt
pub async fn harness(config: SessionConfig) -> Harness {
    harness_with(
        config,
        MockConnectionFactory::new(),
        Arc::new(MemoryCredentialStore::new()),
        "session-1",
    )
    .await
}

pub async fn harness_with(
    config: SessionConfig,
    factory: MockConnectionFactory,
    store: Arc<dyn CredentialStore>,
    id: &str,
) -> Harness {
    let factory = Arc::new(factory);
    let bus = Arc::new(MemoryEventBus::new(1000));
    let session = Session::new(
        id,
        "test",
        "owner-1",
        config,
        factory.clone(),
        store.clone(),
        bus.clone(),
    );
    session.initialize().await.expect("initialize");
    Harness {
        session,
        factory,
        store,
        bus,
    }
}

/// A session whose first link has opened
pub async fn connected(config: SessionConfig) -> (Harness, MockLink) {
    let h = harness(config).await;
    let link = h.factory.last_link().expect("link");
    link.open().await;
    wait_for_state(&h.session, SessionState::Connected).await;
    (h, link)
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {}", what);
}

pub async fn wait_for_state(session: &Session, state: SessionState) {
    wait_until(&format!("state {}", state), || session.state() == state).await;
}

pub async fn wait_for_link(factory: &MockConnectionFactory, count: usize) -> MockLink {
    wait_until(&format!("{} links", count), || factory.connect_count() >= count).await;
    factory.link(count - 1).expect("link")
}
