//! Shared test utilities for courier-server integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    CredentialStore, MemoryCredentialStore, SessionConfig, SimulatedConnectionFactory,
};
use courier_server::{AppState, CourierServer, ServerConfig};
use tokio::net::TcpListener;

/// Pairing completes this long after the challenge
pub const PAIR_AFTER: Duration = Duration::from_millis(100);

/// Creates a test server backed by simulated connections
#[allow(dead_code)]
pub async fn create_test_server() -> (Arc<AppState>, SocketAddr) {
    create_test_server_with_store(Arc::new(MemoryCredentialStore::new())).await
}

/// Creates a test server with a specific credential store
#[allow(dead_code)]
pub async fn create_test_server_with_store(
    store: Arc<dyn CredentialStore>,
) -> (Arc<AppState>, SocketAddr) {
    let config = SessionConfig {
        pacing_interval_ms: 5,
        ..SessionConfig::default()
    };
    let state = Arc::new(AppState::new(
        Arc::new(SimulatedConnectionFactory::new(PAIR_AFTER)),
        store,
        config,
    ));

    let server = CourierServer::with_state(ServerConfig::default(), Arc::clone(&state));
    let addr = spawn_server(server).await;

    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: CourierServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}

/// HTTP client that always sends an owner header
#[allow(dead_code)]
pub struct ApiClient {
    base: String,
    owner: String,
    http: reqwest::Client,
}

#[allow(dead_code)]
impl ApiClient {
    pub fn new(addr: SocketAddr, owner: &str) -> Self {
        Self {
            base: format!("http://{}", addr),
            owner: owner.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(format!("{}{}", self.base, path))
            .header("x-owner-id", &self.owner)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.http
            .post(format!("{}{}", self.base, path))
            .header("x-owner-id", &self.owner)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.http
            .delete(format!("{}{}", self.base, path))
            .header("x-owner-id", &self.owner)
            .send()
            .await
            .unwrap()
    }

    /// Poll a session until it reports `state`
    pub async fn wait_for_state(&self, id: &str, state: &str) -> serde_json::Value {
        let path = format!("/api/sessions/{}", id);
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot: serde_json::Value = self.get(&path).await.json().await.unwrap();
                if snapshot["state"] == state {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("session {} never reached {}", id, state))
    }
}
