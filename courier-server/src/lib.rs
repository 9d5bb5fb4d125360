//! courier-server - HTTP server for the courier gateway
//!
//! This crate provides the server infrastructure that owns the SessionRegistry
//! and EventBus. Tenants drive their sessions through the REST API.

mod error;
pub mod http;
pub mod middleware;
mod state;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::{ApiError, ErrorResponse, ServerError};
pub use http::create_router;
pub use middleware::{OWNER_HEADER, OwnerId};
pub use state::AppState;

/// The main courier server
pub struct CourierServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl CourierServer {
    /// Create a new server with default state
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(AppState::default()),
        }
    }

    /// Create a server with custom state
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    ///
    /// Stops on ctrl-c.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener).await
    }

    /// Run the server on an already-bound listener until ctrl-c
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then close every session link
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("courier server listening on {}", addr);
        }

        self.start_event_logging();

        let registry = Arc::clone(&self.state.registry);
        let router = create_router(self.state);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("courier server stopping");
        registry.shutdown().await;
        Ok(())
    }

    /// Start a background task that mirrors bus events into the trace log
    fn start_event_logging(&self) {
        use courier_core::EventBus;

        let mut rx = self.state.event_bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok((seq, event)) => {
                        tracing::trace!(seq, session_id = event.session_id(), ?event, "event");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Event bus channel closed");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(count)) => {
                        tracing::warn!("Event logging lagged by {} events", count);
                    }
                }
            }
        });
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7450,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:7450")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
