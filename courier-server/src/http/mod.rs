//! HTTP server module

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use api::{
    CreateSessionRequest, DeliveryListResponse, EnqueueRequest, EnqueueResponse, EventEntry,
    EventListResponse, HealthResponse, PairingResponse, SendRequest, SessionListResponse,
};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route(
            "/api/sessions",
            get(api::list_sessions).post(api::create_session),
        )
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/:id/qr", get(api::get_pairing))
        .route("/api/sessions/:id/reconnect", post(api::reconnect_session))
        .route("/api/sessions/:id/messages", post(api::enqueue_messages))
        .route("/api/sessions/:id/send", post(api::send_message))
        .route("/api/sessions/:id/deliveries", get(api::list_deliveries))
        .route("/api/events", get(api::list_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_router_has_health_endpoint() {
        let state = Arc::new(AppState::default());
        let router = create_router(state);
        let server = TestServer::new(router).unwrap();

        let response = server.get("/api/health").await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = TestServer::new(create_router(Arc::new(AppState::default()))).unwrap();

        let response = server.get("/api/nope").await;
        response.assert_status_not_found();
    }
}
