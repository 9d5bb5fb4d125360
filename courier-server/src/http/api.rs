//! REST API handlers

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use courier_core::session::normalize_destination;
use courier_core::{CourierEvent, DeliveryRecord, EventBus, EventSeq, SessionSnapshot};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{ApiError, api_error, session_error};
use crate::middleware::OwnerId;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of active sessions
    pub active_sessions: usize,
}

/// Health check endpoint
///
/// Returns server status, version, uptime, and active session count.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_sessions = state.registry.session_count().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_sessions,
    })
}

/// Response for listing sessions
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSnapshot>,
}

/// GET /api/sessions - The caller's sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
) -> Json<SessionListResponse> {
    let sessions = state.registry.list_by_owner(owner.as_str()).await;
    Json(SessionListResponse { sessions })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
}

/// POST /api/sessions - Create a session and start pairing
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            "session name must not be empty",
        ));
    }

    let session = state.registry.create(name, owner.0).await;
    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

/// Pairing artifact for a session awaiting pairing
#[derive(Debug, Serialize, Deserialize)]
pub struct PairingResponse {
    pub session_id: String,
    pub code: String,
}

/// GET /api/sessions/:id/qr - Current pairing challenge
pub async fn get_pairing(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<PairingResponse>, ApiError> {
    let session = state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;

    match session.pairing_code() {
        Some(code) => Ok(Json(PairingResponse {
            session_id: id,
            code,
        })),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            "NO_PAIRING",
            format!("session is {}, no pairing challenge pending", session.state()),
        )),
    }
}

/// POST /api/sessions/:id/reconnect - Explicit reinitialization
pub async fn reconnect_session(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;
    let session = state
        .registry
        .reinitialize(&id)
        .await
        .map_err(session_error)?;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/sessions/:id - Log out and remove
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;
    state.registry.delete(&id).await.map_err(session_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub destinations: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Messages accepted by this request
    pub queued: usize,
    /// Queue length after the last insertion
    pub queue_length: usize,
}

/// POST /api/sessions/:id/messages - Queue one message per destination
///
/// Destinations are validated up front, so a bad address rejects the whole
/// batch. A full queue stops the batch partway; earlier items stay queued.
pub async fn enqueue_messages(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    let session = state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;

    if request.destinations.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            "at least one destination is required",
        ));
    }
    let domain = &state.registry.config().address_domain;
    for destination in &request.destinations {
        normalize_destination(destination, domain).map_err(session_error)?;
    }

    let mut queue_length = 0;
    for destination in &request.destinations {
        queue_length = session
            .enqueue(destination, &request.message)
            .map_err(session_error)?;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            queued: request.destinations.len(),
            queue_length,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendRequest {
    pub destination: String,
    pub message: String,
}

/// POST /api/sessions/:id/send - Deliver immediately, bypassing the queue
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
    Json(request): Json<SendRequest>,
) -> Result<Json<DeliveryRecord>, ApiError> {
    let session = state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;
    let record = session
        .send_message(&request.destination, &request.message)
        .await
        .map_err(session_error)?;
    Ok(Json(record))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryListResponse {
    pub deliveries: Vec<DeliveryRecord>,
}

/// GET /api/sessions/:id/deliveries - Recent delivery outcomes
pub async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<Json<DeliveryListResponse>, ApiError> {
    let session = state
        .registry
        .get_owned(&id, owner.as_str())
        .await
        .map_err(session_error)?;
    Ok(Json(DeliveryListResponse {
        deliveries: session.recent_deliveries(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub since: Option<EventSeq>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventEntry {
    pub seq: EventSeq,
    pub event: CourierEvent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<EventEntry>,
    /// Pass as `since` to continue from here
    pub next_seq: EventSeq,
}

/// GET /api/events?since= - Replay the caller's retained events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Query(query): Query<EventsQuery>,
) -> Json<EventListResponse> {
    let owned: HashSet<String> = state
        .registry
        .list_by_owner(owner.as_str())
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();
    let since = query.since.unwrap_or(0);

    let retained = state.event_bus.events_from(since).await;
    let next_seq = retained.last().map_or(since, |(seq, _)| seq + 1);
    let events = retained
        .into_iter()
        .filter(|(_, event)| match event {
            CourierEvent::SessionCreated { owner_id, .. } => owner_id == owner.as_str(),
            other => owned.contains(other.session_id()),
        })
        .map(|(seq, event)| EventEntry { seq, event })
        .collect();

    Json(EventListResponse { events, next_seq })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_router;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use courier_core::{
        MemoryCredentialStore, MockConnectionFactory, SessionConfig, SessionRegistry,
        SessionState,
    };
    use std::time::Duration;

    const OWNER: HeaderName = HeaderName::from_static("x-owner-id");

    struct TestApp {
        server: TestServer,
        state: Arc<AppState>,
        factory: Arc<MockConnectionFactory>,
    }

    fn create_test_app() -> TestApp {
        let factory = Arc::new(MockConnectionFactory::new());
        let event_bus = Arc::new(courier_core::MemoryEventBus::new(100));
        let config = SessionConfig {
            pacing_interval_ms: 1,
            queue_capacity: 2,
            ..SessionConfig::default()
        };
        let registry = Arc::new(SessionRegistry::new(
            factory.clone(),
            Arc::new(MemoryCredentialStore::new()),
            event_bus.clone(),
            config,
        ));
        let state = Arc::new(AppState::with_components(registry, event_bus));
        let server = TestServer::new(create_router(Arc::clone(&state))).unwrap();
        TestApp {
            server,
            state,
            factory,
        }
    }

    fn alice() -> HeaderValue {
        HeaderValue::from_static("alice")
    }

    async fn create(app: &TestApp, name: &str) -> SessionSnapshot {
        let response = app
            .server
            .post("/api/sessions")
            .add_header(OWNER, alice())
            .json(&CreateSessionRequest {
                name: name.to_string(),
            })
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn wait_for_state(app: &TestApp, id: &str, state: SessionState) {
        let session = app.state.registry.get(id).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while session.state() != state {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn wait_for_link(app: &TestApp) -> courier_core::connection::MockLink {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(link) = app.factory.last_link() {
                    return link;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap()
    }

    async fn connected_session(app: &TestApp) -> String {
        let snapshot = create(app, "shop").await;
        wait_for_link(app).await.open().await;
        wait_for_state(app, &snapshot.id, SessionState::Connected).await;
        snapshot.id
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app.server.get("/api/health").await;
        response.assert_status_ok();

        let body: HealthResponse = response.json();
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
        assert!(body.uptime_seconds >= 0);
        assert_eq!(body.active_sessions, 0);
    }

    #[tokio::test]
    async fn test_requests_without_owner_are_unauthorized() {
        let app = create_test_app();

        let response = app.server.get("/api/sessions").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_and_list_sessions() {
        let app = create_test_app();
        let created = create(&app, "shop").await;
        assert_eq!(created.state, SessionState::Initializing);
        assert_eq!(created.owner_id, "alice");

        let response = app
            .server
            .get("/api/sessions")
            .add_header(OWNER, alice())
            .await;
        let body: SessionListResponse = response.json();
        assert_eq!(body.sessions.len(), 1);
        assert_eq!(body.sessions[0].id, created.id);

        let other = app
            .server
            .get("/api/sessions")
            .add_header(OWNER, HeaderValue::from_static("bob"))
            .await;
        let body: SessionListResponse = other.json();
        assert!(body.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let app = create_test_app();

        let response = app
            .server
            .post("/api/sessions")
            .add_header(OWNER, alice())
            .json(&CreateSessionRequest {
                name: "  ".to_string(),
            })
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_foreign_session_is_not_found() {
        let app = create_test_app();
        let created = create(&app, "shop").await;

        let response = app
            .server
            .get(&format!("/api/sessions/{}", created.id))
            .add_header(OWNER, HeaderValue::from_static("bob"))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pairing_code_is_served_while_waiting() {
        let app = create_test_app();
        let created = create(&app, "shop").await;
        let path = format!("/api/sessions/{}/qr", created.id);

        let before = app.server.get(&path).add_header(OWNER, alice()).await;
        before.assert_status(StatusCode::NOT_FOUND);

        wait_for_link(&app).await.pairing_challenge("2@abc").await;
        wait_for_state(&app, &created.id, SessionState::WaitingForPairing).await;

        let response = app.server.get(&path).add_header(OWNER, alice()).await;
        response.assert_status_ok();
        let body: PairingResponse = response.json();
        assert_eq!(body.code, "2@abc");
    }

    #[tokio::test]
    async fn test_enqueue_requires_connection() {
        let app = create_test_app();
        let created = create(&app, "shop").await;

        let response = app
            .server
            .post(&format!("/api/sessions/{}/messages", created.id))
            .add_header(OWNER, alice())
            .json(&EnqueueRequest {
                destinations: vec!["15550100".to_string()],
                message: "hi".to_string(),
            })
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_enqueue_delivers_messages() {
        let app = create_test_app();
        let id = connected_session(&app).await;

        let response = app
            .server
            .post(&format!("/api/sessions/{}/messages", id))
            .add_header(OWNER, alice())
            .json(&EnqueueRequest {
                destinations: vec!["111".to_string(), "222".to_string()],
                message: "hi".to_string(),
            })
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        let body: EnqueueResponse = response.json();
        assert_eq!(body.queued, 2);

        let session = app.state.registry.get(&id).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while session.messages_sent() < 2 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        let deliveries = app
            .server
            .get(&format!("/api/sessions/{}/deliveries", id))
            .add_header(OWNER, alice())
            .await;
        let body: DeliveryListResponse = deliveries.json();
        assert_eq!(body.deliveries.len(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_invalid_destination() {
        let app = create_test_app();
        let id = connected_session(&app).await;

        let response = app
            .server
            .post(&format!("/api/sessions/{}/messages", id))
            .add_header(OWNER, alice())
            .json(&EnqueueRequest {
                destinations: vec!["111".to_string(), "nobody".to_string()],
                message: "hi".to_string(),
            })
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let session = app.state.registry.get(&id).await.unwrap();
        assert_eq!(session.snapshot().messages_sent + session.queue_len() as u64, 0);
    }

    #[tokio::test]
    async fn test_enqueue_reports_full_queue() {
        let app = create_test_app();
        let id = connected_session(&app).await;

        let response = app
            .server
            .post(&format!("/api/sessions/{}/messages", id))
            .add_header(OWNER, alice())
            .json(&EnqueueRequest {
                destinations: vec!["1".to_string(), "2".to_string(), "3".to_string()],
                message: "hi".to_string(),
            })
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_direct_send() {
        let app = create_test_app();
        let id = connected_session(&app).await;

        let response = app
            .server
            .post(&format!("/api/sessions/{}/send", id))
            .add_header(OWNER, alice())
            .json(&SendRequest {
                destination: "+1 555 0100".to_string(),
                message: "now".to_string(),
            })
            .await;

        response.assert_status_ok();
        let record: DeliveryRecord = response.json();
        assert_eq!(record.destination, "15550100@s.whatsapp.net");
        assert!(!record.queued);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = create_test_app();
        let created = create(&app, "shop").await;
        let path = format!("/api/sessions/{}", created.id);

        let response = app.server.delete(&path).add_header(OWNER, alice()).await;
        response.assert_status(StatusCode::NO_CONTENT);

        let again = app.server.get(&path).add_header(OWNER, alice()).await;
        again.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reconnect_logged_out_session_conflicts() {
        let app = create_test_app();
        let id = connected_session(&app).await;
        app.factory
            .last_link()
            .unwrap()
            .close_with(courier_core::CloseReason::LoggedOut)
            .await;
        wait_for_state(&app, &id, SessionState::LoggedOut).await;

        let response = app
            .server
            .post(&format!("/api/sessions/{}/reconnect", id))
            .add_header(OWNER, alice())
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_events_are_scoped_to_owner() {
        let app = create_test_app();
        let created = create(&app, "shop").await;
        app.state.registry.create("other", "bob").await;

        let response = app
            .server
            .get("/api/events?since=0")
            .add_header(OWNER, alice())
            .await;
        let body: EventListResponse = response.json();

        assert!(!body.events.is_empty());
        assert!(
            body.events
                .iter()
                .all(|e| e.event.session_id() == created.id)
        );
        assert!(body.next_seq >= body.events.len() as u64);
    }
}
