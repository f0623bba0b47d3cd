//! Connection router: the HTTP face of the session protocol.
//!
//! Two externally-visible operations: opening a streaming connection
//! (`GET` on the SSE path) and delivering an out-of-band message for an
//! existing session (`POST` on the message path with a `sessionId` query
//! parameter). All request-time errors are caught here; nothing propagates
//! to the event loop.

use crate::config::ServerConfig;
use crate::error::{McpError, ProtocolError, SessionError};
use crate::http::session::{SessionRecord, SessionRegistry};
use crate::protocol::transport::Transport;
use crate::protocol::SseServerTransport;
use crate::server::create_session_server;
use crate::widgets::WidgetCatalog;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};

/// Shared state handed to every handler.
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub catalog: Arc<WidgetCatalog>,
    pub config: ServerConfig,
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let sse_path = state.config.sse_path.clone();
    let post_path = state.config.post_path.clone();

    Router::new()
        .route(&sse_path, get(handle_sse).options(handle_preflight))
        .route(
            &post_path,
            post(handle_post_message).options(handle_preflight),
        )
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Open a streaming connection: mint a transport and a fresh protocol-server
/// instance, register the pair, wire the close/error observers, then bind.
async fn handle_sse(State(state): State<Arc<AppState>>) -> Response {
    let server = match create_session_server(Arc::clone(&state.catalog), &state.config) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            error!("Failed to build session server: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to establish SSE connection",
            );
        }
    };

    let (transport, stream) = SseServerTransport::new(&state.config.post_path);
    let session_id = transport.session_id().to_string();
    info!("Opening SSE session {}", session_id);

    // Register before wiring callbacks so a close arriving mid-setup still
    // finds a record to clean up.
    state.registry.add(
        session_id.clone(),
        SessionRecord {
            server: Arc::clone(&server),
            transport: Arc::clone(&transport),
        },
    );

    {
        let registry = Arc::clone(&state.registry);
        let session_id = session_id.clone();
        transport.set_onclose(move || {
            // The transport's own shutdown already tears the server down;
            // registry removal is the only cleanup owed here.
            registry.remove(&session_id);
        });
    }
    {
        let session_id = session_id.clone();
        transport.set_onerror(move |e| {
            error!("SSE transport error on session {}: {}", session_id, e);
        });
    }

    if let Err(e) = server.connect(Arc::clone(&transport)).await {
        // Roll back the registration; the session never became usable.
        state.registry.remove(&session_id);
        error!("Failed to start SSE session {}: {}", session_id, e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to establish SSE connection",
        );
    }

    let body = stream
        .map(|frame| Ok::<_, Infallible>(Event::default().event(frame.event).data(frame.data)));
    let mut response = Sse::new(body).keep_alive(KeepAlive::default()).into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Deliver one out-of-band message to an existing session.
async fn handle_post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let session = match resolve_session(&state.registry, query.session_id.as_deref()) {
        Ok(session) => session,
        Err(e @ SessionError::MissingSessionId) => {
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
        Err(e) => return error_response(StatusCode::NOT_FOUND, &e.to_string()),
    };

    match session.transport.handle_post_message(&body).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            "Accepted",
        )
            .into_response(),
        Err(McpError::Protocol(ProtocolError::ParseError)) => {
            error_response(StatusCode::BAD_REQUEST, "Invalid JSON-RPC message")
        }
        Err(e) => {
            error!(
                "Failed to process message for session {}: {}",
                session.transport.session_id(),
                e
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process message")
        }
    }
}

/// Resolve the target session for a delivery.
///
/// A missing or empty session id fails before any registry lookup.
fn resolve_session(
    registry: &SessionRegistry,
    session_id: Option<&str>,
) -> Result<SessionRecord, SessionError> {
    let session_id = match session_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(SessionError::MissingSessionId),
    };

    registry
        .get(session_id)
        .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
}

async fn handle_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type"),
        ],
    )
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(json!({
            "status": "ok",
            "server": state.config.name,
            "version": state.config.version,
        })),
    )
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        message.to_string(),
    )
        .into_response()
}
