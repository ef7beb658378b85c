//local shortcuts
use crate::{Authenticator, OutboundFrame, Supervisor};
use crate::server::connection::run_connection;

//third-party shortcuts
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

//standard shortcuts
use std::sync::Arc;

//-------------------------------------------------------------------------------------------------------------------

#[derive(Clone)]
struct AppState
{
    supervisor: Supervisor,
    authenticator: Arc<dyn Authenticator>,
}

//-------------------------------------------------------------------------------------------------------------------

/// Build the axum router exposing `/ws` (component G's accept loop), `/health`, and `/metrics`.
///
/// Callers bind a [`tokio::net::TcpListener`] and drive this with `axum::serve`; use
/// `into_make_service_with_connect_info::<SocketAddr>()` if the authenticator needs the peer
/// address. Mirrors the teacher's `build_router`/`ws_upgrade` split.
pub fn build_router(supervisor: Supervisor, authenticator: Arc<dyn Authenticator>) -> Router
{
    let state = AppState{ supervisor, authenticator };

    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Convenience wrapper around [`build_router`] for callers that don't need authentication
/// (the core's default, per spec.md's non-goal of owning auth).
pub fn build_router_default(supervisor: Supervisor) -> Router
{
    build_router(supervisor, Arc::new(crate::AllowAll))
}

//-------------------------------------------------------------------------------------------------------------------

/// Liveness route (supplemented feature, §11): 200 while the accept loop is up.
async fn health() -> &'static str
{
    "ok"
}

/// Plain-text counters route (supplemented feature, §11): `name value` lines, not
/// Prometheus-formatted, matching spec.md §6's "integer counters only" observability surface.
async fn metrics(State(state): State<AppState>) -> String
{
    state.supervisor.metrics.snapshot().render_text()
}

/// Reject a connection at the HTTP level, before any WebSocket upgrade completes, per spec.md
/// §4.F ("the TCP connection is closed after sending an HTTP-level error during upgrade").
fn reject_at_upgrade(code: crate::ErrorCode) -> impl IntoResponse
{
    let frame = OutboundFrame::error_default(code);
    let body = frame.encode().unwrap_or_default();
    (axum::http::StatusCode::SERVICE_UNAVAILABLE, body)
}

async fn ws_upgrade(State(state): State<AppState>, headers: HeaderMap, ws: WebSocketUpgrade) -> impl IntoResponse
{
    if !state.supervisor.try_admit()
    {
        tracing::warn!("connection limit reached, rejecting at upgrade");
        return reject_at_upgrade(crate::ErrorCode::ConnectionLimit).into_response();
    }

    let credential = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let supervisor = state.supervisor.clone();
    let authenticator = state.authenticator.clone();

    ws.on_upgrade(move |socket| async move {
        run_connection(socket, supervisor, authenticator, credential).await;
    })
    .into_response()
}

//-------------------------------------------------------------------------------------------------------------------
