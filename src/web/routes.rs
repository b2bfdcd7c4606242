//! Router construction and shared response utilities.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::snapshot::SnapshotStore;
use crate::web::status;

/// Snapshot data changes at most a few times a week.
pub const DATA_CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Debug, Clone)]
pub struct WebState {
    pub store: SnapshotStore,
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(header));
    response
}

/// Creates the web server router
pub fn create_router(state: WebState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(status::health))
        .route("/health", get(status::health))
        .route("/health/", get(status::health))
        .route("/data", get(data))
        .route("/data/", get(data))
        .fallback(not_found)
        .with_state(state)
        .layer((
            TraceLayer::new_for_http(),
            cors,
            TimeoutLayer::new(Duration::from_secs(30)),
        ))
}

/// Bind `port` on all interfaces and serve until the process is stopped.
pub async fn serve(state: WebState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, snapshot = %state.store.path().display(), "Serving snapshot");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Server error")
}

/// `GET /data`
///
/// Serves the `no_data` document when nothing usable is on disk.
async fn data(State(state): State<WebState>) -> Response {
    let snapshot = state.store.load_or_default().await;
    with_cache_control(snapshot, DATA_CACHE_CONTROL)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}
