//! Health handlers.

use axum::response::Json;
use serde::Serialize;
use tracing::trace;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    commit: &'static str,
    time: String,
}

/// `GET /` and `GET /health`
pub(super) async fn health() -> Json<HealthResponse> {
    trace!("health check requested");
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        time: chrono::Utc::now().to_rfc3339(),
    })
}
