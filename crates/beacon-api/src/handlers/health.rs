//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use beacon_core::traits::store::KeyValueStore;
use tracing::warn;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
///
/// Returns 503 when the store cannot be reached, since no credential can be
/// validated without it.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let store_ok = match state.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            false
        }
    };

    let (status, label, store) = if store_ok {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    let body = HealthResponse {
        status: label.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
        connections: state.engine.connected_count(),
        metrics: state.engine.metrics(),
    };

    (status, Json(ApiResponse::ok(body)))
}
