//! Health and status handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use tracing::{trace, warn};
use ts_rs::TS;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct HealthResponse {
    status: HealthStatus,
    timestamp: String,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusResponse {
    version: String,
    commit: String,
    store: String,
    /// Background matching runs still in flight.
    pending_matches: usize,
}

/// Health check endpoint; 503 when the store cannot be reached.
pub(super) async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    trace!("health check requested");
    let (code, status) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, HealthStatus::Healthy),
        Err(e) => {
            warn!(error = ?e, "store ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// Status endpoint showing build and backend information
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_SHORT").to_string(),
        store: state.store.backend().to_string(),
        pending_matches: state.tasks.len(),
    })
}
