//! Liveness and health endpoints.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

pub const RUNNING_MESSAGE: &str = "Weather API is running ✅";

/// Root response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: RUNNING_MESSAGE.to_string(),
    })
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}

/// GET /health
///
/// Intentionally not rate limited so load balancers can poll it.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let store = state.store.backend_name().to_string();

    match state.store.health_check().await {
        Ok(()) => Json(HealthResponse {
            status: "ok".to_string(),
            store,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(store = %store, error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    store,
                }),
            )
                .into_response()
        }
    }
}
