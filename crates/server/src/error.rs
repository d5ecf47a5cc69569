//! API error types.
//!
//! [`ApiError`] is the only place internal failures become HTTP statuses.
//! Clients get a fixed message per status; the underlying cause is logged.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use stratus_store::StoreError;
use stratus_upstream::FetchError;

pub const MISSING_CITY_MESSAGE: &str = "city query parameter is required";
pub const NOT_FOUND_MESSAGE: &str = "Invalid city or not found";
pub const INTERNAL_MESSAGE: &str = "Something went wrong fetching weather data";

/// API error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("core error: {0}")]
    Core(#[from] stratus_core::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("upstream error: {0}")]
    Upstream(#[from] FetchError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Core(stratus_core::Error::MissingCity) => StatusCode::BAD_REQUEST,
            Self::Upstream(e) if e.is_not_found() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Core(stratus_core::Error::MissingCity) => MISSING_CITY_MESSAGE,
            Self::Upstream(e) if e.is_not_found() => NOT_FOUND_MESSAGE,
            _ => INTERNAL_MESSAGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            error: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
