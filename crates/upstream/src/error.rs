//! Upstream fetch errors.

use thiserror::Error;

/// Errors from a provider lookup.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but the body was not usable.
    #[error("invalid provider response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Whether the provider rejected the location itself.
    ///
    /// weatherapi.com answers 400 for unknown locations, other providers 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 400 | 404, .. })
    }
}

/// Result type for upstream operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
