//! Store error types.

use thiserror::Error;

/// Cache store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("redis error: {0}")]
    Redis(redis::RedisError),

    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
        {
            Self::Unavailable(e.to_string())
        } else {
            Self::Redis(e)
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
