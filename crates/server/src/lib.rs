//! HTTP server for the stratus weather cache.
//!
//! This crate provides:
//! - `GET /weather?city=` served cache-aside from the store and the upstream
//! - Per-client rate limiting of the weather endpoint
//! - Health and Prometheus metrics endpoints

pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use gateway::CacheGateway;
pub use ratelimit::RateLimitState;
pub use routes::create_router;
pub use state::AppState;
