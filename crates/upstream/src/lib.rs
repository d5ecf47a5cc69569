//! Upstream weather provider access for stratus.
//!
//! The server talks to providers only through [`WeatherSource`], so tests and
//! alternative providers can stand in for [`WeatherApiClient`].

pub mod client;
pub mod error;
pub mod response;

pub use client::WeatherApiClient;
pub use error::{FetchError, FetchResult};

use async_trait::async_trait;
use stratus_core::WeatherRecord;

/// A provider of current weather by city name.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Look up current conditions for `city`.
    ///
    /// The returned record carries [`provider_name`](Self::provider_name) as its source.
    async fn fetch(&self, city: &str) -> FetchResult<WeatherRecord>;

    /// Identifier reported as `source` on fetched records.
    fn provider_name(&self) -> &str;
}
