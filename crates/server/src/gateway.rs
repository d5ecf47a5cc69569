//! Cache-aside lookup of weather records.

use crate::error::ApiResult;
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stratus_core::config::CacheConfig;
use stratus_core::{City, WeatherRecord};
use stratus_store::WeatherStore;
use stratus_upstream::WeatherSource;

/// Serves records from the store, falling back to the upstream on a miss.
///
/// A hit is returned with `source = "cache"` and never refreshes the entry's
/// expiry. A miss fetches once, writes the record with the configured TTL and
/// returns it with the provider's source. Concurrent misses for one city each
/// fetch; the last write wins.
pub struct CacheGateway {
    store: Arc<dyn WeatherStore>,
    source: Arc<dyn WeatherSource>,
    ttl: Duration,
    bypass_on_store_error: bool,
}

impl CacheGateway {
    pub fn new(
        store: Arc<dyn WeatherStore>,
        source: Arc<dyn WeatherSource>,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            store,
            source,
            ttl: cache.ttl(),
            bypass_on_store_error: cache.bypass_on_store_error,
        }
    }

    /// Look up current weather for `city`.
    pub async fn get(&self, city: &City) -> ApiResult<WeatherRecord> {
        let key = city.cache_key();

        match self.store.get(&key).await {
            Ok(Some(json)) => match WeatherRecord::from_json(&json) {
                Ok(record) => {
                    metrics::record_cache_lookup("hit");
                    tracing::debug!(key = %key, "Cache hit");
                    return Ok(record.into_cached());
                }
                Err(e) => {
                    metrics::record_cache_lookup("corrupt");
                    tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                }
            },
            Ok(None) => {
                metrics::record_cache_lookup("miss");
                tracing::debug!(key = %key, "Cache miss");
            }
            Err(e) => {
                metrics::record_store_error("get");
                if !self.bypass_on_store_error {
                    return Err(e.into());
                }
                tracing::warn!(key = %key, error = %e, "Store read failed, serving from upstream");
            }
        }

        let record = self.fetch(city).await?;
        let json = record.to_json()?;

        if let Err(e) = self.store.set_with_expiry(&key, &json, self.ttl).await {
            metrics::record_store_error("set");
            if !self.bypass_on_store_error {
                return Err(e.into());
            }
            tracing::warn!(key = %key, error = %e, "Store write failed, record not cached");
        }

        Ok(record)
    }

    async fn fetch(&self, city: &City) -> ApiResult<WeatherRecord> {
        let started = Instant::now();
        let result = self.source.fetch(city.as_str()).await;
        metrics::UPSTREAM_DURATION.observe(started.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_not_found() => "not_found",
            Err(_) => "error",
        };
        metrics::UPSTREAM_REQUESTS.with_label_values(&[outcome]).inc();

        match result {
            Ok(record) => {
                tracing::debug!(
                    city = %city,
                    provider = self.source.provider_name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Fetched from upstream"
                );
                Ok(record)
            }
            Err(e) => Err(e.into()),
        }
    }
}
