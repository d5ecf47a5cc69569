//! Application state shared across handlers.

use crate::gateway::CacheGateway;
use crate::ratelimit::RateLimitState;
use std::sync::Arc;
use std::time::Duration;
use stratus_core::config::AppConfig;
use stratus_store::WeatherStore;
use stratus_upstream::WeatherSource;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Cache store, also used for health checks.
    pub store: Arc<dyn WeatherStore>,
    /// Cache-aside lookup over the store and the upstream.
    pub gateway: Arc<CacheGateway>,
    /// Rate limiting state.
    pub rate_limit: RateLimitState,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Validates the configuration first and logs a warning for each risky
    /// but legal setting.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn WeatherStore>,
        source: Arc<dyn WeatherSource>,
    ) -> stratus_core::Result<Self> {
        for warning in config.validate()? {
            tracing::warn!("Configuration warning: {}", warning);
        }

        let rate_limit = RateLimitState::new(&config.rate_limit);
        let gateway = Arc::new(CacheGateway::new(store.clone(), source, &config.cache));

        Ok(Self {
            config: Arc::new(config),
            store,
            gateway,
            rate_limit,
        })
    }

    /// Get the cleanup interval for the rate limiter, if enabled.
    /// Falls back to 60 seconds for a zero interval, which would make
    /// tokio::time::interval panic.
    pub fn rate_limit_cleanup_interval(&self) -> Option<Duration> {
        if !self.rate_limit.is_enabled() {
            return None;
        }

        let interval_secs = self.config.rate_limit.cleanup_interval_secs;
        if interval_secs == 0 {
            tracing::warn!("rate_limit.cleanup_interval_secs is 0, using default of 60 seconds");
            Some(Duration::from_secs(60))
        } else {
            Some(Duration::from_secs(interval_secs))
        }
    }
}
