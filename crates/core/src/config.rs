//! Configuration types shared across crates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host (default: "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port (default: 3000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Socket address string to bind, e.g. "0.0.0.0:3000" or "[::1]:3000".
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Cache behavior configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Expiry applied to every cache write, in seconds (default: 43200 = 12 hours).
    /// The expiry is absolute from write time; reads never refresh it.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Serve straight from the upstream when the store fails (default: false).
    /// When false, a store failure fails the request with a 500.
    #[serde(default)]
    pub bypass_on_store_error: bool,
}

fn default_ttl_secs() -> u64 {
    crate::DEFAULT_CACHE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            bypass_on_store_error: false,
        }
    }
}

impl CacheConfig {
    /// Cache TTL as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Cache store backend.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis (or any server speaking the Redis protocol).
    #[default]
    Redis,
    /// In-process map. Not shared between instances; for development and tests.
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
        }
    }
}

/// Cache store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type (default: redis).
    #[serde(default)]
    pub backend: StoreBackend,
    /// Connection URL for the redis backend (default: "redis://localhost:6379").
    #[serde(default = "default_store_url")]
    pub url: String,
    /// Seconds to wait for the initial connection before giving up (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds between sweeps of expired entries in the memory backend (default: 60).
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

fn default_store_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_purge_interval_secs() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_store_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl StoreConfig {
    /// In-memory store configuration.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Default::default()
        }
    }

    /// Connection timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Interval between expired-entry sweeps as a Duration.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    /// Validate store configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.backend == StoreBackend::Redis && self.url.trim().is_empty() {
            return Err("store.url is required for the redis backend".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("store.connect_timeout_secs cannot be 0".to_string());
        }
        // Zero would make tokio::time::interval panic
        if self.backend == StoreBackend::Memory && self.purge_interval_secs == 0 {
            return Err("store.purge_interval_secs cannot be 0 for the memory backend".to_string());
        }
        Ok(())
    }
}

/// Upstream weather provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Full URL of the current-conditions endpoint
    /// (e.g., "https://api.weatherapi.com/v1/current.json").
    pub base_url: String,
    /// Provider API key, sent as the `key` query parameter.
    /// WARNING: Prefer the WEATHER_API_KEY env var over storing it in config files.
    pub api_key: String,
    /// Identifier reported as `source` on freshly fetched records.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Request timeout in seconds. Unset means the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_provider() -> String {
    "weatherapi.com".to_string()
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("provider", &self.provider)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl UpstreamConfig {
    /// Request timeout as a Duration, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Validate upstream configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(format!(
                "upstream.base_url must be an http(s) URL, got '{}'",
                self.base_url
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err("upstream.api_key cannot be empty".to_string());
        }
        if self.timeout_secs == Some(0) {
            return Err("upstream.timeout_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Rate limiting algorithm.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// Counter per client that resets when the window elapses.
    #[default]
    FixedWindow,
    /// Admission times per client; at most `max_requests` inside any trailing window.
    SlidingLog,
}

/// Rate limiting configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true).
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Limiting algorithm (default: fixed_window).
    #[serde(default)]
    pub strategy: RateLimitStrategy,
    /// Requests allowed per client within one window (default: 60).
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds (default: 900 = 15 minutes).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Trusted proxy IP addresses/CIDR ranges.
    /// Only requests from these IPs will have X-Forwarded-For/X-Real-IP headers trusted.
    /// If empty, forwarded headers are never trusted (only direct connection IP is used).
    /// Use ["*"] to trust all proxies (NOT recommended for production).
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// Maximum number of distinct clients to track before rejecting new ones (default: 100000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Interval in seconds between cleanup sweeps of stale entries (default: 60).
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Seconds a client entry may sit idle before cleanup evicts it (default: 1800).
    /// Should be at least the window length.
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_max_entries() -> u32 {
    100_000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_entry_ttl_secs() -> u64 {
    30 * 60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            strategy: RateLimitStrategy::default(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trusted_proxies: Vec::new(),
            max_entries: default_max_entries(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            entry_ttl_secs: default_entry_ttl_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Window length as a Duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Validate rate limit configuration for dangerous settings.
    /// Returns warnings for configs that are insecure but allowed,
    /// and errors for configs that are unsafe and should be rejected.
    pub fn validate(&self) -> std::result::Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        if self.max_requests == 0 {
            return Err("rate_limit.max_requests cannot be 0".to_string());
        }

        if self.window_secs == 0 {
            return Err("rate_limit.window_secs cannot be 0".to_string());
        }

        // Zero would make tokio::time::interval panic
        if self.cleanup_interval_secs == 0 {
            return Err("rate_limit.cleanup_interval_secs cannot be 0. \
                 Use a value >= 1 second."
                .to_string());
        }

        if self.trusted_proxies.len() == 1 && self.trusted_proxies[0] == "*" {
            warnings.push(
                "rate_limit.trusted_proxies=['*'] trusts ALL forwarded headers. \
                 This allows clients to spoof their IP address and bypass rate limits. \
                 Only use this setting in development or behind a trusted reverse proxy."
                    .to_string(),
            );
        }

        if self.entry_ttl_secs < self.window_secs {
            warnings.push(format!(
                "rate_limit.entry_ttl_secs={} is shorter than window_secs={}. \
                 Idle clients may be forgotten before their window resets.",
                self.entry_ttl_secs, self.window_secs
            ));
        }

        Ok(warnings)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Cache behavior.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Cache store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Upstream provider (required).
    pub upstream: UpstreamConfig,
    /// Rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Validate the whole configuration.
    ///
    /// Returns warnings for risky but legal settings.
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs cannot be 0".to_string()));
        }
        self.store.validate().map_err(Error::Config)?;
        self.upstream.validate().map_err(Error::Config)?;
        self.rate_limit.validate().map_err(Error::Config)
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the in-memory store and a placeholder upstream.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::memory(),
            upstream: UpstreamConfig {
                base_url: "http://127.0.0.1:9/v1/current.json".to_string(),
                api_key: "test-key".to_string(),
                provider: default_provider(),
                timeout_secs: None,
            },
            rate_limit: RateLimitConfig::default(),
        }
    }
}
