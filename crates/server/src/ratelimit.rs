//! Per-client rate limiting for the weather endpoint.
//!
//! Each client address may make `max_requests` requests per `window_secs`.
//! Two strategies are available:
//! - `fixed_window` (default): a counter per client that resets once the
//!   window has elapsed since the first request in it
//! - `sliding_log`: the admission times of each client; a request is admitted
//!   while fewer than `max_requests` of them fall inside the trailing window
//!
//! A fixed window never admits more than `max_requests` between resets; a
//! sliding log never admits more than `max_requests` in any trailing window.
//!
//! Every admitted or rejected response carries `RateLimit-Policy`,
//! `RateLimit-Limit`, `RateLimit-Remaining` and `RateLimit-Reset` headers.
//! Rejections also carry `Retry-After` and `X-RateLimit-Reason`, which tells an
//! over-quota client (`rate_limited`) apart from a limiter that is full
//! (`at_capacity`).
//!
//! # Memory Safety
//!
//! - Configurable maximum tracked clients (default: 100,000)
//! - Automatic eviction of idle clients based on TTL
//! - Background cleanup task that runs periodically
//!
//! # Security Note
//!
//! By default, X-Forwarded-For and X-Real-IP headers are NOT trusted to prevent
//! IP spoofing attacks. You must explicitly configure `trusted_proxies` to enable
//! header-based IP detection:
//!
//! - Empty list (default): Only direct connection IP is used (most secure)
//! - List of IPs/CIDRs: Headers trusted only when request comes from these IPs
//! - ["*"]: Trust headers from all sources (NOT recommended for production)

use crate::error::ErrorResponse;
use crate::metrics;
use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{DashMap, mapref::entry::Entry};
use ipnet::IpNet;
use std::{
    collections::VecDeque,
    net::{IpAddr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};
use stratus_core::config::{RateLimitConfig, RateLimitStrategy};

pub const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");
pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");
pub const RATELIMIT_REASON: HeaderName = HeaderName::from_static("x-ratelimit-reason");

/// Body returned with every 429.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<RateLimitStateInner>>,
}

/// Inner state that's only allocated when rate limiting is enabled.
struct RateLimitStateInner {
    /// Counting algorithm and its per-client state.
    limiter: Limiter,
    /// Limit and window advertised in response headers.
    policy: RateLimitPolicy,
    /// Last access timestamps per client (for capacity and eviction).
    last_access: DashMap<String, Instant>,
    /// Trusted proxy configuration.
    trusted_proxies: TrustedProxies,
    /// Maximum clients tracked before rejecting new ones.
    max_entries: u32,
    /// Idle time after which a client is evicted.
    entry_ttl: Duration,
    /// Whether ConnectInfo missing warning has been logged.
    connect_info_warned: AtomicBool,
    /// Whether at-capacity warning has been logged (prevents log spam during DoS).
    at_capacity_warned: AtomicBool,
}

enum Limiter {
    FixedWindow(DashMap<String, WindowCounter>),
    /// Admission times per client, oldest first. Never longer than the limit.
    SlidingLog(DashMap<String, VecDeque<Instant>>),
}

struct WindowCounter {
    started: Instant,
    count: u32,
}

/// Limit and window advertised to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window_secs: u64,
}

/// Quota state after an admitted request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub policy: RateLimitPolicy,
    pub remaining: u32,
    /// Seconds until the client regains quota.
    pub reset_secs: u64,
}

impl RateLimitInfo {
    /// Write the standard rate-limit headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        apply_policy_headers(headers, self.policy, self.remaining, self.reset_secs);
    }
}

fn apply_policy_headers(
    headers: &mut HeaderMap,
    policy: RateLimitPolicy,
    remaining: u32,
    reset_secs: u64,
) {
    if let Ok(value) =
        HeaderValue::from_str(&format!("{};w={}", policy.limit, policy.window_secs))
    {
        headers.insert(RATELIMIT_POLICY, value);
    }
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(policy.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs));
}

/// Whole seconds, rounding any fraction up.
fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

/// A parsed trusted proxy entry (either an IP or CIDR range).
#[derive(Clone, Debug)]
enum TrustedEntry {
    Ip(IpAddr),
    Cidr(IpNet),
}

/// Trusted proxy configuration for IP extraction.
#[derive(Clone, Debug)]
enum TrustedProxies {
    /// Never trust forwarded headers (default, most secure).
    None,
    /// Trust headers from all sources (dangerous, for development only).
    All,
    /// Trust headers only from specific IPs/CIDRs.
    List(Vec<TrustedEntry>),
}

impl TrustedProxies {
    fn from_config(proxies: &[String]) -> Self {
        if proxies.is_empty() {
            Self::None
        } else if proxies.len() == 1 && proxies[0] == "*" {
            Self::All
        } else {
            let entries: Vec<TrustedEntry> = proxies
                .iter()
                .filter_map(|p| {
                    if p.contains('/') {
                        match p.parse::<IpNet>() {
                            Ok(net) => Some(TrustedEntry::Cidr(net)),
                            Err(e) => {
                                tracing::warn!("Invalid CIDR in trusted_proxies: '{}': {}", p, e);
                                None
                            }
                        }
                    } else {
                        match p.parse::<IpAddr>() {
                            Ok(ip) => Some(TrustedEntry::Ip(ip)),
                            Err(e) => {
                                tracing::warn!("Invalid IP in trusted_proxies: '{}': {}", p, e);
                                None
                            }
                        }
                    }
                })
                .collect();
            Self::List(entries)
        }
    }

    /// Check if the given connection IP is a trusted proxy.
    fn is_trusted(&self, connection_ip: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::List(entries) => {
                let ip: IpAddr = match connection_ip.parse() {
                    Ok(ip) => ip,
                    Err(_) => return false,
                };
                entries.iter().any(|entry| match entry {
                    TrustedEntry::Ip(trusted) => *trusted == ip,
                    TrustedEntry::Cidr(network) => network.contains(&ip),
                })
            }
        }
    }
}

impl RateLimitState {
    /// Create a new rate limit state from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }

        let limit = config.max_requests.max(1);
        let window = config.window().max(Duration::from_secs(1));

        let limiter = match config.strategy {
            RateLimitStrategy::FixedWindow => Limiter::FixedWindow(DashMap::new()),
            RateLimitStrategy::SlidingLog => Limiter::SlidingLog(DashMap::new()),
        };

        Self {
            inner: Some(Arc::new(RateLimitStateInner {
                limiter,
                policy: RateLimitPolicy {
                    limit,
                    window_secs: window.as_secs(),
                },
                last_access: DashMap::new(),
                trusted_proxies: TrustedProxies::from_config(&config.trusted_proxies),
                max_entries: config.max_entries,
                entry_ttl: Duration::from_secs(config.entry_ttl_secs),
                connect_info_warned: AtomicBool::new(false),
                at_capacity_warned: AtomicBool::new(false),
            })),
        }
    }

    /// Check whether a request from `client` is allowed, and count it if so.
    pub fn check(&self, client: &str) -> Result<Option<RateLimitInfo>, RateLimitError> {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return Ok(None),
        };

        let now = Instant::now();
        let key = client.to_string();

        // Check capacity before acquiring entry lock to avoid deadlock.
        // DashMap's len() can deadlock if called while holding an entry lock.
        // Racy by at most the number of concurrent inserts.
        let current_len = inner.last_access.len();
        let at_capacity = current_len >= inner.max_entries as usize;

        match inner.last_access.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                if at_capacity {
                    Self::warn_at_capacity(&inner.at_capacity_warned, current_len, inner.max_entries);
                    return Err(RateLimitError {
                        policy: inner.policy,
                        retry_after_secs: 60,
                        reason: RateLimitReason::AtCapacity,
                    });
                }
                entry.insert(now);
            }
        }

        let policy = inner.policy;
        match &inner.limiter {
            Limiter::FixedWindow(counters) => {
                let window = Duration::from_secs(policy.window_secs);
                let mut counter = counters.entry(key).or_insert_with(|| WindowCounter {
                    started: now,
                    count: 0,
                });

                let mut elapsed = now.saturating_duration_since(counter.started);
                if elapsed >= window {
                    counter.started = now;
                    counter.count = 0;
                    elapsed = Duration::ZERO;
                }
                let reset_secs = ceil_secs(window - elapsed);

                if counter.count >= policy.limit {
                    return Err(RateLimitError {
                        policy,
                        retry_after_secs: reset_secs.max(1),
                        reason: RateLimitReason::RateLimited,
                    });
                }

                counter.count += 1;
                Ok(Some(RateLimitInfo {
                    policy,
                    remaining: policy.limit - counter.count,
                    reset_secs,
                }))
            }
            Limiter::SlidingLog(logs) => {
                let window = Duration::from_secs(policy.window_secs);
                let mut log = logs.entry(key).or_default();

                while log
                    .front()
                    .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= window)
                {
                    log.pop_front();
                }

                // Quota comes back when the oldest admission leaves the window
                let until_oldest_expires = |log: &VecDeque<Instant>| {
                    let oldest = log.front().copied().unwrap_or(now);
                    ceil_secs(window.saturating_sub(now.saturating_duration_since(oldest)))
                };

                if log.len() >= policy.limit as usize {
                    return Err(RateLimitError {
                        policy,
                        retry_after_secs: until_oldest_expires(&*log).max(1),
                        reason: RateLimitReason::RateLimited,
                    });
                }

                log.push_back(now);
                Ok(Some(RateLimitInfo {
                    policy,
                    remaining: policy.limit - log.len() as u32,
                    reset_secs: until_oldest_expires(&*log),
                }))
            }
        }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Clean up idle clients. Returns the number of clients evicted.
    ///
    /// Uses atomic `remove_if` so a client seen after the scan is kept.
    /// Counting state is dropped only once none of it still falls inside the
    /// window, so eviction never hands a client a fresh quota early.
    pub fn cleanup(&self) -> usize {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return 0,
        };

        let now = Instant::now();
        let ttl = inner.entry_ttl;

        let stale: Vec<String> = inner
            .last_access
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for key in stale {
            if inner
                .last_access
                .remove_if(&key, |_, last_access| now.duration_since(*last_access) > ttl)
                .is_some()
            {
                evicted += 1;
            }
        }

        let window = Duration::from_secs(inner.policy.window_secs);
        match &inner.limiter {
            Limiter::FixedWindow(counters) => {
                counters.retain(|_, counter| now.saturating_duration_since(counter.started) < window);
            }
            Limiter::SlidingLog(logs) => {
                logs.retain(|_, log| {
                    log.back()
                        .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
                });
            }
        }

        if evicted > 0 {
            // Reset at-capacity warning so it can fire again if we fill up
            inner.at_capacity_warned.store(false, Ordering::Relaxed);
            tracing::debug!(
                evicted = evicted,
                entries = inner.last_access.len(),
                "Rate limiter cleanup completed"
            );
        }

        evicted
    }

    /// Current number of tracked clients.
    pub fn entry_count(&self) -> usize {
        match &self.inner {
            Some(inner) => inner.last_access.len(),
            None => 0,
        }
    }

    /// Log a warning if ConnectInfo is not available (only once).
    fn warn_connect_info_missing(&self) {
        if let Some(inner) = &self.inner
            && !inner.connect_info_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                "ConnectInfo not available for rate limiting. All requests will share a single \
                     rate limit bucket ('unknown' IP). Serve with \
                     .into_make_service_with_connect_info::<SocketAddr>() to enable per-IP limits."
            );
        }
    }

    /// Log a warning when the limiter is at capacity (only once per capacity event).
    fn warn_at_capacity(warned_flag: &AtomicBool, current_entries: usize, max_entries: u32) {
        if !warned_flag.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                current_entries = current_entries,
                max_entries = max_entries,
                "Rate limiter at capacity, rejecting new clients. \
                 This warning is logged once per capacity event to prevent log spam."
            );
        }
    }
}

/// Reason for rate limit rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Request exceeded rate limit.
    RateLimited,
    /// Rate limiter at capacity, cannot track new clients.
    AtCapacity,
}

impl RateLimitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::AtCapacity => "at_capacity",
        }
    }
}

/// Error returned when rate limit is exceeded.
#[derive(Debug)]
pub struct RateLimitError {
    pub policy: RateLimitPolicy,
    /// Number of seconds to wait before retrying.
    pub retry_after_secs: u64,
    pub reason: RateLimitReason,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: RATE_LIMITED_MESSAGE.to_string(),
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        let headers = response.headers_mut();
        apply_policy_headers(headers, self.policy, 0, self.retry_after_secs);
        headers.insert(RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        headers.insert(
            RATELIMIT_REASON,
            HeaderValue::from_static(self.reason.as_str()),
        );
        response
    }
}

/// Extract client IP address from request headers (only if trusted).
fn extract_forwarded_ip(req: &Request<Body>) -> Option<String> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(s) = forwarded.to_str()
    {
        // First entry is the originating client
        if let Some(ip) = s.split(',').next() {
            return Some(ip.trim().to_string());
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(s) = real_ip.to_str()
    {
        return Some(s.trim().to_string());
    }

    None
}

/// Extract connection IP from request extensions (set by ConnectInfo).
fn extract_connection_ip(req: &Request<Body>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Extract client IP address from request.
///
/// # Security
///
/// Forwarded headers are only read when the connection comes from a trusted
/// proxy, or when all proxies are trusted ("*").
fn extract_ip(req: &Request<Body>, state: &RateLimitState) -> String {
    let inner = match &state.inner {
        Some(inner) => inner,
        None => return "unknown".to_string(),
    };

    let connection_ip = extract_connection_ip(req);

    let trust_headers = match (&connection_ip, &inner.trusted_proxies) {
        (None, TrustedProxies::All) => true,
        // Can't verify the proxy without a connection IP
        (None, _) => false,
        (Some(conn_ip), trusted_proxies) => trusted_proxies.is_trusted(conn_ip),
    };

    if trust_headers && let Some(forwarded_ip) = extract_forwarded_ip(req) {
        return forwarded_ip;
    }

    match connection_ip {
        Some(ip) => ip,
        None => {
            state.warn_connect_info_missing();
            "unknown".to_string()
        }
    }
}

/// Per-IP rate limiting middleware.
///
/// Runs before the handler, so a rejected request never touches the cache or
/// the upstream. Admitted responses get the rate-limit headers appended.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !rate_limit.is_enabled() {
        return next.run(req).await;
    }

    let ip = extract_ip(&req, &rate_limit);

    match rate_limit.check(&ip) {
        Ok(info) => {
            let mut response = next.run(req).await;
            if let Some(info) = info {
                info.apply_headers(response.headers_mut());
            }
            response
        }
        Err(e) => {
            metrics::RATE_LIMITED_REQUESTS
                .with_label_values(&[e.reason.as_str()])
                .inc();
            tracing::debug!(
                client = %ip,
                reason = e.reason.as_str(),
                retry_after_secs = e.retry_after_secs,
                "Request rate limited"
            );
            e.into_response()
        }
    }
}

/// Spawn a background task that periodically cleans up idle clients.
pub fn spawn_cleanup_task(
    state: RateLimitState,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = state.cleanup();
            if evicted > 0 {
                tracing::info!(
                    evicted = evicted,
                    entries = state.entry_count(),
                    "Rate limiter cleanup task evicted stale entries"
                );
            }
        }
    })
}
