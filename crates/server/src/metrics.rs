//! Prometheus metrics for the stratus server.
//!
//! Exposes cache effectiveness, store failures, upstream latency and
//! rate-limit rejections.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no city names or client addresses, only aggregate counts.
//! Restrict the endpoint at the network level, or disable it with
//! `server.metrics_enabled = false`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Cache metrics
pub static CACHE_LOOKUPS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stratus_cache_lookups_total",
            "Cache lookups by result (hit, miss, corrupt)",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static STORE_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stratus_store_errors_total",
            "Cache store failures by operation",
        ),
        &["operation"],
    )
    .expect("metric creation failed")
});

// Upstream metrics
pub static UPSTREAM_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stratus_upstream_requests_total",
            "Upstream provider requests by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static UPSTREAM_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "stratus_upstream_request_duration_seconds",
            "Time taken by upstream provider requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("metric creation failed")
});

// Rate limiting
pub static RATE_LIMITED_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stratus_rate_limited_requests_total",
            "Requests rejected by the rate limiter, by reason",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(CACHE_LOOKUPS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(STORE_ERRORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPSTREAM_REQUESTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPSTREAM_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RATE_LIMITED_REQUESTS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a cache lookup result.
pub fn record_cache_lookup(result: &str) {
    CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// Record a store failure for `operation` ("get" or "set").
pub fn record_store_error(operation: &str) {
    STORE_ERRORS.with_label_values(&[operation]).inc();
}
