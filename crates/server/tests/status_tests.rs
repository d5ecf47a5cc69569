//! Integration tests for health and metrics endpoints.

mod common;

use axum::http::StatusCode;
use common::{PROVIDER_PATH, TestServer, UnreachableStore, can_bind_localhost, paris_body};
use httpmock::Method::GET;
use serde_json::json;
use std::sync::Arc;

macro_rules! require_localhost {
    () => {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
    };
}

#[tokio::test]
async fn test_health_ok() {
    require_localhost!();
    let server = TestServer::new().await;

    let response = server.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"status": "ok", "store": "memory"}));
}

#[tokio::test]
async fn test_health_reports_unreachable_store() {
    require_localhost!();
    let server = TestServer::with_store(Arc::new(UnreachableStore), |_| {}).await;

    let response = server.get("/health").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json()["status"], "unavailable");
    assert_eq!(response.json()["store"], "redis");
    assert!(!response.body.contains("connection refused"));
}

#[tokio::test]
async fn test_metrics_exposed_when_enabled() {
    require_localhost!();
    let server = TestServer::new().await;
    server
        .upstream
        .mock_async(|when, then| {
            when.method(GET).path(PROVIDER_PATH);
            then.status(200).json_body(paris_body());
        })
        .await;

    server.get("/weather?city=Paris").await;
    server.get("/weather?city=Paris").await;

    let response = server.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response.headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert!(response.body.contains("stratus_cache_lookups_total"));
    assert!(response.body.contains("stratus_upstream_requests_total"));
}

#[tokio::test]
async fn test_metrics_absent_when_disabled() {
    require_localhost!();
    let server = TestServer::with_config(|config| {
        config.server.metrics_enabled = false;
    })
    .await;

    let response = server.get("/metrics").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    require_localhost!();
    let server = TestServer::new().await;

    let response = server.get("/forecast?city=Paris").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
