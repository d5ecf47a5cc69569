use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::json;
use std::net::TcpListener;
use stratus_core::config::UpstreamConfig;
use stratus_upstream::{FetchError, WeatherApiClient, WeatherSource};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn client_for(server: &MockServer, timeout_secs: Option<u64>) -> WeatherApiClient {
    WeatherApiClient::new(&UpstreamConfig {
        base_url: server.url("/v1/current.json"),
        api_key: "test-key".to_string(),
        provider: "weatherapi.com".to_string(),
        timeout_secs,
    })
    .unwrap()
}

fn paris_body() -> serde_json::Value {
    json!({
        "location": {"name": "Paris", "region": "Ile-de-France", "country": "France"},
        "current": {
            "temp_c": 18.0,
            "condition": {"text": "Clear", "code": 1000},
            "humidity": 55,
            "wind_kph": 10.0
        }
    })
}

#[tokio::test]
async fn test_fetch_sends_key_city_and_aqi() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/current.json")
                .query_param("key", "test-key")
                .query_param("q", "Paris")
                .query_param("aqi", "no");
            then.status(200).json_body(paris_body());
        })
        .await;

    let client = client_for(&server, Some(5));
    let record = client.fetch("Paris").await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.city, "Paris");
    assert_eq!(record.country, "France");
    assert_eq!(record.temperature, 18.0);
    assert_eq!(record.condition, "Clear");
    assert_eq!(record.humidity, 55.0);
    assert_eq!(record.wind_kph, 10.0);
    assert_eq!(record.source, "weatherapi.com");
    assert_eq!(client.provider_name(), "weatherapi.com");
}

#[tokio::test]
async fn test_fetch_passes_city_verbatim() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/current.json")
                .query_param("q", "New York");
            then.status(200).json_body(json!({
                "location": {"name": "New York", "country": "United States of America"},
                "current": {
                    "temp_c": 21.5,
                    "condition": {"text": "Partly cloudy"},
                    "humidity": 60,
                    "wind_kph": 14.4
                }
            }));
        })
        .await;

    let record = client_for(&server, None).fetch("New York").await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.city, "New York");
    assert_eq!(record.temperature, 21.5);
}

#[tokio::test]
async fn test_unknown_location_is_not_found() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/current.json");
            then.status(400).json_body(json!({
                "error": {"code": 1006, "message": "No matching location found."}
            }));
        })
        .await;

    let err = client_for(&server, None)
        .fetch("Nowhereland")
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err:?}");
    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("No matching location"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_provider_failure_is_not_not_found() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/current.json");
            then.status(401).body("API key is invalid");
        })
        .await;

    let err = client_for(&server, None).fetch("Paris").await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(err, FetchError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/current.json");
            then.status(200).json_body(json!({"location": {"name": "Paris"}}));
        })
        .await;

    let err = client_for(&server, None).fetch("Paris").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/current.json");
            then.status(200)
                .delay(std::time::Duration::from_secs(3))
                .json_body(paris_body());
        })
        .await;

    let err = client_for(&server, Some(1)).fetch("Paris").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "unexpected error: {err:?}");
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    // Nothing listens on the discard port.
    let client = WeatherApiClient::new(&UpstreamConfig {
        base_url: "http://127.0.0.1:9/v1/current.json".to_string(),
        api_key: "test-key".to_string(),
        provider: "weatherapi.com".to_string(),
        timeout_secs: Some(2),
    })
    .unwrap();

    let err = client.fetch("Paris").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_truncated_success_body_is_transport_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping socket tests: cannot bind to localhost");
        return;
    }

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises 500 bytes, sends a fragment, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                  Content-Length: 500\r\n\r\n{\"location\":{\"name\":",
            )
            .await;
        let _ = socket.shutdown().await;
    });

    let client = WeatherApiClient::new(&UpstreamConfig {
        base_url: format!("http://{addr}/v1/current.json"),
        api_key: "test-key".to_string(),
        provider: "weatherapi.com".to_string(),
        timeout_secs: Some(5),
    })
    .unwrap();

    let err = client.fetch("Paris").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "unexpected error: {err:?}");
}
