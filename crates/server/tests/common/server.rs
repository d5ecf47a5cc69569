//! Server test utilities.

use super::fixtures::PROVIDER_PATH;
use super::store::InstrumentedStore;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use httpmock::MockServer;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use stratus_core::config::AppConfig;
use stratus_server::{AppState, create_router};
use stratus_store::WeatherStore;
use stratus_upstream::WeatherApiClient;
use tower::ServiceExt;

/// Client address used when a test does not pick one.
#[allow(dead_code)]
pub const DEFAULT_CLIENT: ([u8; 4], u16) = ([127, 0, 0, 1], 50_000);

/// A response captured for assertions.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// A test server wired to a mock provider and an instrumented store.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<InstrumentedStore>,
    pub upstream: MockServer,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server with rate limiting disabled.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    /// Rate limiting starts disabled; enable it in `modifier` when needed.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let store = Arc::new(InstrumentedStore::new());
        let (router, state, upstream) = Self::build(store.clone(), modifier).await;
        Self {
            router,
            state,
            store,
            upstream,
        }
    }

    /// Create a test server over a caller-supplied store.
    /// `self.store` is a fresh, unused instance in that case.
    pub async fn with_store<F>(store: Arc<dyn WeatherStore>, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let (router, state, upstream) = Self::build(store, modifier).await;
        Self {
            router,
            state,
            store: Arc::new(InstrumentedStore::new()),
            upstream,
        }
    }

    async fn build<F>(
        store: Arc<dyn WeatherStore>,
        modifier: F,
    ) -> (axum::Router, AppState, MockServer)
    where
        F: FnOnce(&mut AppConfig),
    {
        stratus_server::metrics::register_metrics();

        let upstream = MockServer::start_async().await;

        let mut config = AppConfig::for_testing();
        config.upstream.base_url = upstream.url(PROVIDER_PATH);
        config.upstream.timeout_secs = Some(5);
        config.rate_limit.enabled = false;
        modifier(&mut config);

        let source = Arc::new(
            WeatherApiClient::new(&config.upstream).expect("Failed to create upstream client"),
        );
        let state = AppState::new(config, store, source).expect("Invalid test configuration");
        let router = create_router(state.clone());

        (router, state, upstream)
    }

    /// GET `uri` from the default client address.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.get_from(uri, SocketAddr::from(DEFAULT_CLIENT), &[])
            .await
    }

    /// GET `uri` as if connected from `client`, with extra headers.
    pub async fn get_from(
        &self,
        uri: &str,
        client: SocketAddr,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let mut request = builder.body(Body::empty()).unwrap();
        request.extensions_mut().insert(ConnectInfo(client));

        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
        }
    }
}
