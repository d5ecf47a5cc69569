//! weatherapi.com current-conditions client.

use crate::error::{FetchError, FetchResult};
use crate::response::CurrentResponse;
use crate::WeatherSource;
use async_trait::async_trait;
use reqwest::Url;
use stratus_core::WeatherRecord;
use stratus_core::config::UpstreamConfig;

/// Client for a weatherapi.com-compatible `current.json` endpoint.
#[derive(Clone)]
pub struct WeatherApiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    provider: String,
}

impl std::fmt::Debug for WeatherApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl WeatherApiClient {
    pub fn new(config: &UpstreamConfig) -> FetchResult<Self> {
        config.validate().map_err(FetchError::Config)?;

        let endpoint = Url::parse(config.base_url.trim())
            .map_err(|e| FetchError::Config(format!("invalid upstream.base_url: {e}")))?;

        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            provider: config.provider.clone(),
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn fetch(&self, city: &str) -> FetchResult<WeatherRecord> {
        tracing::debug!(endpoint = %self.endpoint, city, "Fetching current weather");

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let parsed: CurrentResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(parsed.into_record(&self.provider))
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}
