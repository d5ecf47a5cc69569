//! Redis store backend.
//!
//! Uses a single [`ConnectionManager`], which multiplexes commands over one
//! connection and reconnects on its own after the server drops it. The handle
//! is cheap to clone, so each operation works on its own clone.

use crate::error::{StoreError, StoreResult};
use crate::traits::WeatherStore;
use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use async_trait::async_trait;
use std::time::Duration;

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the server at `url`, waiting at most `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = ::redis::Client::open(url).map_err(|e| {
            StoreError::Config(format!("invalid redis url '{}': {e}", redact_url(url)))
        })?;

        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                StoreError::Unavailable(format!(
                    "timed out after {}s connecting to {}",
                    timeout.as_secs(),
                    redact_url(url)
                ))
            })??;

        tracing::debug!(url = %redact_url(url), "Redis connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl WeatherStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let secs = expiry_secs(ttl)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, secs).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "unexpected PING reply: {pong}"
            )))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Whole seconds for `SET ... EX`, rounding sub-second TTLs up.
fn expiry_secs(ttl: Duration) -> StoreResult<u64> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidExpiry(
            "ttl must be greater than zero".to_string(),
        ));
    }
    let secs = ttl.as_secs();
    Ok(if ttl.subsec_nanos() > 0 { secs + 1 } else { secs })
}

/// Strip credentials from a connection URL before logging it.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
