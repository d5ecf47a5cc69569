//! Store trait definition.

use crate::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with per-entry expiry.
///
/// Values are opaque strings; the cache gateway decides what goes in them.
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Get the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    /// The entry expires `ttl` after this write.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
