//! Cache store abstraction and backends for stratus.
//!
//! This crate provides:
//! - The [`WeatherStore`] trait: get-by-key and set-with-expiry over string values
//! - Backends: Redis (shared, production) and in-memory (single process)

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::memory::{MemoryStore, spawn_purge_task};
pub use backends::redis::RedisStore;
pub use error::{StoreError, StoreResult};
pub use traits::WeatherStore;

use std::sync::Arc;
use stratus_core::config::{StoreBackend, StoreConfig};

/// Create a store from configuration.
///
/// For the redis backend this connects before returning, so an unreachable
/// server surfaces here rather than on the first request.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn WeatherStore>> {
    config.validate().map_err(StoreError::Config)?;

    match config.backend {
        StoreBackend::Memory => Ok(memory_store(config)),
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.url, config.connect_timeout()).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Memory store with its expired-entry sweep running.
fn memory_store(config: &StoreConfig) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    spawn_purge_task(&store, config.purge_interval());
    tracing::debug!(
        interval_secs = config.purge_interval_secs,
        "Memory store purge task spawned"
    );
    store
}
