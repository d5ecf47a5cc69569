//! Store doubles for counting and failure injection.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stratus_store::{MemoryStore, StoreError, StoreResult, WeatherStore};

/// In-memory store that counts every call.
#[allow(dead_code)]
#[derive(Default)]
pub struct InstrumentedStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

#[allow(dead_code)]
impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.gets() + self.sets()
    }

    /// Read a raw entry without counting it.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.ok().flatten()
    }
}

#[async_trait]
impl WeatherStore for InstrumentedStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set_with_expiry(key, value, ttl).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Store whose server is unreachable.
#[allow(dead_code)]
pub struct UnreachableStore;

#[async_trait]
impl WeatherStore for UnreachableStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn set_with_expiry(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
