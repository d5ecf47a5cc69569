//! In-process store backend.
//!
//! Entries live in a [`DashMap`] and expire lazily: an expired entry is
//! removed the next time its key is read, or by [`MemoryStore::purge_expired`],
//! which [`spawn_purge_task`] runs periodically so keys that are never read
//! again are still reclaimed.
//! Nothing is shared between processes, so this backend suits development and
//! tests rather than multi-instance deployments.

use crate::error::{StoreError, StoreResult};
use crate::traits::WeatherStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory store with per-entry expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

/// Spawn a background task that purges expired entries every `interval`.
///
/// The task holds only a weak reference and exits once the store is dropped.
pub fn spawn_purge_task(store: &Arc<MemoryStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    let store: Weak<MemoryStore> = Arc::downgrade(store);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                tracing::debug!("Memory store dropped, stopping purge task");
                break;
            };
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = store.len(), "Purged expired cache entries");
            }
        }
    })
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key)
            && entry.expires_at > now
        {
            return Ok(Some(entry.value.clone()));
        }

        // Only remove if still expired; a concurrent write may have replaced it.
        self.entries
            .remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidExpiry(format!(
                "ttl for '{key}' must be greater than zero"
            )));
        }

        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            StoreError::InvalidExpiry(format!("ttl {}s is out of range", ttl.as_secs()))
        })?;

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
