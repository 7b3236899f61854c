//! Typed access to strategies and link states in the shared cache

use crate::state::{ExtractionStrategy, LinkCrawlState};
use crate::storage::{CacheStore, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Cache key prefix for per-hostname extraction strategies
pub const STRATEGY_PREFIX: &str = "strategy:";

/// Cache key prefix for per-URL link states
pub const LINK_PREFIX: &str = "link:";

/// Cache key of the strategy for a hostname
pub fn strategy_key(hostname: &str) -> String {
    format!("{}{}", STRATEGY_PREFIX, hostname)
}

/// Cache key of the crawl state for a link URL
pub fn link_key(url: &str) -> String {
    format!("{}{}", LINK_PREFIX, url)
}

/// Strategy and link state store on top of a `CacheStore`
///
/// Every entry is written with the same TTL so stale strategies age out.
#[derive(Clone)]
pub struct StateCache {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl StateCache {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Gets the cached strategy of a hostname
    pub async fn strategy(&self, hostname: &str) -> StorageResult<Option<ExtractionStrategy>> {
        self.get_json(&strategy_key(hostname)).await
    }

    /// Stores the strategy of a hostname
    pub async fn save_strategy(
        &self,
        hostname: &str,
        strategy: &ExtractionStrategy,
    ) -> StorageResult<()> {
        self.set_json(&strategy_key(hostname), strategy).await
    }

    /// Drops the strategy of a hostname so its next page runs the full pipeline
    ///
    /// Returns false if no strategy was cached.
    pub async fn forget_strategy(&self, hostname: &str) -> StorageResult<bool> {
        self.cache.delete(&strategy_key(hostname)).await
    }

    /// Gets the cached crawl state of a link
    pub async fn link_state(&self, url: &str) -> StorageResult<Option<LinkCrawlState>> {
        self.get_json(&link_key(url)).await
    }

    /// Stores the crawl state of a link
    pub async fn save_link_state(&self, url: &str, state: &LinkCrawlState) -> StorageResult<()> {
        self.set_json(&link_key(url), state).await
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.cache.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.cache.set(key, &raw, Some(self.ttl)).await
    }
}
