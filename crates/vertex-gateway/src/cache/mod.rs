//! Response cache
//!
//! A time-bounded key/value store for idempotent request results. The store
//! is injected into the executor through the [`CacheStore`] trait so the host
//! decides its lifetime and tests can exercise it in isolation.
//!
//! Entries are evicted lazily: a lookup past the TTL removes the entry and
//! reports a miss. Nothing sweeps the map in the background.

mod keys;
mod memory;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use keys::{analysis_key, content_key, normalize_prompt, ANALYSIS_PREFIX, CONTENT_PREFIX};
pub use memory::MemoryCacheStore;

/// Fixed validity period for cached responses
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Diagnostic view of the cache contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    /// Entries still stored but already past the TTL
    pub expired_entries: usize,
    /// Count per key prefix (text before the first `:`)
    pub by_prefix: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_entry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Storage interface for cached responses
///
/// Implementations must be safe to share across tasks; the server runs on a
/// multi-threaded runtime.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fresh value for `key`, evicting it when stale
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Unconditional overwrite stamped with the current time
    async fn put(&self, key: &str, data: serde_json::Value);

    /// Remove everything, returning how many entries were dropped
    async fn clear(&self) -> usize;

    async fn stats(&self) -> CacheStats;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Prefix of a cache key, used to partition stats
pub fn key_prefix(key: &str) -> &str {
    key.split_once(':').map(|(prefix, _)| prefix).unwrap_or("other")
}
