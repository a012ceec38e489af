//! In-memory cache store
//!
//! `tokio::sync::RwLock` guards the map. Two identical requests in flight at
//! the same time may both miss and both write; last write wins.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{key_prefix, CacheStats, CacheStore, DEFAULT_TTL};

/// One cached response
#[derive(Debug, Clone)]
struct CacheEntry {
    key: String,
    data: serde_json::Value,
    /// Wall-clock write time, for reporting
    timestamp: DateTime<Utc>,
    inserted_at: Instant,
}

impl CacheEntry {
    fn new(key: &str, data: serde_json::Value) -> Self {
        Self {
            key: key.to_string(),
            data,
            timestamp: Utc::now(),
            inserted_at: Instant::now(),
        }
    }

    /// Fresh iff strictly less than `ttl` has passed since the write
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh(self.ttl) => return Some(entry.data.clone()),
                Some(_) => {}
            }
        }

        // Stale: re-check under the write lock, a writer may have refreshed it
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(self.ttl) {
                return Some(entry.data.clone());
            }
            entries.remove(key);
            debug!(key, "Evicted stale cache entry");
        }
        None
    }

    async fn put(&self, key: &str, data: serde_json::Value) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry::new(key, data));
    }

    async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        removed
    }

    async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let mut stats = CacheStats {
            total_entries: entries.len(),
            ..Default::default()
        };
        for entry in entries.values() {
            *stats
                .by_prefix
                .entry(key_prefix(&entry.key).to_string())
                .or_insert(0) += 1;
            if !entry.is_fresh(self.ttl) {
                stats.expired_entries += 1;
            }
        }
        stats.oldest_entry = entries.values().map(|e| e.timestamp).min();
        stats.newest_entry = entries.values().map(|e| e.timestamp).max();
        stats
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
