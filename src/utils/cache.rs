use crate::error::ScanError;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cached data with the time it was stored
#[derive(Clone, Debug)]
pub struct CacheItem<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl<T> CacheItem<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self { data, timestamp: Instant::now(), ttl }
    }

    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub stale_served: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

/// Time-to-live cache for whole aggregation results.
///
/// Expired entries are kept until [`cleanup_expired`](Self::cleanup_expired)
/// so a failed refresh can fall back to the last good value.
#[derive(Debug)]
pub struct DelegatorCache {
    entries: DashMap<String, CacheItem<Vec<String>>>,
    pub stats: CacheStats,
    default_ttl: Duration,
}

impl DelegatorCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self { entries: DashMap::new(), stats: CacheStats::default(), default_ttl }
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        match self.entries.get(key) {
            Some(item) if !item.is_expired() => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(item.data.clone())
            }
            _ => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Last stored value for `key`, expired or not
    pub fn get_stale(&self, key: &str) -> Option<Vec<String>> {
        self.entries.get(key).map(|item| item.data.clone())
    }

    pub fn set(&self, key: &str, data: Vec<String>) {
        self.entries.insert(key.to_string(), CacheItem::new(data, self.default_ttl));
    }

    /// Return the cached value while fresh, otherwise run `refresh`.
    /// When the refresh fails and an older value exists, that value is served instead.
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, refresh: F) -> Result<Vec<String>, ScanError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, ScanError>>,
    {
        if let Some(data) = self.get(key) {
            debug!("Cache hit for {}", key);
            return Ok(data);
        }

        match refresh().await {
            Ok(data) => {
                self.set(key, data.clone());
                Ok(data)
            }
            Err(e) => match self.get_stale(key) {
                Some(stale) => {
                    warn!("Refresh of {} failed, serving stale value: {}", key, e);
                    self.stats.stale_served.fetch_add(1, Ordering::Relaxed);
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every expired entry
    pub fn cleanup_expired(&self) {
        self.entries.retain(|_, item| {
            let expired = item.is_expired();
            if expired {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            !expired
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
