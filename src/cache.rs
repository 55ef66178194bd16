//! TTL memoization for expensive aggregation results
//!
//! Entries are keyed by `(Operation, CacheParams)` and expire lazily: a
//! lookup is a hit iff `now - stored_at < ttl` for that operation. Nothing
//! refreshes in the background and nothing is evicted, since the key space
//! is bounded by the fixed operation set and a small parameter grid.
//! `purge_expired()` is available to hosts that want to reclaim memory.
//!
//! Concurrent misses on the same key may each run `compute`; the last write
//! wins. The lock is never held across the computation.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Cached operations, each with its own TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TopEdited,
    TopEditors,
    TopTalkPages,
    NewArticles,
    TopViewed,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::TopEdited => "top_edited",
            Operation::TopEditors => "top_editors",
            Operation::TopTalkPages => "top_talk_pages",
            Operation::NewArticles => "new_articles",
            Operation::TopViewed => "top_viewed",
        }
    }
}

/// TTL configuration table
#[derive(Debug, Clone, PartialEq)]
pub struct TtlTable {
    ttls: HashMap<Operation, Duration>,
    fallback: Duration,
}

impl TtlTable {
    pub fn new(fallback: Duration) -> Self {
        Self {
            ttls: HashMap::new(),
            fallback,
        }
    }

    pub fn with(mut self, operation: Operation, ttl: Duration) -> Self {
        self.ttls.insert(operation, ttl);
        self
    }

    pub fn ttl_for(&self, operation: Operation) -> Duration {
        self.ttls.get(&operation).copied().unwrap_or(self.fallback)
    }
}

impl Default for TtlTable {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
            .with(Operation::NewArticles, Duration::from_secs(60))
            .with(Operation::TopViewed, Duration::from_secs(900))
    }
}

/// Normalized keyword parameters of one call
///
/// Backed by an ordered map, so insertion order never affects the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CacheParams(BTreeMap<&'static str, String>);

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.0.insert(name, value.to_string());
        self
    }

    pub fn with_opt(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at_ms: i64,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct TtlCache {
    entries: RwLock<HashMap<(Operation, CacheParams), CacheEntry>>,
    ttls: TtlTable,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Clock in Unix milliseconds (injectable for tests)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl TtlCache {
    /// Create a cache using the system clock
    pub fn new(ttls: TtlTable) -> Self {
        Self::new_with_timestamp_fn(ttls, Box::new(|| chrono::Utc::now().timestamp_millis()))
    }

    /// Create a cache with a custom clock returning Unix milliseconds
    pub fn new_with_timestamp_fn(ttls: TtlTable, now_fn: Box<dyn Fn() -> i64 + Send + Sync>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttls,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            now_fn,
        }
    }

    pub fn ttls(&self) -> &TtlTable {
        &self.ttls
    }

    fn is_fresh(&self, operation: Operation, entry: &CacheEntry, now_ms: i64) -> bool {
        let ttl_ms = self.ttls.ttl_for(operation).as_millis() as i64;
        now_ms - entry.stored_at_ms < ttl_ms
    }

    fn lookup<V: Send + Sync + 'static>(&self, key: &(Operation, CacheParams)) -> Option<Arc<V>> {
        let now_ms = (self.now_fn)();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if !self.is_fresh(key.0, entry, now_ms) {
            return None;
        }
        entry.value.clone().downcast::<V>().ok()
    }

    /// Return the cached result for `(operation, params)` or compute and store it
    pub async fn memoize<V, F, Fut>(&self, operation: Operation, params: CacheParams, compute: F) -> Arc<V>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let key = (operation, params);
        if let Some(value) = self.lookup::<V>(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache hit: {} {:?}", operation.as_str(), key.1);
            return value;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("cache miss: {} {:?}", operation.as_str(), key.1);

        let value = Arc::new(compute().await);
        let entry = CacheEntry {
            value: value.clone(),
            stored_at_ms: (self.now_fn)(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
        value
    }

    /// Drop every entry whose TTL has elapsed; returns the number removed
    pub fn purge_expired(&self) -> usize {
        let now_ms = (self.now_fn)();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|(operation, _), entry| self.is_fresh(*operation, entry, now_ms));
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize};

    fn cache_with_clock() -> (TtlCache, Arc<AtomicI64>) {
        let clock = Arc::new(AtomicI64::new(1_000_000));
        let handle = clock.clone();
        let cache = TtlCache::new_with_timestamp_fn(
            TtlTable::default(),
            Box::new(move || handle.load(Ordering::SeqCst)),
        );
        (cache, clock)
    }

    #[tokio::test]
    async fn test_hit_within_ttl_skips_compute() {
        let (cache, clock) = cache_with_clock();
        let computed = AtomicUsize::new(0);
        let params = CacheParams::new().with("limit", 25).with("period", "24h");

        let first = cache
            .memoize(Operation::TopEdited, params.clone(), || async {
                computed.fetch_add(1, Ordering::SeqCst);
                vec!["A".to_string()]
            })
            .await;

        clock.fetch_add(299_000, Ordering::SeqCst);
        let second = cache
            .memoize(Operation::TopEdited, params, || async {
                computed.fetch_add(1, Ordering::SeqCst);
                vec!["B".to_string()]
            })
            .await;

        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_recompute() {
        let (cache, clock) = cache_with_clock();
        let params = CacheParams::new().with("limit", 25);

        let first = cache
            .memoize(Operation::NewArticles, params.clone(), || async { 1u32 })
            .await;

        // NewArticles TTL is 60s; an entry exactly ttl old is already stale
        clock.fetch_add(60_000, Ordering::SeqCst);
        let second = cache
            .memoize(Operation::NewArticles, params, || async { 2u32 })
            .await;

        assert_eq!(*first, 1);
        assert_eq!(*second, 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_reordered_params_share_entry() {
        let (cache, _clock) = cache_with_clock();

        let a = CacheParams::new()
            .with("limit", 25)
            .with("period", "7d")
            .with("anon_only", false);
        let b = CacheParams::new()
            .with("anon_only", false)
            .with("period", "7d")
            .with("limit", 25);

        let first = cache.memoize(Operation::TopEditors, a, || async { 7u64 }).await;
        let second = cache.memoize(Operation::TopEditors, b, || async { 8u64 }).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn test_operations_are_isolated() {
        let (cache, _clock) = cache_with_clock();
        let params = CacheParams::new().with("limit", 10);

        let edited = cache.memoize(Operation::TopEdited, params.clone(), || async { 1u8 }).await;
        let talk = cache.memoize(Operation::TopTalkPages, params, || async { 2u8 }).await;

        assert_eq!((*edited, *talk), (1, 2));
    }

    #[tokio::test]
    async fn test_per_operation_ttl_and_purge() {
        let (cache, clock) = cache_with_clock();
        let params = CacheParams::new();

        cache.memoize(Operation::NewArticles, params.clone(), || async { 0u8 }).await;
        cache.memoize(Operation::TopViewed, params, || async { 0u8 }).await;

        // Past the 60s new-articles TTL, inside the 900s top-viewed TTL
        clock.fetch_add(120_000, Ordering::SeqCst);

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_memoize_keeps_entries_consistent() {
        let (cache, _clock) = cache_with_clock();
        let cache = Arc::new(cache);
        let calls_per_key = 50u64;
        let keys = 4u64;

        let tasks = (0..calls_per_key * keys).map(|i| {
            let cache = cache.clone();
            let key = i % keys;
            tokio::spawn(async move {
                let params = CacheParams::new().with("limit", key);
                let value = cache
                    .memoize(Operation::TopEditors, params, move || async move {
                        tokio::task::yield_now().await;
                        key * 10
                    })
                    .await;
                (key, *value)
            })
        });
        let results = futures::future::join_all(tasks).await;

        for result in results {
            let (key, value) = result.unwrap();
            assert_eq!(value, key * 10);
        }

        let stats = cache.stats();
        assert_eq!(stats.entries, keys as usize);
        assert_eq!(stats.hits + stats.misses, calls_per_key * keys);
        // Every key missed at least once; duplicate concurrent misses are allowed
        assert!(stats.misses >= keys);

        // Stored values survive the race: a later lookup hits and never recomputes
        for key in 0..keys {
            let params = CacheParams::new().with("limit", key);
            let value = cache
                .memoize(Operation::TopEditors, params, || async { u64::MAX })
                .await;
            assert_eq!(*value, key * 10);
        }
        assert_eq!(cache.stats().entries, keys as usize);
    }

    #[test]
    fn test_with_opt_skips_missing_values() {
        let with_none = CacheParams::new().with("limit", 5).with_opt("user", None);
        let bare = CacheParams::new().with("limit", 5);
        assert_eq!(with_none, bare);
        assert_ne!(bare, CacheParams::new().with("limit", 5).with_opt("user", Some("x")));
    }
}
