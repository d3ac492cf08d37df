//! Content cache keyed by fetch hash.
//!
//! # Responsibilities
//! - Serve repeated GET fetches without hitting the upstream
//! - Drop entries that took part in a failed composition
//!
//! # Design Decisions
//! - Only composable contents are cached; streams cannot be replayed
//! - Entries expire after a fixed TTL, checked lazily on read
//! - When full, the oldest entry is evicted

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::composition::content::{ContentParts, MemoryContent};
use crate::observability::metrics;

/// Purge contract used by the composition handler.
pub trait Cache: Send + Sync {
    /// Remove every entry stored under one of `hashes`.
    fn purge_entries(&self, hashes: &[String]);
}

#[derive(Debug)]
struct CacheEntry {
    content: ContentParts,
    stored_at: Instant,
}

/// Thread-safe in-memory content cache.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Fresh copy of the content stored under `hash`, if not expired.
    pub fn get(&self, hash: &str) -> Option<MemoryContent> {
        {
            let entry = self.inner.get(hash)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(MemoryContent::from(entry.content.clone()));
            }
        }
        self.inner.remove(hash);
        None
    }

    /// Store a copy of `content`. Stream contents are ignored.
    pub fn set(&self, hash: impl Into<String>, content: &MemoryContent) {
        let Some(content) = content.snapshot() else {
            return;
        };
        let hash = hash.into();
        if self.max_entries == 0 {
            return;
        }
        if self.inner.len() >= self.max_entries && !self.inner.contains_key(&hash) {
            self.evict_oldest();
        }
        self.inner.insert(
            hash,
            CacheEntry {
                content,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .inner
            .iter()
            .min_by_key(|e| e.value().stored_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.inner.remove(&key);
        }
    }
}

impl Cache for MemoryCache {
    fn purge_entries(&self, hashes: &[String]) {
        let mut purged = 0;
        for hash in hashes {
            if self.inner.remove(hash).is_some() {
                purged += 1;
            }
        }
        metrics::record_cache_purge(purged);
        tracing::info!(requested = hashes.len(), purged, "Purged cache entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::content::Content;
    use crate::composition::fragment::StringFragment;
    use axum::body::Body;

    fn content(name: &str) -> MemoryContent {
        MemoryContent::new(name).with_body("", StringFragment::new(name).into_ref())
    }

    #[test]
    fn test_set_get_and_purge() {
        let cache = MemoryCache::new(Duration::from_secs(60), 10);
        cache.set("a", &content("a"));
        cache.set("b", &content("b"));

        assert_eq!(cache.get("a").map(|c| c.name().to_string()), Some("a".into()));
        assert_eq!(cache.len(), 2);

        cache.purge_entries(&["a".to_string(), "missing".to_string()]);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_streams_are_not_cached() {
        let cache = MemoryCache::new(Duration::from_secs(60), 10);
        cache.set("s", &MemoryContent::new("s").with_stream(Body::from("raw")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = MemoryCache::new(Duration::ZERO, 10);
        cache.set("a", &content("a"));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_entry_is_evicted_when_full() {
        let cache = MemoryCache::new(Duration::from_secs(60), 2);
        cache.set("a", &content("a"));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", &content("b"));
        cache.set("c", &content("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }
}
