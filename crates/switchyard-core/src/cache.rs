//! Response cache
//!
//! Identical requests within the TTL are served from memory instead of
//! spending provider tokens. The policy is read live from `ApiPriority` on
//! every lookup, so disabling the cache or shortening the TTL applies
//! immediately; stale entries simply stop being returned and age out of the
//! LRU.

use crate::config::ApiPriority;
use crate::dispatch::ProviderId;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default cache capacity in entries
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// One cached completion
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// The completion text
    pub text: String,
    /// Provider that originally served it
    pub provider: ProviderId,
    /// Model that originally served it
    pub model: String,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that fell through to dispatch
    pub misses: u64,
}

/// LRU response cache keyed by module and normalized request text
pub struct ResponseCache {
    entries: Mutex<LruCache<u64, CachedResponse>>,
    priority: ApiPriority,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache with the given capacity, honoring the shared policy
    pub fn new(capacity: usize, priority: ApiPriority) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            priority,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a fresh entry for a request
    ///
    /// Returns `None` when caching is disabled, the entry is absent, or it
    /// has outlived the current TTL. Expired entries are evicted on sight.
    pub fn get(&self, module: Option<&str>, text: &str) -> Option<CachedResponse> {
        if !self.priority.should_cache() {
            return None;
        }
        let key = cache_key(module, text);
        let ttl = self.priority.cache_ttl();
        let mut entries = self.entries.lock();

        match entries.get(&key) {
            Some(entry) => {
                let age = Utc::now().signed_duration_since(entry.created_at);
                if age.num_milliseconds().max(0) as u128 > ttl.as_millis() {
                    entries.pop(&key);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    None
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Some(entry.clone())
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a completion for a request
    pub fn put(&self, module: Option<&str>, text: &str, response: CachedResponse) {
        if !self.priority.should_cache() {
            return;
        }
        let key = cache_key(module, text);
        self.entries.lock().put(key, response);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Entries currently held
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Hit/miss counters since construction
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn cache_key(module: Option<&str>, text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    module.unwrap_or("").hash(&mut hasher);
    text.trim().to_lowercase().hash(&mut hasher);
    hasher.finish()
}
