// In-memory TTL cache for computed listing payloads, using DashMap
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    stored_at: Instant,
    value: V,
}

/// Thread-safe result cache with a fixed time-to-live.
///
/// Expiry is checked lazily on lookup; there is no sweeper and no size cap.
/// Writes to the database do not evict anything, so a cached page can be up
/// to one TTL out of date.
pub struct ResultCache<V> {
    map: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, key: &str) -> Option<V> {
        self.lookup_at(key, Instant::now())
    }

    pub fn lookup_at(&self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.map.get(key) {
            Some(entry) if now.saturating_duration_since(entry.stored_at) < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.map.remove(key);
        }
        None
    }

    pub fn store(&self, key: String, value: V) {
        self.store_at(key, value, Instant::now());
    }

    pub fn store_at(&self, key: String, value: V, now: Instant) {
        self.map.insert(
            key,
            CacheEntry {
                stored_at: now,
                value,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
