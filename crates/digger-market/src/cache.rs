//! In-process TTL cache consulted before any network access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Deterministic key for a listing request.
#[must_use]
pub fn cache_key(release_id: &str, max_offers: usize) -> String {
    format!("offers:{release_id}:{max_offers}")
}

/// One cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Key the value was stored under
    pub key: String,
    /// Cached value
    pub value: V,
    /// When the value was stored
    pub written_at: Instant,
    /// Lifetime from `written_at`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.written_at) >= self.ttl
    }
}

/// Key to value mapping with time-based expiry.
///
/// Entries are overwritten wholesale by [`set`](Self::set) and evicted
/// lazily when a read finds them expired.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Live value for `key`, evicting it if expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().expect("acquire cache lock");
        let expired = entries.get(key)?.is_expired(Instant::now());
        if expired {
            entries.remove(key);
            tracing::debug!("cache entry {} expired", key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` under `key`, replacing any previous entry and
    /// restarting its lifetime.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            written_at: Instant::now(),
            ttl: self.ttl,
        };
        self.entries
            .lock()
            .expect("acquire cache lock")
            .insert(key, entry);
    }

    /// Remove `key`; true if it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries
            .lock()
            .expect("acquire cache lock")
            .remove(key)
            .is_some()
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("acquire cache lock");
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("acquire cache lock").clear();
    }

    /// Entries held, expired ones included until evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("acquire cache lock").len()
    }

    /// True when no entry is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifetime given to new entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(cache_key("249504", 50), cache_key("249504", 50));
        assert_ne!(cache_key("249504", 50), cache_key("249504", 25));
    }

    #[test]
    fn test_set_then_get_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(3600));
        cache.set("a", vec![1, 2, 3]);
        assert_eq!(cache.get("a"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.set("a", "offers".to_string());
        std::thread::sleep(Duration::from_millis(25));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_overwrite_refreshes_entry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("a", 2);
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_and_invalidate() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());

        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
    }
}
