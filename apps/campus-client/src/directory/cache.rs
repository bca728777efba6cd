//! Time-boxed cache of resolved query results.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Default lifetime of a cached result (5 minutes).
pub const CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Results keyed by an exact query key, usable for `ttl` after they were fetched.
///
/// Expired entries are evicted lazily when their key is next looked up;
/// nothing sweeps the map in the background.
pub struct QueryCache<V> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, evicting it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some(entry) => entry.fetched_at.elapsed() < self.ttl,
            None => return None,
        };
        if fresh {
            self.entries.get(key).map(|entry| entry.value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new(CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut cache = QueryCache::new(Duration::from_secs(300));
        cache.insert("k", vec![1, 2]);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k"), Some(vec![1, 2]));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
        // Lazily evicted on that lookup.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_linger_until_looked_up() {
        let mut cache = QueryCache::new(Duration::from_secs(10));
        cache.insert("a", 1);
        cache.insert("b", 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_refreshes_timestamp() {
        let mut cache = QueryCache::new(Duration::from_secs(10));
        cache.insert("k", "old");
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert("k", "new");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get("k"), Some("new"));
    }

    #[test]
    fn keys_match_exactly() {
        let mut cache = QueryCache::default();
        cache.insert("ana", 1);
        assert_eq!(cache.get("an"), None);
        assert_eq!(cache.get("ana"), Some(1));
        assert_eq!(cache.ttl(), CACHE_TTL);
    }
}
