use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A thread-safe response cache with a fresh window and a hard expiry.
///
/// Reads younger than `fresh_for` are served as-is. Between `fresh_for` and
/// `expires_after` the value is still served but flagged stale so the caller
/// can revalidate it in the background. Past `expires_after` the entry is
/// dropped.
pub struct ResponseCache<K, V> {
    data: DashMap<K, CacheEntry<V>>,
    fresh_for: Duration,
    expires_after: Duration,
    /// Held for write across bump + clear, for read across check + insert
    epoch: RwLock<u64>,
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Result of a cache read
#[derive(Debug, PartialEq)]
pub enum Lookup<V> {
    Fresh(V),
    Stale(V),
    Miss,
}

impl<K, V> ResponseCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new cache with the given fresh window and hard expiry
    pub fn new(fresh_for: Duration, expires_after: Duration) -> Self {
        Self {
            data: DashMap::new(),
            fresh_for,
            expires_after,
            epoch: RwLock::new(0),
        }
    }

    /// Read a value, classifying it by age
    pub fn get(&self, key: &K) -> Lookup<V> {
        let Some(entry) = self.data.get(key) else {
            return Lookup::Miss;
        };

        let age = entry.stored_at.elapsed();
        if age < self.fresh_for {
            Lookup::Fresh(entry.value.clone())
        } else if age < self.expires_after {
            Lookup::Stale(entry.value.clone())
        } else {
            drop(entry);
            // a concurrent insert may have replaced the expired entry
            self.data
                .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.expires_after);
            Lookup::Miss
        }
    }

    /// Insert a value into the cache
    pub fn insert(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        self.data.insert(key, entry);
    }

    /// Current invalidation epoch; pair with [`insert_if_current`](Self::insert_if_current)
    pub fn epoch(&self) -> u64 {
        *self.epoch.read()
    }

    /// Insert only if no `invalidate_all` happened since `epoch` was read
    pub fn insert_if_current(&self, epoch: u64, key: K, value: V) -> bool {
        let current = self.epoch.read();
        if *current != epoch {
            return false;
        }
        self.insert(key, value);
        true
    }

    /// Drop every entry; returns how many were removed
    pub fn invalidate_all(&self) -> usize {
        let mut epoch = self.epoch.write();
        *epoch += 1;
        let removed = self.data.len();
        self.data.clear();
        removed
    }

    /// Remove expired entries from the cache
    pub fn cleanup(&self) {
        let expires_after = self.expires_after;
        self.data
            .retain(|_, entry| entry.stored_at.elapsed() < expires_after);
    }

    /// Get the number of entries in the cache (including expired ones)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the cache is empty
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn expires_after(&self) -> Duration {
        self.expires_after
    }
}

/// Normalize a search string for cache key
/// Converts to lowercase and trims whitespace
pub fn normalize_cache_key(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Start a background task that drops expired entries once per expiry window
pub fn start_cache_cleanup_task<K, V>(cache: Arc<ResponseCache<K, V>>, label: &'static str)
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let period = cache.expires_after().max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let before = cache.len();
            cache.cleanup();
            let after = cache.len();
            if before != after {
                tracing::debug!(
                    cache = label,
                    removed = before - after,
                    remaining = after,
                    "Response cache cleanup completed"
                );
            }
        }
    });
}
