use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

/// Cached embeddings live for 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CacheEntry {
    vector: Arc<[f32]>,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// Embedding vectors keyed by normalized source text, expired by age only.
///
/// Expired entries are purged lazily by `get` or in bulk by `sweep`. Both
/// re-check expiry under the shard lock before removing, so a concurrent
/// `set` of the same key is never dropped.
pub struct VectorCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl VectorCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Arc<[f32]>> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(self.ttl, now) => {
                return Some(Arc::clone(&entry.vector))
            }
            Some(_) => {}
        }

        let ttl = self.ttl;
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(ttl, Instant::now()))
            .is_some()
        {
            debug!("Evicted expired embedding for key of {} chars", key.len());
        }
        None
    }

    pub fn set(&self, key: String, vector: Arc<[f32]>) {
        self.entries.insert(
            key,
            CacheEntry {
                vector,
                created_at: Instant::now(),
            },
        );
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(ttl, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!("Swept {removed} expired embeddings");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for VectorCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
