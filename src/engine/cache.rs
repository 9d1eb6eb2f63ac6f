// Name -> remote identifier cache with a fixed time-to-live, expired lazily on read.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub remote_id: String,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

pub struct LookupCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl LookupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached identifier for `name` if its entry is still fresh.
    ///
    /// `None` only means "ask the remote store"; it is not an error. A stale
    /// entry found here is evicted.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(name) {
                Some(entry) if entry.is_fresh(now, self.ttl) => {
                    debug!("cache hit name={} id={}", name, entry.remote_id);
                    return Some(entry.remote_id.clone());
                }
                Some(_) => {}
                None => {
                    debug!("cache miss name={}", name);
                    return None;
                }
            }
        }

        // Re-check under the write lock: another request may have refreshed it.
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(name) {
            if entry.is_fresh(now, self.ttl) {
                return Some(entry.remote_id.clone());
            }
            debug!("cache entry expired name={}", name);
            entries.remove(name);
        }
        None
    }

    /// Insert or overwrite the entry for `name` with a fresh timestamp.
    pub fn store(&self, name: &str, remote_id: &str) {
        let entry = CacheEntry {
            remote_id: remote_id.to_string(),
            inserted_at: Instant::now(),
        };
        self.entries.write().insert(name.to_string(), entry);
        debug!("cache store name={} id={}", name, remote_id);
    }

    /// Raw entry regardless of freshness.
    pub fn entry(&self, name: &str) -> Option<CacheEntry> {
        self.entries.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
