use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::clock::{Clock, SystemClock};
use crate::models::SearchResponse;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    data: Arc<SearchResponse>,
    stored_at: SystemTime,
}

/// Completed responses keyed by [`crate::models::SearchQuery::cache_key`].
///
/// Expired entries are dropped when they are next looked up; nothing sweeps
/// the map in the background.
pub struct ResultCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_TTL, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, key: impl Into<String>, data: impl Into<Arc<SearchResponse>>) {
        let entry = CacheEntry {
            data: data.into(),
            stored_at: self.clock.now(),
        };
        self.lock_entries().insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<Arc<SearchResponse>> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let stored_at = entries.get(key)?.stored_at;

        let age = now.duration_since(stored_at).unwrap_or(Duration::ZERO);
        if age > self.ttl {
            entries.remove(key);
            tracing::debug!(key, "evicted expired search result");
            return None;
        }

        entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
