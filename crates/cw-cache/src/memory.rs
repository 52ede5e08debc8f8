//! In-memory cache implementation.
//!
//! [`MemoryCache`] keeps every bucket in a process-local map. Handles to the
//! same bucket name share storage, so a page cached during one build is a hit
//! in the next build of the same session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Cache, CacheBucket};

type Entries = HashMap<String, (String, Vec<u8>)>;

/// Process-local [`Cache`].
#[derive(Clone, Default)]
pub struct MemoryCache {
    buckets: Arc<Mutex<HashMap<String, Arc<Mutex<Entries>>>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        let mut buckets = self.buckets.lock().unwrap();
        let entries = buckets.entry(name.to_owned()).or_default();
        Box::new(MemoryCacheBucket {
            entries: Arc::clone(entries),
        })
    }
}

struct MemoryCacheBucket {
    entries: Arc<Mutex<Entries>>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().unwrap();
        let (stored_etag, value) = entries.get(key)?;
        if !etag.is_empty() && stored_etag != etag {
            tracing::debug!(key, "Cache etag mismatch");
            return None;
        }
        Some(value.clone())
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), (etag.to_owned(), value.to_vec()));
    }
}
