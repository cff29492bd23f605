//! In-memory full-text cache keyed by normalized term.
//!
//! Entries expire after a TTL; when full, the least recently used entry is
//! evicted. Expired entries are dropped lazily on access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Content at or below this many chars is never cached.
pub const MIN_CACHEABLE_CHARS: usize = 50;

#[derive(Debug)]
struct Entry {
    content: String,
    stored_at: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    tick: u64,
}

#[derive(Debug)]
pub struct TermCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: usize,
}

impl Default for TermCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(crate::config::DEFAULT_CACHE_TTL_S),
            crate::config::DEFAULT_CACHE_CAPACITY,
        )
    }
}

impl TermCache {
    /// `capacity == 0` disables caching.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            capacity,
        }
    }

    /// Trimmed, lowercased.
    pub fn key(term: &str) -> String {
        term.trim().to_lowercase()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, term: &str) -> Option<String> {
        self.get_at(term, Instant::now())
    }

    /// Returns whether the content was stored.
    pub fn insert(&self, term: &str, content: &str) -> bool {
        self.insert_at(term, content, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_fresh(&self, e: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(e.stored_at) < self.ttl
    }

    pub(crate) fn get_at(&self, term: &str, now: Instant) -> Option<String> {
        let key = Self::key(term);
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let fresh = match inner.entries.get(&key) {
            None => return None,
            Some(e) => self.is_fresh(e, now),
        };
        if !fresh {
            inner.entries.remove(&key);
            return None;
        }
        let e = inner.entries.get_mut(&key)?;
        e.last_used = tick;
        Some(e.content.clone())
    }

    pub(crate) fn insert_at(&self, term: &str, content: &str, now: Instant) -> bool {
        if self.capacity == 0 || content.chars().count() <= MIN_CACHEABLE_CHARS {
            return false;
        }
        let key = Self::key(term);
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            inner.entries.retain(|_, e| now.saturating_duration_since(e.stored_at) < self.ttl);
            if inner.entries.len() >= self.capacity {
                let lru = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(k) = lru {
                    inner.entries.remove(&k);
                }
            }
        }

        inner.entries.insert(
            key,
            Entry {
                content: content.to_string(),
                stored_at: now,
                last_used: tick,
            },
        );
        true
    }
}
