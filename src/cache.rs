//! Time-based memoization for calculator results.
//!
//! The cache is a derived, disposable optimization: correctness must hold
//! identically with it cleared. Only successful computations are stored, so
//! a transient store outage is never replayed from cache inside the TTL.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Result;

/// Stable identity of a memoized computation: the calculator name plus its
/// normalized parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    calculator: &'static str,
    params: String,
}

impl CacheKey {
    pub fn new(calculator: &'static str, params: &[(&str, String)]) -> Self {
        let mut pairs: Vec<String> =
            params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        Self {
            calculator,
            params: pairs.join("&"),
        }
    }

    pub fn calculator(&self) -> &'static str {
        self.calculator
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Hit/miss counters for the status surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// In-memory map of key → (value, timestamp) with a fixed TTL.
///
/// Writes to a key are serialized by the mutex; the lock is not held across
/// a compute await, so two concurrent misses may both compute and the last
/// writer wins. A partially-written entry is never observable.
pub struct TtlCache<V: Clone> {
    entries: Mutex<HashMap<CacheKey, Entry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, value: V) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the fresh cached value for `key`, or run `compute`, store its
    /// success, and return it. Errors pass through uncached.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key) {
            log::debug!("cache hit: {} [{}]", key.calculator, key.params);
            return Ok(value);
        }
        log::debug!("cache miss: {} [{}]", key.calculator, key.params);
        let value = compute().await?;
        self.put(key, value.clone());
        Ok(value)
    }

    /// Drop every entry (administrative full-cache clear).
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().expect("cache lock poisoned").len(),
        }
    }
}
