// src/cache.rs
//! Bounded least-recently-used cache for generated answers.
//!
//! Keys are SHA-256 digests of the lowercased query. Recency is a monotonically
//! increasing tick per entry; eviction removes the smallest tick.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Mutex;

/// Hex SHA-256 of the lowercased query.
pub fn query_key(query: &str) -> String {
    let digest = Sha256::digest(query.to_lowercase().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, (V, u64)>,
    by_tick: BTreeMap<u64, K>,
    tick: u64,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// `capacity == 0` disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                by_tick: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cloned value; marks the entry most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut g = self.lock();
        g.tick += 1;
        let tick = g.tick;
        let (value, old) = {
            let (value, t) = g.entries.get_mut(key)?;
            let old = *t;
            *t = tick;
            (value.clone(), old)
        };
        g.by_tick.remove(&old);
        g.by_tick.insert(tick, key.clone());
        Some(value)
    }

    /// Insert or replace; evicts the least recently used entry when full.
    pub fn put(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut g = self.lock();
        g.tick += 1;
        let tick = g.tick;

        if let Some((_, old)) = g.entries.remove(&key) {
            g.by_tick.remove(&old);
        } else if g.entries.len() >= self.capacity {
            if let Some((_, oldest)) = g.by_tick.pop_first() {
                g.entries.remove(&oldest);
            }
        }
        g.entries.insert(key.clone(), (value, tick));
        g.by_tick.insert(tick, key);
    }
}
