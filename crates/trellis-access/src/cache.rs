//! Bounded, time-expiring cache shared across request handlers.
//!
//! # Purpose
//! Backs department name resolution and the route middleware memo. Instances
//! are created by the application and injected where they are needed.
//!
//! # Key invariants
//! - An entry older than the TTL is never returned.
//! - The cache never holds more than `capacity` entries: inserting a new key
//!   into a full cache first drops expired entries, then the oldest entry.
//! - `clear` removes every entry immediately.
//!
//! # Concurrency
//! Entries live in a `DashMap`; shard guards are released before any
//! follow-up mutation on the same key.
use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Capacity-bounded cache with optional per-entry time to live.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use trellis_access::TtlCache;
///
/// let cache = TtlCache::new(Some(Duration::from_secs(30)), 128);
/// cache.insert("Engineering".to_string(), "64f0c0ffee0000000000abcd".to_string());
/// assert_eq!(
///     cache.get(&"Engineering".to_string()).as_deref(),
///     Some("64f0c0ffee0000000000abcd")
/// );
/// cache.clear();
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Option<Duration>,
    capacity: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Option<Duration>, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key)
            && !entry.is_expired(now)
        {
            return Some(entry.value.clone());
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict(now);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: self.ttl.map(|ttl| now + ttl),
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));
        if self.entries.len() < self.capacity {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
