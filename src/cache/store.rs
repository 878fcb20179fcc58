//! Entry Store Module
//!
//! Unsynchronized storage engine combining a HashMap with LRU tracking and
//! max-age expiration. `ExpiringDict` wraps it in the lock.
//!
//! Every time-dependent method takes `now` explicitly so the caller decides
//! which clock reading an operation observes.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tracing::{debug, trace};

use crate::cache::entry::{Entry, Timestamp};
use crate::cache::{CacheStats, LruTracker};
use crate::config::DictConfig;

// == Slot ==
/// An entry plus its handle in the recency list.
#[derive(Debug, Clone)]
struct Slot<V> {
    entry: Entry<V>,
    node: usize,
}

// == Entry Store ==
/// Key-value storage with LRU eviction and lazy expiration.
#[derive(Debug)]
pub struct EntryStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, Slot<V>>,
    /// Recency order, head is the next eviction candidate
    lru: LruTracker<K>,
    stats: CacheStats,
    max_len: usize,
    max_age: Duration,
    refresh_on_read: bool,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty store bounded by `config`.
    ///
    /// The config is expected to have been validated already.
    pub fn new(config: &DictConfig) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_len: config.max_len,
            max_age: config.max_age,
            refresh_on_read: config.refresh_on_read,
        }
    }

    // == Insert ==
    /// Stores `value` under `key` as written at `timestamp`.
    ///
    /// An existing key is refreshed in place and becomes most recently used;
    /// this never evicts. A new key arriving while the store is full first
    /// drops expired entries, then evicts the least recently used entry if
    /// the store is still full.
    ///
    /// Returns the evicted key, if any.
    pub fn insert(&mut self, key: K, value: V, timestamp: Timestamp, now: Timestamp) -> Option<K> {
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.entry.refresh(value, timestamp);
            self.lru.touch(slot.node);
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.max_len {
            self.purge_expired(now);
            if self.entries.len() >= self.max_len {
                evicted = self.evict_oldest();
            }
        }

        let node = self.lru.push(key.clone());
        self.entries.insert(
            key,
            Slot {
                entry: Entry::new(value, timestamp),
                node,
            },
        );
        evicted
    }

    // == Lookup ==
    /// Returns a copy of the live value for `key` and its age.
    ///
    /// An expired entry is removed and reported as absent. Hits and misses
    /// are counted.
    pub fn lookup<Q>(&mut self, key: &Q, now: Timestamp) -> Option<(V, Duration)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.freshen(key, now).and_then(|age| {
            self.entries
                .get(key)
                .map(|slot| (slot.entry.value.clone(), age))
        });
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    // == Contains ==
    /// Checks whether `key` holds a live entry, removing it if expired.
    pub fn contains<Q>(&mut self, key: &Q, now: Timestamp) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.freshen(key, now).is_some()
    }

    // == Remove ==
    /// Removes `key` regardless of its age.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.lru.remove(slot.node);
        Some(slot.entry)
    }

    // == Purge Expired ==
    /// Removes every expired entry without touching the order of the rest.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let max_age = self.max_age;
        let expired: Vec<(K, usize)> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired(now, max_age))
            .map(|(key, slot)| (key.clone(), slot.node))
            .collect();

        let count = expired.len();
        for (key, node) in expired {
            self.entries.remove(&key);
            self.lru.remove(node);
        }

        if count > 0 {
            self.stats.record_expirations(count);
            trace!(count, "dropped expired entries");
        }
        count
    }

    // == Snapshot ==
    /// Copies every live entry, least recently used first.
    pub fn snapshot(&mut self, now: Timestamp) -> Vec<(K, V, Timestamp)> {
        self.purge_expired(now);
        self.lru
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|slot| (key.clone(), slot.entry.value.clone(), slot.entry.timestamp))
            })
            .collect()
    }

    // == Live Length ==
    /// Number of live entries at `now`; expired entries are dropped first.
    pub fn live_len(&mut self, now: Timestamp) -> usize {
        self.purge_expired(now);
        self.entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn stored_len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Stats ==
    /// Returns the counters with `total_entries` set to the stored count.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn reset_evictions(&mut self) -> u64 {
        self.stats.reset_evictions()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Applies the expiration check to `key` and returns the entry's age if
    /// it is live. A live entry counts as used when read refresh is enabled.
    fn freshen<Q>(&mut self, key: &Q, now: Timestamp) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.get(key)?;
        let age = slot.entry.age(now);
        let node = slot.node;

        if age >= self.max_age {
            self.remove(key);
            self.stats.record_expirations(1);
            trace!(?age, "lazily expired entry");
            return None;
        }

        if self.refresh_on_read {
            self.lru.touch(node);
        }
        Some(age)
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let key = self.lru.evict_oldest()?;
        self.entries.remove(&key);
        self.stats.record_eviction();
        debug!(max_len = self.max_len, "evicted least recently used entry");
        Some(key)
    }
}
