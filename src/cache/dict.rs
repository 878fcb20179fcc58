//! Expiring Dictionary Module
//!
//! The public, thread-safe dictionary. Wraps an `EntryStore` in a reentrant
//! lock and layers the derived API (copy construction, snapshots, state
//! export, display) on top.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::entry::{self, Timestamp};
use crate::cache::{CacheStats, DictState, EntryStore};
use crate::config::{DictConfig, ExpirationPolicy};
use crate::error::{DictError, Result};
use crate::tasks::spawn_sweep_task;

// == Expiring Dict ==
/// A bounded dictionary whose entries disappear once older than `max_age`.
///
/// All operations take `&self`; the dictionary can be shared across threads
/// behind an `Arc`. Stale entries are never returned: every read path checks
/// the entry's age and drops it on discovery. Inserting a new key into a full
/// dictionary evicts the least recently used entry.
///
/// Overwriting a key always counts as a use. Reads count as a use only when
/// `DictConfig::refresh_on_read` is set.
///
/// ```
/// use std::time::Duration;
/// use expiring_dict::ExpiringDict;
///
/// let dict = ExpiringDict::new(3, Duration::from_secs(60)).unwrap();
/// dict.set("a", 1);
/// assert_eq!(dict.get("a"), Some(1));
/// assert_eq!(dict.to_string(), r#"ExpiringDict([("a", 1)])"#);
/// ```
pub struct ExpiringDict<K, V> {
    /// Guarded storage; reentrant so compound operations can call simple ones
    inner: ReentrantMutex<RefCell<EntryStore<K, V>>>,
    config: DictConfig,
}

impl<K, V> ExpiringDict<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructors ==
    /// Creates an empty dictionary.
    ///
    /// Fails with `DictError::Configuration` if `max_len` is zero.
    pub fn new(max_len: usize, max_age: Duration) -> Result<Self> {
        Self::with_config(DictConfig::new(max_len, max_age))
    }

    /// Creates an empty dictionary from a full configuration.
    pub fn with_config(config: DictConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            max_len = config.max_len,
            max_age = ?config.max_age,
            refresh_on_read = config.refresh_on_read,
            expiration = ?config.expiration,
            "created expiring dict"
        );

        Ok(Self {
            inner: ReentrantMutex::new(RefCell::new(EntryStore::new(&config))),
            config,
        })
    }

    /// Creates a dictionary seeded from plain key-value pairs, all stamped
    /// with the current time.
    pub fn from_map<I>(max_len: usize, max_age: Duration, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let dict = Self::new(max_len, max_age)?;
        for (key, value) in items {
            dict.set(key, value);
        }
        Ok(dict)
    }

    /// Copies another dictionary's live entries with their original
    /// timestamps.
    ///
    /// `None` for `max_len` / `max_age` inherits the source's value.
    pub fn from_dict(
        other: &Self,
        max_len: Option<usize>,
        max_age: Option<Duration>,
    ) -> Result<Self> {
        let mut config = other.config.clone();
        if let Some(max_len) = max_len {
            config.max_len = max_len;
        }
        if let Some(max_age) = max_age {
            config.max_age = max_age;
        }

        let dict = Self::with_config(config)?;
        for (key, value, timestamp) in other.items_with_timestamp() {
            dict.set_at(key, value, timestamp);
        }
        Ok(dict)
    }

    /// Rebuilds a dictionary from exported state.
    pub fn from_state(state: DictState<K, V>) -> Result<Self> {
        let dict = Self::new(state.max_len, state.max_age)?;
        for (key, value, timestamp) in state.items {
            dict.set_at(key, value, timestamp);
        }
        Ok(dict)
    }

    /// Exports the configuration bounds and every live entry with its
    /// timestamp, least recently used first.
    pub fn export_state(&self) -> DictState<K, V> {
        DictState {
            max_len: self.config.max_len,
            max_age: self.config.max_age,
            items: self.items_with_timestamp(),
        }
    }

    // == Set ==
    /// Stores `value` under `key`, stamped with the current time.
    pub fn set(&self, key: K, value: V) {
        self.set_at(key, value, entry::now());
    }

    /// Stores `value` under `key` as if written at `timestamp`.
    ///
    /// Rewriting an existing key never moves its timestamp backwards.
    pub fn set_at(&self, key: K, value: V, timestamp: Timestamp) {
        let sweep = self.sweeps_on_mutation();
        self.with_store(|store| {
            let now = entry::now();
            if sweep {
                store.purge_expired(now);
            }
            store.insert(key, value, timestamp, now);
        });
    }

    /// Returns the live value for `key`, inserting `default` first if there
    /// is none.
    pub fn setdefault(&self, key: K, default: V) -> V {
        let _guard = self.inner.lock();
        if let Some(value) = self.get(&key) {
            return value;
        }
        self.set(key, default.clone());
        default
    }

    // == Get ==
    /// Returns a copy of the live value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_with_age(key).map(|(value, _)| value)
    }

    /// Returns the live value for `key`, or `default`.
    pub fn get_or<Q>(&self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns the live value for `key` and the time since it was written.
    pub fn get_with_age<Q>(&self, key: &Q) -> Option<(V, Duration)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.with_store(|store| store.lookup(key, entry::now()))
    }

    /// Strict lookup: fails with `DictError::KeyNotFound` when `key` is
    /// absent or expired.
    pub fn try_get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.get(key)
            .ok_or_else(|| DictError::KeyNotFound(format!("{:?}", key)))
    }

    /// Checks whether `key` holds a live entry.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.with_store(|store| store.contains(key, entry::now()))
    }

    // == Time To Live ==
    /// Time left before `key` expires.
    ///
    /// `None` if the key is missing or already expired.
    pub fn ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (_, age) = self.get_with_age(key)?;
        self.config
            .max_age
            .checked_sub(age)
            .filter(|remaining| !remaining.is_zero())
    }

    // == Delete ==
    /// Removes `key`. Returns whether anything was stored under it.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let sweep = self.sweeps_on_mutation();
        self.with_store(|store| {
            if sweep {
                store.purge_expired(entry::now());
            }
            store.remove(key).is_some()
        })
    }

    /// Strict delete: removes `key` and returns its value, failing with
    /// `DictError::KeyNotFound` when it is absent or expired.
    pub fn try_remove<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let max_age = self.config.max_age;
        let removed = self.with_store(|store| store.remove(key));
        match removed {
            Some(removed) if !removed.is_expired(entry::now(), max_age) => Ok(removed.value),
            _ => Err(DictError::KeyNotFound(format!("{:?}", key))),
        }
    }

    /// Removes `key` and returns whatever value was stored under it, or
    /// `default`. The value is returned even if it has outlived `max_age`.
    pub fn pop<Q>(&self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.with_store(|store| store.remove(key))
            .map(|removed| removed.value)
            .unwrap_or(default)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.with_store(|store| store.clear());
    }

    // == Length ==
    /// Number of live entries. Expired entries found on the way are dropped.
    pub fn len(&self) -> usize {
        self.with_store(|store| store.live_len(entry::now()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Snapshots ==
    /// Live `(key, value)` pairs, least recently used first.
    pub fn items(&self) -> Vec<(K, V)> {
        self.items_with_timestamp()
            .into_iter()
            .map(|(key, value, _)| (key, value))
            .collect()
    }

    /// Live `(key, value, timestamp)` triples, least recently used first.
    pub fn items_with_timestamp(&self) -> Vec<(K, V, Timestamp)> {
        self.with_store(|store| store.snapshot(entry::now()))
    }

    pub fn keys(&self) -> Vec<K> {
        self.items_with_timestamp()
            .into_iter()
            .map(|(key, _, _)| key)
            .collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.items_with_timestamp()
            .into_iter()
            .map(|(_, value, _)| value)
            .collect()
    }

    // == Sweep ==
    /// Removes every expired entry now. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        self.with_store(|store| store.purge_expired(entry::now()))
    }

    // == Stats ==
    /// Current counters.
    ///
    /// Reading stats never sweeps, so `total_entries` still includes expired
    /// entries that no access or sweep has discovered yet.
    pub fn stats(&self) -> CacheStats {
        self.with_store(|store| store.stats())
    }

    /// Zeroes the eviction counter and returns its previous value.
    pub fn reset_evictions(&self) -> u64 {
        self.with_store(|store| store.reset_evictions())
    }

    // == Configuration ==
    pub fn max_len(&self) -> usize {
        self.config.max_len
    }

    pub fn max_age(&self) -> Duration {
        self.config.max_age
    }

    pub fn config(&self) -> &DictConfig {
        &self.config
    }

    // == Unsupported ==
    /// Bulk construction with one shared value is not supported.
    pub fn from_keys<I>(_keys: I, _value: V) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
    {
        Err(DictError::Unsupported("from_keys"))
    }

    /// Live key views are not supported; use `keys`.
    pub fn view_keys(&self) -> Result<Infallible> {
        Err(DictError::Unsupported("view_keys"))
    }

    /// Live value views are not supported; use `values`.
    pub fn view_values(&self) -> Result<Infallible> {
        Err(DictError::Unsupported("view_values"))
    }

    /// Live item views are not supported; use `items`.
    pub fn view_items(&self) -> Result<Infallible> {
        Err(DictError::Unsupported("view_items"))
    }

    fn sweeps_on_mutation(&self) -> bool {
        self.config.expiration == ExpirationPolicy::OnMutation
    }

    /// Runs `f` with exclusive access to the store.
    ///
    /// `f` must not call back into `self`: the `RefCell` borrow is held for
    /// its whole duration.
    fn with_store<R>(&self, f: impl FnOnce(&mut EntryStore<K, V>) -> R) -> R {
        let guard = self.inner.lock();
        let mut store = guard.borrow_mut();
        f(&mut *store)
    }
}

impl<K, V> ExpiringDict<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Starts the background sweep configured by
    /// `ExpirationPolicy::Periodic`. Returns `None` under any other policy.
    ///
    /// Must be called from within a Tokio runtime. The task stops on its own
    /// once the last `Arc` to the dictionary is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        match self.config.expiration {
            ExpirationPolicy::Periodic(interval) => Some(spawn_sweep_task(self, interval)),
            _ => None,
        }
    }
}

// == Display ==
impl<K, V> fmt::Display for ExpiringDict<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExpiringDict([")?;
        for (i, (key, value)) in self.items().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({:?}, {:?})", key, value)?;
        }
        write!(f, "])")
    }
}

impl<K, V> fmt::Debug for ExpiringDict<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stored = self.with_store(|store| store.stored_len());
        f.debug_struct("ExpiringDict")
            .field("config", &self.config)
            .field("stored", &stored)
            .finish()
    }
}

// == Serde ==
impl<K, V> Serialize for ExpiringDict<K, V>
where
    K: Eq + Hash + Clone + Serialize,
    V: Clone + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.export_state().serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for ExpiringDict<K, V>
where
    K: Eq + Hash + Clone + Deserialize<'de>,
    V: Clone + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let state = DictState::<K, V>::deserialize(deserializer)?;
        Self::from_state(state).map_err(serde::de::Error::custom)
    }
}
