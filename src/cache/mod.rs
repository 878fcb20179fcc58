//! Cache Module
//!
//! Provides the expiring dictionary: max-age expiration and LRU eviction
//! behind a reentrant lock.

mod dict;
mod entry;
mod lru;
mod state;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use dict::ExpiringDict;
pub use entry::{now, Entry, Timestamp};
pub use lru::LruTracker;
pub use state::DictState;
pub use stats::CacheStats;
pub use store::EntryStore;
