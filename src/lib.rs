//! Expiring Dict - a bounded, thread-safe dictionary with auto-expiring values
//!
//! Entries are treated as absent once older than the configured max age, and
//! inserting into a full dictionary evicts the least recently used entry.

pub mod cache;
pub mod config;
pub mod error;
pub mod memoize;
pub mod tasks;

pub use cache::{CacheStats, DictState, ExpiringDict, Timestamp};
pub use config::{DictConfig, ExpirationPolicy};
pub use error::{DictError, Result};
pub use memoize::{memoize, Memoized};
pub use tasks::spawn_sweep_task;
