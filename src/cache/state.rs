//! Exported dictionary state
//!
//! The `(max_len, max_age, items_with_timestamp)` triple that is sufficient
//! to rebuild an equivalent dictionary, independent of how it is encoded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::entry::Timestamp;

/// A dictionary's configuration bounds plus every live entry with its
/// original timestamp, least recently used first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictState<K, V> {
    pub max_len: usize,
    pub max_age: Duration,
    pub items: Vec<(K, V, Timestamp)>,
}
