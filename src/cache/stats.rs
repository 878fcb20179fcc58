//! Cache Statistics Module
//!
//! Tracks lookup hits and misses plus the reasons entries left the store.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Counters describing a dictionary's activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries removed by the capacity evictor
    pub evictions: u64,
    /// Entries removed because they outlived `max_age`
    pub expirations: u64,
    /// Entries currently stored, including expired ones not yet removed
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Reset Evictions ==
    /// Zeroes the eviction counter and returns its previous value.
    pub fn reset_evictions(&mut self) -> u64 {
        std::mem::take(&mut self.evictions)
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
