//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the dictionary against its capacity, expiration
//! and recency rules.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::TimeDelta;

use crate::cache::{now, ExpiringDict};
use crate::config::DictConfig;

// == Test Configuration ==
const TEST_MAX_LEN: usize = 100;
const TEST_MAX_AGE: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates keys from a small alphabet so sequences revisit keys often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}"
}

#[derive(Debug, Clone)]
enum DictOp {
    Set { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn dict_op_strategy() -> impl Strategy<Value = DictOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| DictOp::Set { key, value }),
        key_strategy().prop_map(|key| DictOp::Get { key }),
        key_strategy().prop_map(|key| DictOp::Remove { key }),
    ]
}

fn long_lived(max_len: usize) -> ExpiringDict<String, String> {
    ExpiringDict::new(max_len, TEST_MAX_AGE).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every write leaves at most max_len entries behind.
    #[test]
    fn prop_capacity_enforcement(
        max_len in 1usize..8,
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200)
    ) {
        let dict = long_lived(max_len);

        for (key, value) in entries {
            dict.set(key, value);
            prop_assert!(
                dict.len() <= max_len,
                "Dict size {} exceeds max {}",
                dict.len(),
                max_len
            );
        }
    }

    // The dictionary's key order always matches a plain move-to-back list
    // with front eviction.
    #[test]
    fn prop_matches_lru_model(
        max_len in 1usize..6,
        ops in prop::collection::vec(dict_op_strategy(), 1..100)
    ) {
        let dict = long_lived(max_len);
        let mut model: Vec<(String, String)> = Vec::new();

        for op in ops {
            match op {
                DictOp::Set { key, value } => {
                    dict.set(key.clone(), value.clone());
                    if let Some(pos) = model.iter().position(|(k, _)| *k == key) {
                        model.remove(pos);
                    } else if model.len() == max_len {
                        model.remove(0);
                    }
                    model.push((key, value));
                }
                DictOp::Get { key } => {
                    let expected = model.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());
                    prop_assert_eq!(dict.get(&key), expected);
                }
                DictOp::Remove { key } => {
                    let existed = model.iter().any(|(k, _)| *k == key);
                    model.retain(|(k, _)| *k != key);
                    prop_assert_eq!(dict.remove(&key), existed);
                }
            }
            prop_assert_eq!(dict.items(), model.clone());
        }
    }

    // Hit and miss counters agree with what get observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(dict_op_strategy(), 1..50)) {
        let dict = long_lived(TEST_MAX_LEN);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                DictOp::Set { key, value } => dict.set(key, value),
                DictOp::Get { key } => match dict.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                DictOp::Remove { key } => {
                    dict.remove(&key);
                }
            }
        }

        let stats = dict.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, dict.len(), "Total entries mismatch");
    }

    // Overwriting a key returns the newest value and never adds an entry.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let dict = long_lived(TEST_MAX_LEN);

        dict.set(key.clone(), value1);
        dict.set(key.clone(), value2.clone());

        prop_assert_eq!(dict.get(&key), Some(value2));
        prop_assert_eq!(dict.len(), 1);
    }

    // An entry is live strictly before max_age has elapsed and absent from
    // then on.
    #[test]
    fn prop_expiration_boundary(
        max_age_secs in 1i64..3600,
        age_secs in 0i64..7200,
        value in value_strategy()
    ) {
        let dict: ExpiringDict<String, String> =
            ExpiringDict::new(10, Duration::from_secs(max_age_secs as u64)).unwrap();
        dict.set_at("key".to_string(), value.clone(), now() - TimeDelta::seconds(age_secs));

        // The clock keeps moving between set_at and get, so only assert away
        // from the exact boundary
        if age_secs < max_age_secs - 1 {
            prop_assert_eq!(dict.get("key"), Some(value));
        } else if age_secs >= max_age_secs {
            prop_assert_eq!(dict.get("key"), None);
            prop_assert_eq!(dict.len(), 0);
        }
    }

    // Exported state rebuilds a dictionary with the same live entries.
    #[test]
    fn prop_state_roundtrip(
        max_len in 1usize..10,
        entries in prop::collection::vec((key_strategy(), value_strategy()), 0..20)
    ) {
        let dict = long_lived(max_len);
        for (key, value) in entries {
            dict.set(key, value);
        }

        let restored = ExpiringDict::from_state(dict.export_state()).unwrap();

        prop_assert_eq!(restored.max_len(), dict.max_len());
        prop_assert_eq!(restored.max_age(), dict.max_age());
        prop_assert_eq!(restored.items_with_timestamp(), dict.items_with_timestamp());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Filling the dict then adding one new key evicts the first key written.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::hash_set("[a-z]{1,8}", 2..10),
        new_key in "[A-Z]{1,8}",
        new_value in value_strategy()
    ) {
        let unique_keys: Vec<String> = initial_keys.into_iter().collect();
        let capacity = unique_keys.len();
        let dict = long_lived(capacity);

        for key in &unique_keys {
            dict.set(key.clone(), format!("value_{}", key));
        }
        dict.set(new_key.clone(), new_value);

        prop_assert_eq!(dict.len(), capacity);
        prop_assert!(!dict.contains_key(&unique_keys[0]));
        prop_assert!(dict.contains_key(&new_key));
        for key in unique_keys.iter().skip(1) {
            prop_assert!(dict.contains_key(key), "Key '{}' should still exist", key);
        }
    }

    // With read refresh enabled, a read protects the key from the next
    // eviction.
    #[test]
    fn prop_lru_read_tracking(
        keys in prop::collection::hash_set("[a-z]{1,8}", 3..8),
        new_key in "[A-Z]{1,8}",
        new_value in value_strategy()
    ) {
        let unique_keys: Vec<String> = keys.into_iter().collect();
        let capacity = unique_keys.len();
        let config = DictConfig::new(capacity, TEST_MAX_AGE).with_refresh_on_read(true);
        let dict: ExpiringDict<String, String> = ExpiringDict::with_config(config).unwrap();

        for key in &unique_keys {
            dict.set(key.clone(), format!("value_{}", key));
        }

        let accessed_key = unique_keys[0].clone();
        prop_assert!(dict.get(&accessed_key).is_some());

        dict.set(new_key.clone(), new_value);

        prop_assert!(dict.contains_key(&accessed_key));
        prop_assert!(!dict.contains_key(&unique_keys[1]));
        prop_assert!(dict.contains_key(&new_key));
    }
}

// == Concurrent Operation Correctness ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Concurrent writers and readers never corrupt values or overflow the
    // capacity.
    #[test]
    fn prop_concurrent_operation_correctness(
        max_len in 1usize..16,
        operations in prop::collection::vec(dict_op_strategy(), 10..60)
    ) {
        let dict = Arc::new(long_lived(max_len));
        let written: HashSet<String> = operations
            .iter()
            .filter_map(|op| match op {
                DictOp::Set { value, .. } => Some(value.clone()),
                _ => None,
            })
            .collect();

        let handles: Vec<_> = operations
            .chunks(5)
            .map(|chunk| {
                let dict = Arc::clone(&dict);
                let chunk = chunk.to_vec();
                thread::spawn(move || -> Vec<String> {
                    let mut seen = Vec::new();
                    for op in chunk {
                        match op {
                            DictOp::Set { key, value } => dict.set(key, value),
                            DictOp::Get { key } => seen.extend(dict.get(&key)),
                            DictOp::Remove { key } => {
                                dict.remove(&key);
                            }
                        }
                    }
                    seen
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().expect("worker should not panic");
            for value in seen {
                prop_assert!(written.contains(&value), "Read a value nobody wrote: {}", value);
            }
        }

        prop_assert!(dict.len() <= max_len);
        prop_assert_eq!(dict.keys().len(), dict.len());
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_one_keeps_latest() {
        let dict = long_lived(1);

        dict.set("a".to_string(), "A".to_string());
        dict.set("b".to_string(), "B".to_string());

        assert_eq!(dict.items(), vec![("b".to_string(), "B".to_string())]);
    }

    #[test]
    fn test_many_threads_respect_capacity() {
        let dict = Arc::new(ExpiringDict::<u64, u64>::new(50, TEST_MAX_AGE).unwrap());

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let dict = Arc::clone(&dict);
                thread::spawn(move || {
                    for i in 0..500u64 {
                        dict.set(t * 1000 + i, i);
                        assert!(dict.len() <= 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(dict.len(), 50);
        assert_eq!(dict.stats().evictions, 8 * 500 - 50);
    }
}
