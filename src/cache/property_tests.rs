//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the table invariants against a simple model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::cache::{CacheStore, TtlCache};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(600);

// == Strategies ==
/// Generates region-like keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Insert { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Insert { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Reads always return the value most recently stored for the key, and
    // hit/miss counters match what the reads observed.
    #[test]
    fn prop_reads_follow_latest_write(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = CacheStore::new(TEST_TTL, None);
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Insert { key, value } => {
                    store.insert(key.clone(), value.clone());
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = store.get(&key);
                    prop_assert_eq!(got.as_ref(), model.get(&key));
                    if got.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(store.remove(&key), model.remove(&key).is_some());
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, model.len());
    }

    // The table never grows past its capacity bound.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200),
        capacity in 1usize..20,
    ) {
        let mut store = CacheStore::new(TEST_TTL, Some(capacity));

        for (key, value) in entries {
            store.insert(key, value);
            prop_assert!(store.len() <= capacity, "size {} exceeds {}", store.len(), capacity);
        }
    }

    // Filling to capacity and inserting one more key evicts exactly the
    // least recently touched key.
    #[test]
    fn prop_lru_evicts_least_recently_touched(
        keys in prop::collection::hash_set(key_strategy(), 3..10),
        touched in 0usize..100,
        new_key in key_strategy(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        prop_assume!(!keys.contains(&new_key));

        let mut store = CacheStore::new(TEST_TTL, Some(keys.len()));
        for key in &keys {
            store.insert(key.clone(), format!("value_{key}"));
        }

        let touched = touched % keys.len();
        store.get(&keys[touched]);
        let expected_victim = if touched == 0 { &keys[1] } else { &keys[0] };

        store.insert(new_key.clone(), "fresh".to_string());

        prop_assert_eq!(store.len(), keys.len());
        prop_assert!(store.get(expected_victim).is_none());
        prop_assert!(store.get(&keys[touched]).is_some());
        prop_assert!(store.get(&new_key).is_some());
    }
}

// Time-sensitive properties run on a paused clock, so they stay cheap.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // A read at time t only succeeds while t < stored_at + TTL.
    #[test]
    fn prop_ttl_visibility_window(
        key in key_strategy(),
        value in value_strategy(),
        ttl_ms in 1u64..10_000,
        read_after_ms in 0u64..20_000,
    ) {
        let rt = paused_runtime();
        let (got, ttl) = rt.block_on(async {
            let ttl = Duration::from_millis(ttl_ms);
            let mut store = CacheStore::new(ttl, None);
            store.insert(key.clone(), value.clone());
            tokio::time::advance(Duration::from_millis(read_after_ms)).await;
            (store.get(&key), ttl)
        });

        if Duration::from_millis(read_after_ms) < ttl {
            prop_assert_eq!(got, Some(value));
        } else {
            prop_assert_eq!(got, None);
        }
    }

    // However many callers race on a set of keys, each key is loaded once.
    #[test]
    fn prop_one_load_per_distinct_key(
        requests in prop::collection::vec(key_strategy(), 1..40),
    ) {
        let rt = paused_runtime();
        let distinct: HashSet<String> = requests.iter().cloned().collect();

        let (loads, results) = rt.block_on(async {
            let cache: TtlCache<String> = TtlCache::new(TEST_TTL, None);
            let mut handles = Vec::new();
            for key in requests.clone() {
                let cache = cache.clone();
                handles.push(tokio::spawn(async move {
                    let loaded = key.to_uppercase();
                    let value = cache
                        .get_or_load(&key, move || async move {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok(loaded)
                        })
                        .await;
                    (key, value)
                }));
            }

            let mut results = Vec::new();
            for handle in handles {
                results.push(handle.await.unwrap());
            }
            (cache.stats().loads, results)
        });

        prop_assert_eq!(loads, distinct.len() as u64);
        for (key, value) in results {
            prop_assert_eq!(value, Ok(key.to_uppercase()));
        }
    }
}
