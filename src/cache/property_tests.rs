//! Property-Based Tests for the Cache Module
//!
//! Uses proptest to check the TTL-resolution policy across its whole input
//! space and to verify the expiration tracker and the store against simple
//! reference models under arbitrary operation sequences.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;

use crate::cache::expiry::ExpirationTracker;
use crate::cache::store::Store;
use crate::cache::ttl::effective_ttl_seconds;
use crate::error::CacheError;

// == Strategies ==
/// Small key space so operations collide often.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}".prop_map(|s| s)
}

// == TTL Policy Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // The policy is total over its four quadrants: an unlimited cache
    // honors the request as-is, a configured cache fills in missing
    // requests, and only a request above the ceiling fails.
    #[test]
    fn prop_ttl_resolution_quadrants(requested in 0u64..10_000, configured in 0u64..10_000) {
        let result = effective_ttl_seconds(requested, configured);

        if configured == 0 {
            prop_assert_eq!(result, Ok(requested));
        } else if requested == 0 {
            prop_assert_eq!(result, Ok(configured));
        } else if requested <= configured {
            prop_assert_eq!(result, Ok(requested));
        } else {
            prop_assert_eq!(result, Err(CacheError::InvalidTtl { requested, configured }));
        }
    }

    // A successful resolution can shorten the cache-wide ceiling but never
    // lengthen it.
    #[test]
    fn prop_resolved_ttl_never_exceeds_ceiling(requested in 0u64..10_000, configured in 1u64..10_000) {
        if let Ok(ttl) = effective_ttl_seconds(requested, configured) {
            prop_assert!(ttl > 0);
            prop_assert!(ttl <= configured);
        }
    }
}

// == Tracker Properties ==
#[derive(Debug, Clone)]
enum TrackerOp {
    Track { key: String, ttl: u64 },
    Renew { key: String },
    Invalidate { key: String },
    Advance { seconds: u64 },
    Poll,
}

fn tracker_op_strategy() -> impl Strategy<Value = TrackerOp> {
    prop_oneof![
        (key_strategy(), 0u64..5).prop_map(|(key, ttl)| TrackerOp::Track { key, ttl }),
        key_strategy().prop_map(|key| TrackerOp::Renew { key }),
        key_strategy().prop_map(|key| TrackerOp::Invalidate { key }),
        (1u64..4).prop_map(|seconds| TrackerOp::Advance { seconds }),
        Just(TrackerOp::Poll),
    ]
}

/// Reference model of one tracked key: deadline and duration in whole
/// seconds on a virtual clock.
#[derive(Debug, Clone, Copy)]
struct ModelWindow {
    deadline: Option<u64>,
    ttl: u64,
}

fn model_live(model: &HashMap<String, ModelWindow>, key: &str, clock: u64) -> bool {
    model
        .get(key)
        .is_some_and(|w| w.deadline.map_or(true, |deadline| deadline > clock))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // For any sequence of track/renew/invalidate operations interleaved
    // with clock advances, poll_due returns exactly the keys the reference
    // model considers due, and liveness answers always agree with it.
    #[test]
    fn prop_tracker_matches_reference_model(
        ops in prop::collection::vec(tracker_op_strategy(), 1..60)
    ) {
        let tracker = ExpirationTracker::new();
        let mut model: HashMap<String, ModelWindow> = HashMap::new();
        let base = Instant::now();
        let mut clock: u64 = 0;

        for op in ops {
            let now = base + Duration::from_secs(clock);
            match op {
                TrackerOp::Track { key, ttl } => {
                    let expected_live = model_live(&model, &key, clock);
                    let was_live = tracker.track(key.clone(), ttl, now);
                    prop_assert_eq!(was_live, expected_live, "track liveness diverged");
                    model.insert(
                        key,
                        ModelWindow {
                            deadline: (ttl > 0).then(|| clock + ttl),
                            ttl,
                        },
                    );
                }
                TrackerOp::Renew { key } => {
                    let expected_live = model_live(&model, &key, clock);
                    let renewed = tracker.renew(&key, now);
                    prop_assert_eq!(renewed, expected_live, "renew liveness diverged");
                    if renewed {
                        if let Some(window) = model.get_mut(&key) {
                            if window.ttl > 0 {
                                window.deadline = Some(clock + window.ttl);
                            }
                        }
                    }
                }
                TrackerOp::Invalidate { key } => {
                    let expected_live = model_live(&model, &key, clock);
                    let was_live = tracker.invalidate(&key, now);
                    prop_assert_eq!(was_live, expected_live, "invalidate liveness diverged");
                    model.remove(&key);
                }
                TrackerOp::Advance { seconds } => {
                    clock += seconds;
                }
                TrackerOp::Poll => {
                    let due: HashSet<String> = tracker.poll_due(now).into_iter().collect();
                    let expected: HashSet<String> = model
                        .iter()
                        .filter(|(_, w)| w.deadline.is_some_and(|deadline| deadline <= clock))
                        .map(|(key, _)| key.clone())
                        .collect();
                    prop_assert_eq!(&due, &expected, "due set diverged");
                    for key in due {
                        model.remove(&key);
                    }
                }
            }
        }

        // A final poll far in the future drains everything with a deadline.
        let due: HashSet<String> = tracker
            .poll_due(base + Duration::from_secs(clock + 1_000_000))
            .into_iter()
            .collect();
        let expected: HashSet<String> = model
            .iter()
            .filter(|(_, w)| w.deadline.is_some())
            .map(|(key, _)| key.clone())
            .collect();
        prop_assert_eq!(&due, &expected, "final due set diverged");
    }
}

// == Store Properties ==
#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, value: String },
    Remove { key: String },
    Get { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOp::Set { key, value }),
        key_strategy().prop_map(|key| StoreOp::Remove { key }),
        key_strategy().prop_map(|key| StoreOp::Get { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // For any sequence of set/remove/get operations, the store behaves
    // exactly like a plain map: same previous values, same lookups, same
    // final size.
    #[test]
    fn prop_store_matches_reference_model(
        ops in prop::collection::vec(store_op_strategy(), 1..50)
    ) {
        let store = Store::new();
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    let previous = store.insert_with(key.clone(), value.clone(), |_| {});
                    prop_assert_eq!(previous, model.insert(key, value));
                }
                StoreOp::Remove { key } => {
                    prop_assert_eq!(store.remove(&key), model.remove(&key));
                }
                StoreOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(&key).cloned());
                }
            }
        }

        prop_assert_eq!(store.len(), model.len());
    }
}
