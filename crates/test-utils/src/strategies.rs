//! Proptest strategies for shardkv domain types.
//!
//! Reusable generators for property-based testing across crates. Strategies produce
//! well-formed domain values while exploring edge cases through random variation:
//! empty keys, shared prefixes, bytes above 0x7f and keys that are prefixes of
//! one another.
//!
//! # Usage
//!
//! ```no_run
//! use shardkv_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(keys in strategies::arb_key_set(64)) {
//!         // test invariant with a random set of distinct keys
//!     }
//! }
//! ```

use std::collections::BTreeSet;

use proptest::prelude::*;
use shardkv_types::{BatchMode, ConsistencyLevel, Direction};

/// Generates an arbitrary raw key of 0-11 bytes.
///
/// The alphabet is deliberately small so generated keys frequently share
/// prefixes and collide, and includes bytes above 0x7f to catch signed
/// comparisons.
pub fn arb_key_bytes() -> impl Strategy<Value = Vec<u8>> {
    let byte = prop::sample::select(vec![0x00u8, 0x01, b'a', b'b', 0x7f, 0x80, 0xff]);
    proptest::collection::vec(byte, 0..12)
}

/// Generates an arbitrary text key matching `[a-c]{0,6}`.
pub fn arb_text_key() -> impl Strategy<Value = String> {
    "[a-c]{0,6}"
}

/// Generates an arbitrary value of 0-63 random bytes.
pub fn arb_value() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..64)
}

/// Generates a set of up to `max` distinct non-empty text keys.
///
/// Keys are short lowercase strings, so prefix queries over them match a
/// meaningful share of the set.
pub fn arb_key_set(max: usize) -> impl Strategy<Value = BTreeSet<Vec<u8>>> {
    proptest::collection::btree_set("[a-d]{1,5}".prop_map(String::into_bytes), 0..=max)
}

/// Generates a scan direction.
pub fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Backward)]
}

/// Generates a read consistency level.
pub fn arb_consistency() -> impl Strategy<Value = ConsistencyLevel> {
    prop_oneof![
        Just(ConsistencyLevel::Any),
        Just(ConsistencyLevel::ReadYourWrites),
        Just(ConsistencyLevel::Strict),
    ]
}

/// Generates a batch mode.
pub fn arb_batch_mode() -> impl Strategy<Value = BatchMode> {
    prop_oneof![Just(BatchMode::Default), Just(BatchMode::NoAutoSubmit), Just(BatchMode::Single)]
}

/// Generates range bounds as `(prefix, start_key, end_key)`.
///
/// Each part is empty (unbounded) about a third of the time.
pub fn arb_range_bounds() -> impl Strategy<Value = (Vec<u8>, Vec<u8>, Vec<u8>)> {
    let bound = || prop_oneof![Just(Vec::new()), "[a-d]{1,3}".prop_map(String::into_bytes)];
    let prefix = prop_oneof![2 => Just(Vec::new()), 1 => "[a-d]{1,2}".prop_map(String::into_bytes)];
    (prefix, bound(), bound())
}

/// Generates an optional count budget; `None` means unlimited.
pub fn arb_count() -> impl Strategy<Value = Option<u64>> {
    prop_oneof![Just(None), (0u64..80).prop_map(Some)]
}

/// Generates a page granularity small enough to force several fetches.
pub fn arb_granularity() -> impl Strategy<Value = u32> {
    1u32..20
}
