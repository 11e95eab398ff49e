//! Test assertion helpers for ordered results.

use std::{cmp::Ordering, collections::HashSet};

use shardkv_types::{ByteOrder, Direction};

/// Asserts that `keys` are strictly ordered by [`ByteOrder`] in `direction`.
///
/// Strictness also proves there are no duplicates.
///
/// # Panics
///
/// Panics naming the first out-of-order position.
pub fn assert_byte_ordered<K: AsRef<[u8]>>(keys: &[K], direction: Direction) {
    for (index, pair) in keys.windows(2).enumerate() {
        let ordering = ByteOrder::compare_directed(pair[0].as_ref(), pair[1].as_ref(), direction);
        assert_eq!(
            ordering,
            Ordering::Less,
            "keys at {index} and {} are not strictly {direction:?}-ordered: {:?} then {:?}",
            index + 1,
            pair[0].as_ref(),
            pair[1].as_ref()
        );
    }
}

/// Asserts that `values` contains no duplicates.
///
/// # Panics
///
/// Panics naming the first repeated value.
pub fn assert_unique<T: std::hash::Hash + Eq + std::fmt::Debug>(values: &[T]) {
    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        assert!(seen.insert(value), "duplicate value {value:?}");
    }
}
