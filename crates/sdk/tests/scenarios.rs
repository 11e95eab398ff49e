//! Behavioral tests for the client against the in-memory store.
//!
//! ## Test Categories
//!
//! - **Batching**: ordering, empty submits, modes, scoped batches
//! - **Conditional writes**: set-if-not-exists, test-and-set, test-and-delete
//! - **Range scans**: paging, count budget, direction, failures
//! - **Sequences**: reset, contiguity, sharing across threads
//! - **Resources**: every response handle is released

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]

use std::{sync::Arc, thread};

use shardkv_sdk::{
    Appended, BatchConfig, BatchMode, Client, ClientConfig, Direction, Operation, RangeQuery,
    ScanConfig, SdkError, StatusCode, TableId, mock::MockStore,
};
use shardkv_test_utils::{
    TEST_NODE, assert_byte_ordered, assert_unique, test_batch_config, test_scan_config,
    test_sequence_config, test_timeout_config,
};

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn connect(store: &Arc<MockStore>, scan: ScanConfig, batch: BatchConfig) -> Client {
    init_tracing();
    let config = ClientConfig::builder()
        .with_node(TEST_NODE)
        .with_timeouts(test_timeout_config())
        .with_batch(batch)
        .with_scan(scan)
        .with_sequence(test_sequence_config())
        .build()
        .unwrap();
    let client = Client::new(config, store.clone());
    client.use_database("db").unwrap();
    client.use_table("table").unwrap();
    client
}

fn setup() -> (Arc<MockStore>, TableId, Client) {
    let store = Arc::new(MockStore::new());
    let table = store.add_table("db", "table");
    let client = connect(&store, test_scan_config(), test_batch_config());
    (store, table, client)
}

fn fill(store: &MockStore, table: TableId, count: usize) -> Vec<Vec<u8>> {
    let keys: Vec<_> = (0..count).map(|i| format!("key{i:04}").into_bytes()).collect();
    for key in &keys {
        store.put_raw(table, key, b"v");
    }
    keys
}

// ============================================================================
// Batching
// ============================================================================

#[test]
fn test_batch_entries_match_append_order() {
    let (store, _table, client) = setup();
    client.set("exists", "x").unwrap();

    client.begin();
    let operations = vec![
        Operation::set("a", "1"),
        Operation::get("exists"),
        Operation::set_if_not_exists("exists", "y"),
        Operation::get("missing"),
        Operation::delete("a"),
    ];
    for operation in operations {
        assert!(matches!(client.append_operation(operation).unwrap(), Appended::Queued));
    }

    let mut result = client.submit().unwrap();
    let expected = [
        (b"a".as_slice(), StatusCode::Success),
        (b"exists".as_slice(), StatusCode::Success),
        (b"exists".as_slice(), StatusCode::Failed),
        (b"missing".as_slice(), StatusCode::Failed),
        (b"a".as_slice(), StatusCode::Success),
    ];
    result.begin().unwrap();
    for (key, status) in expected {
        assert_eq!(result.key(), Some(key));
        assert_eq!(result.entry_status(), Some(status));
        result.next().unwrap();
    }
    assert!(result.is_end());
    result.close();
    assert_eq!(store.request_count(), 2);
}

#[test]
fn test_empty_submit_is_noop() {
    let (store, _table, client) = setup();
    client.begin();
    let mut result = client.submit().unwrap();
    assert!(result.transport_status().is_success());
    assert!(result.command_status().is_success());
    assert!(result.is_end());
    result.close();
    assert_eq!(store.request_count(), 0);
}

#[test]
fn test_set_then_add_in_batch() {
    let (_store, _table, client) = setup();
    client.begin();
    client.set("a", "0").unwrap();
    client.add("a", 10).unwrap();
    client.submit().unwrap().close();
    assert_eq!(client.get("a").unwrap(), Some(b"10".to_vec()));
}

#[test]
fn test_cancel_discards_pending_writes() {
    let (store, table, client) = setup();
    client.begin();
    client.set("a", "1").unwrap();
    client.rollback();
    client.submit().unwrap().close();
    assert_eq!(store.get_raw(table, b"a"), None);
    assert_eq!(store.request_count(), 0);
}

#[test]
fn test_default_mode_flushes_when_limit_reached() {
    let store = Arc::new(MockStore::new());
    let table = store.add_table("db", "table");
    let one = Operation::set("k00", "v").serialized_size();
    let batch = BatchConfig::builder().limit_bytes(one * 3).build().unwrap();
    let client = connect(&store, test_scan_config(), batch);

    client.begin();
    for i in 0..7 {
        client.set(format!("k{i:02}"), "v").unwrap();
    }
    // two automatic flushes of three, one pending
    assert_eq!(store.request_count(), 2);
    assert_eq!(client.pending_operations(), 1);
    client.submit().unwrap().close();
    assert_eq!(store.row_count(table), 7);
}

#[test]
fn test_failed_limit_flush_drops_the_write() {
    let store = Arc::new(MockStore::new());
    let table = store.add_table("db", "table");
    let one = Operation::set("a", "1").serialized_size();
    let batch = BatchConfig::builder().limit_bytes(one).build().unwrap();
    let client = connect(&store, test_scan_config(), batch);

    client.begin();
    client.set("a", "1").unwrap();
    store.fail_next(1, StatusCode::NoConnection);
    assert!(client.set("b", "2").unwrap_err().is_connectivity());
    assert_eq!(client.pending_operations(), 0);

    client.submit().unwrap().close();
    assert_eq!(store.get_raw(table, b"b"), None);
    assert_eq!(store.outstanding_handles(), 0);
}

#[test]
fn test_no_auto_submit_refuses_overflow() {
    let store = Arc::new(MockStore::new());
    store.add_table("db", "table");
    let one = Operation::set("k0", "v").serialized_size();
    let batch =
        BatchConfig::builder().mode(BatchMode::NoAutoSubmit).limit_bytes(one * 2).build().unwrap();
    let client = connect(&store, test_scan_config(), batch);

    client.begin();
    client.set("k0", "v").unwrap();
    client.set("k1", "v").unwrap();
    let err = client.set("k2", "v").unwrap_err();
    assert!(matches!(err, SdkError::BatchLimitExceeded { .. }));
    assert_eq!(err.status(), StatusCode::ApiError);
    assert_eq!(client.pending_operations(), 2);
    assert_eq!(store.request_count(), 0);

    let mut result = client.submit().unwrap();
    assert_eq!(result.remaining(), 2);
    result.close();
}

#[test]
fn test_single_mode_sends_each_write() {
    let (store, table, client) = setup();
    client.set_batch_mode(BatchMode::Single);
    client.begin();
    client.set("a", "1").unwrap();
    client.set("b", "2").unwrap();
    assert_eq!(store.request_count(), 2);
    assert_eq!(store.get_raw(table, b"b"), Some(b"2".to_vec()));
    client.submit().unwrap().close();
    assert_eq!(store.request_count(), 2);
}

#[test]
fn test_guard_submits_on_drop() {
    let (store, table, client) = setup();
    {
        let _guard = client.begin_guard();
        client.set("a", "1").unwrap();
        client.set("b", "2").unwrap();
        assert_eq!(store.request_count(), 0);
    }
    assert_eq!(store.request_count(), 1);
    assert_eq!(store.get_raw(table, b"a"), Some(b"1".to_vec()));
    assert_eq!(store.outstanding_handles(), 0);
}

#[test]
fn test_guard_cancel_sends_nothing() {
    let (store, table, client) = setup();
    let guard = client.begin_guard();
    client.set("a", "1").unwrap();
    guard.cancel();
    assert_eq!(store.request_count(), 0);
    assert_eq!(store.get_raw(table, b"a"), None);
}

#[test]
fn test_submit_failure_is_connectivity_error() {
    let (store, _table, client) = setup();
    client.begin();
    client.set("a", "1").unwrap();
    store.fail_next(1, StatusCode::NoMaster);
    let err = client.submit().unwrap_err();
    assert!(err.is_connectivity());
    assert_eq!(err.status(), StatusCode::NoMaster);
    assert!(err.to_string().starts_with("SDBP_NOMASTER (code -201)"));
    assert_eq!(store.outstanding_handles(), 0);
}

// ============================================================================
// Conditional writes and reads
// ============================================================================

#[test]
fn test_set_if_not_exists_keeps_existing_value() {
    let (store, table, client) = setup();
    client.set("k", "v0").unwrap();
    assert!(!client.set_if_not_exists("k", "v1").unwrap());
    assert_eq!(store.get_raw(table, b"k"), Some(b"v0".to_vec()));
    assert!(client.set_if_not_exists("fresh", "v1").unwrap());
}

#[test]
fn test_test_and_set_requires_match() {
    let (store, table, client) = setup();
    client.set("k", "current").unwrap();
    assert!(!client.test_and_set("k", "old", "new").unwrap());
    assert_eq!(store.get_raw(table, b"k"), Some(b"current".to_vec()));
    assert!(client.test_and_set("k", "current", "new").unwrap());
    assert_eq!(store.get_raw(table, b"k"), Some(b"new".to_vec()));
}

#[test]
fn test_test_and_delete_requires_match() {
    let (store, table, client) = setup();
    client.set("k", "v").unwrap();
    assert!(!client.test_and_delete("k", "other").unwrap());
    assert!(client.test_and_delete("k", "v").unwrap());
    assert_eq!(store.get_raw(table, b"k"), None);
}

#[test]
fn test_missing_key_is_not_an_error() {
    let (_store, _table, client) = setup();
    assert_eq!(client.get("missing").unwrap(), None);
    assert_eq!(client.get_and_set("missing", "v").unwrap(), None);
    assert_eq!(client.get("missing").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_get_or_never_fails() {
    let (store, _table, client) = setup();
    client.set("k", "v").unwrap();
    assert_eq!(client.get_or("k", "d"), b"v".to_vec());
    assert_eq!(client.get_or("missing", "d"), b"d".to_vec());
    store.fail_next(1, StatusCode::GlobalTimeout);
    assert_eq!(client.get_or("k", "d"), b"d".to_vec());
}

#[test]
fn test_binary_and_text_keys_are_interchangeable() {
    let (_store, _table, client) = setup();
    client.set(b"\xffraw".as_slice(), [0u8, 1, 2]).unwrap();
    client.set("text", "value").unwrap();
    assert_eq!(client.get(b"\xffraw".to_vec()).unwrap(), Some(vec![0, 1, 2]));
    assert_eq!(client.get(b"text").unwrap(), Some(b"value".to_vec()));
}

// ============================================================================
// Range scans
// ============================================================================

#[test]
fn test_250_keys_fetch_three_pages() {
    let store = Arc::new(MockStore::new());
    let table = store.add_table("db", "table");
    let expected = fill(&store, table, 250);
    let client = connect(&store, ScanConfig::default(), test_batch_config());

    let mut iter = client.key_iterator(RangeQuery::new()).unwrap();
    let keys: Vec<_> = iter.by_ref().collect();
    assert_eq!(keys, expected);
    assert_eq!(iter.fetches(), 3);
    assert_eq!(store.request_count(), 3);
}

#[test]
fn test_forward_and_backward_scans() {
    let (store, table, client) = setup();
    fill(&store, table, 35);
    store.put_raw(table, b"other", b"v");

    let forward: Vec<_> = client.key_iterator(RangeQuery::with_prefix("key")).unwrap().collect();
    assert_eq!(forward.len(), 35);
    assert_byte_ordered(&forward, Direction::Forward);

    let backward: Vec<_> =
        client.key_iterator(RangeQuery::with_prefix("key").backward()).unwrap().collect();
    assert_byte_ordered(&backward, Direction::Backward);
    let mut reversed = backward.clone();
    reversed.reverse();
    assert_eq!(reversed, forward);
}

#[test]
fn test_scan_bounds() {
    let (store, table, client) = setup();
    fill(&store, table, 50);
    let keys: Vec<_> = client
        .key_iterator(RangeQuery::new().start_key("key0010").end_key("key0020"))
        .unwrap()
        .collect();
    let expected: Vec<_> = (10..20).map(|i| format!("key{i:04}").into_bytes()).collect();
    assert_eq!(keys, expected);

    let keys: Vec<_> = client
        .key_iterator(RangeQuery::new().start_key("key0020").end_key("key0010").backward())
        .unwrap()
        .collect();
    let expected: Vec<_> = (11..=20).rev().map(|i| format!("key{i:04}").into_bytes()).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_count_budget_across_pages() {
    let (store, table, client) = setup();
    fill(&store, table, 100);
    let keys: Vec<_> = client.key_iterator(RangeQuery::new().count(25)).unwrap().collect();
    assert_eq!(keys.len(), 25);
    // pages of 10, 10, 5
    assert_eq!(store.request_count(), 3);
}

#[test]
fn test_key_values_and_count() {
    let (_store, _table, client) = setup();
    for i in 0..12 {
        client.set(format!("user:{i:02}"), format!("name{i}")).unwrap();
    }
    client.set("zzz", "other").unwrap();

    let pairs: Vec<_> =
        client.key_value_iterator(RangeQuery::with_prefix("user:")).unwrap().collect();
    assert_eq!(pairs.len(), 12);
    assert_eq!(pairs[3], (b"user:03".to_vec(), b"name3".to_vec()));
    assert_eq!(client.count(RangeQuery::with_prefix("user:")).unwrap(), 12);
    assert_eq!(client.count(RangeQuery::new()).unwrap(), 13);
}

#[test]
fn test_scan_sees_pending_writes() {
    let (_store, _table, client) = setup();
    client.begin();
    client.set("a", "1").unwrap();
    client.set("b", "2").unwrap();
    let keys: Vec<_> = client.key_iterator(RangeQuery::new()).unwrap().collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    client.submit().unwrap().close();
}

#[test]
fn test_scan_failure_ends_iteration() {
    let (store, table, client) = setup();
    fill(&store, table, 30);
    let mut iter = client.key_iterator(RangeQuery::new()).unwrap();
    assert_eq!(iter.by_ref().take(10).count(), 10);
    store.fail_next(1, StatusCode::PrimaryTimeout);
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next(), None);
    assert!(iter.last_error().unwrap().is_timeout());
    assert_eq!(store.outstanding_handles(), 0);
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_sequence_reset_and_contiguity() {
    let (_store, _table, client) = setup();
    let seq = client.sequence("ids").unwrap();
    for _ in 0..7 {
        seq.get().unwrap();
    }
    seq.reset().unwrap();
    let values: Vec<u64> = (0..25).map(|_| seq.get().unwrap()).collect();
    assert_eq!(values, (1..=25).collect::<Vec<_>>());
}

#[test]
fn test_sequence_shared_across_threads() {
    let (_store, _table, client) = setup();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            thread::spawn(move || {
                let seq = client.sequence("ids").unwrap();
                (0..40).map(|_| seq.get().unwrap()).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    assert_unique(&all);
    all.sort_unstable();
    assert_eq!(all, (1..=160).collect::<Vec<_>>());
}

#[test]
fn test_sequence_lost_lease_leaves_gap() {
    let store = Arc::new(MockStore::new());
    store.add_table("db", "table");

    let first = connect(&store, test_scan_config(), test_batch_config());
    let seq = first.sequence("ids").unwrap();
    assert_eq!(seq.get().unwrap(), 1);
    drop(seq);
    drop(first);

    // a new process gets a fresh lease after the abandoned one
    let second = connect(&store, test_scan_config(), test_batch_config());
    let seq = second.sequence("ids").unwrap();
    assert_eq!(seq.get().unwrap(), 11);
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_every_handle_released() {
    let (store, table, client) = setup();
    fill(&store, table, 40);
    client.begin();
    client.set("a", "1").unwrap();
    client.set("b", "2").unwrap();
    client.submit().unwrap().close();
    let _ = client.get("a").unwrap();
    let _ = client.set_if_not_exists("a", "x").unwrap();
    let _ = client.count(RangeQuery::new()).unwrap();
    let _: Vec<_> = client.key_value_iterator(RangeQuery::new()).unwrap().collect();
    let seq = client.sequence("ids").unwrap();
    let _ = seq.get().unwrap();
    {
        let _guard = client.begin_guard();
        client.delete("a").unwrap();
    }
    assert_eq!(store.outstanding_handles(), 0);
}
