//! Fuzz target for paginated range scans.
//!
//! Builds a table from arbitrary keys, runs a scan with arbitrary bounds,
//! direction, count budget and page granularity against the in-memory store,
//! and checks that every matching key is returned exactly once, in order.

#![no_main]

use std::{collections::BTreeSet, sync::Arc};

use libfuzzer_sys::fuzz_target;

use shardkv_sdk::{
    ByteOrder, Client, ClientConfig, Direction, RangeQuery, ScanConfig, mock::MockStore,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let granularity = u32::from(data[0] % 16) + 1;
    let direction = if data[1] & 1 == 0 { Direction::Forward } else { Direction::Backward };
    let count = (data[1] & 2 != 0).then_some(u64::from(data[2] % 32));

    // Fields separated by 0xfe: prefix, start, end, then keys split at 0xff
    let mut fields = data[3..].splitn(4, |byte| *byte == 0xfe);
    let prefix = fields.next().unwrap_or_default().to_vec();
    let start = fields.next().unwrap_or_default().to_vec();
    let end = fields.next().unwrap_or_default().to_vec();
    let keys: BTreeSet<Vec<u8>> = fields
        .next()
        .unwrap_or_default()
        .split(|byte| *byte == 0xff)
        .map(<[u8]>::to_vec)
        .collect();

    let store = Arc::new(MockStore::new());
    let table = store.add_table("fuzz", "table");
    for key in &keys {
        store.put_raw(table, key, b"");
    }

    let Ok(scan) = ScanConfig::builder().page_granularity(granularity).build() else {
        return;
    };
    let Ok(config) = ClientConfig::builder().with_node("127.0.0.1:7080").with_scan(scan).build()
    else {
        return;
    };
    let client = Client::new(config, store.clone());
    if client.use_database("fuzz").and_then(|()| client.use_table("table")).is_err() {
        return;
    }

    let mut query =
        RangeQuery::new().prefix(prefix).start_key(start).end_key(end).direction(direction);
    if let Some(count) = count {
        query = query.count(count);
    }

    let mut expected: Vec<Vec<u8>> = keys.iter().filter(|key| query.matches(key)).cloned().collect();
    ByteOrder::sort_keys(&mut expected, direction);
    if let Some(count) = count {
        expected.truncate(count as usize);
    }

    let Ok(iter) = client.key_iterator(query) else {
        return;
    };
    let actual: Vec<Vec<u8>> = iter.collect();
    assert_eq!(actual, expected, "scan result mismatch");
    assert_eq!(store.outstanding_handles(), 0, "response handle leaked");
});
