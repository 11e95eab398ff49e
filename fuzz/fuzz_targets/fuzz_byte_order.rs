//! Fuzz target for key ordering and status decoding.
//!
//! Tests that `ByteOrder` is a total order consistent with lexicographic
//! byte comparison, that sorting in either direction yields a monotonic
//! sequence, and that status code decoding never panics.

#![no_main]

use std::cmp::Ordering;

use libfuzzer_sys::fuzz_target;

use shardkv_types::{ByteOrder, Direction, Key, StatusCode, status::status_name};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 4;
    let payload = &data[1..];

    match selector {
        0 => fuzz_compare(payload),
        1 => fuzz_sort(payload, Direction::Forward),
        2 => fuzz_sort(payload, Direction::Backward),
        _ => fuzz_status(payload),
    }
});

/// Splits input into keys at 0xff separators.
fn split_keys(data: &[u8]) -> Vec<Vec<u8>> {
    data.split(|byte| *byte == 0xff).map(<[u8]>::to_vec).collect()
}

fn fuzz_compare(data: &[u8]) {
    let mid = data.len() / 2;
    let (a, b) = data.split_at(mid);

    assert_eq!(ByteOrder::compare(a, b), a.cmp(b), "byte order disagrees with slice order");
    assert_eq!(
        ByteOrder::compare_directed(a, b, Direction::Backward),
        ByteOrder::compare(b, a),
        "backward order is not the reverse"
    );
    if a.starts_with(b) && a.len() > b.len() {
        assert_eq!(ByteOrder::compare(a, b), Ordering::Greater, "prefix must sort first");
    }

    // Lossy text rendering must not panic on arbitrary bytes
    let _ = Key::from(a).to_text_lossy();
}

fn fuzz_sort(data: &[u8], direction: Direction) {
    let mut keys = split_keys(data);
    ByteOrder::sort_keys(&mut keys, direction);
    for pair in keys.windows(2) {
        assert_ne!(
            ByteOrder::compare_directed(&pair[0], &pair[1], direction),
            Ordering::Greater,
            "sorted keys out of order"
        );
    }
}

fn fuzz_status(data: &[u8]) {
    let Some(bytes) = data.get(..4) else {
        return;
    };
    let code = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let _ = status_name(code);
    if let Some(status) = StatusCode::from_i32(code) {
        assert_eq!(status.as_i32(), code, "status roundtrip mismatch");
        assert_eq!(status.is_success(), code == 0, "only zero is success");
    }
}
