//! Batching example.
//!
//! Run: `cargo run --example batch_operations`
//!
//! This example shows:
//! - Explicit `begin`/`submit` batches and per-entry statuses
//! - Scoped batches that submit on drop
//! - Batch modes and the size limit

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods)]

use std::sync::Arc;

use shardkv_sdk::{
    Appended, BatchConfig, BatchMode, Client, ClientConfig, Operation, Result, SdkError,
    mock::MockStore,
};

fn main() -> Result<()> {
    let store = Arc::new(MockStore::new());
    store.add_table("inventory", "items");

    let config = ClientConfig::builder()
        .with_node("127.0.0.1:7080")
        .with_batch(BatchConfig::builder().limit_bytes(256).build()?)
        .build()?;
    let client = Client::new(config, store.clone());
    client.use_database("inventory")?;
    client.use_table("items")?;

    // -------------------------------------------------------------------------
    // 1. One round trip for many writes
    // -------------------------------------------------------------------------
    client.begin();
    for i in 0..5 {
        client.set(format!("item:{i}"), format!("{}", i * 10))?;
    }
    let mut result = client.submit()?;
    result.begin()?;
    while !result.is_end() {
        println!(
            "{} -> {:?}",
            String::from_utf8_lossy(result.key().unwrap_or_default()),
            result.entry_status()
        );
        result.next()?;
    }
    result.close();
    println!("Requests so far: {}", store.request_count());

    // -------------------------------------------------------------------------
    // 2. Positional form: entries match appended operations by index
    // -------------------------------------------------------------------------
    client.begin();
    let _ = client.append_operation(Operation::set_if_not_exists("item:0", "0"))?;
    let _ = client.append_operation(Operation::set_if_not_exists("item:9", "90"))?;
    let mut result = client.submit()?;
    for name in ["item:0", "item:9"] {
        println!("{name} created: {}", result.is_conditional_success());
        result.next()?;
    }
    result.close();

    // -------------------------------------------------------------------------
    // 3. Scoped batch
    // -------------------------------------------------------------------------
    {
        let _batch = client.begin_guard();
        client.delete("item:1")?;
        client.delete("item:2")?;
    }
    println!("item:1 after scoped delete: {:?}", client.get("item:1")?);

    // -------------------------------------------------------------------------
    // 4. Refusing to grow past the limit
    // -------------------------------------------------------------------------
    client.set_batch_mode(BatchMode::NoAutoSubmit);
    client.begin();
    loop {
        match client.append_operation(Operation::append("log", "entry;")) {
            Ok(Appended::Queued) => {},
            Ok(_) => unreachable!("no auto submit never flushes"),
            Err(err @ SdkError::BatchLimitExceeded { .. }) => {
                println!("Stopped at {} operations: {err}", client.pending_operations());
                break;
            },
            Err(err) => return Err(err),
        }
    }
    client.submit()?.close();
    println!("log = {:?}", client.get("log")?.map(|v| v.len()));

    Ok(())
}
