//! Basic usage example demonstrating point operations, scans and sequences.
//!
//! Run: `cargo run --example basic_usage`
//!
//! This example shows:
//! - Client configuration
//! - Creating a quorum, database and table
//! - Reads and writes, including conditional writes
//! - Range scans in both directions
//! - Sequence allocation
//! - Error handling patterns
//!
//! It runs against the in-memory [`MockStore`], so no cluster is needed.

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods)]

use std::sync::Arc;

use shardkv_sdk::{Client, ClientConfig, ConsistencyLevel, RangeQuery, Result, mock::MockStore};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // -------------------------------------------------------------------------
    // 1. Create a client with configuration
    // -------------------------------------------------------------------------
    let config = ClientConfig::builder()
        .with_nodes(["127.0.0.1:7080", "127.0.0.2:7080"])
        .with_consistency(ConsistencyLevel::Strict)
        .build()?;

    let store = Arc::new(MockStore::new());
    let client = Client::new(config, store);

    // -------------------------------------------------------------------------
    // 2. Create the schema and select a table
    // -------------------------------------------------------------------------
    let quorum = client.create_quorum("main", &[100, 101, 102])?;
    let database = client.create_database("shop")?;
    database.create_table("customers", quorum)?;

    client.use_database("shop")?;
    client.use_table("customers")?;
    println!("Tables in shop: {:?}", database.tables()?);

    // -------------------------------------------------------------------------
    // 3. Point operations
    // -------------------------------------------------------------------------
    client.set("customer:1", "alice")?;
    client.set("customer:2", "bob")?;
    client.set("customer:3", "carol")?;

    let value = client.get("customer:1")?;
    println!("customer:1 = {:?}", value.as_deref().map(String::from_utf8_lossy));

    // Conditional writes report a test failure as `false`, not as an error
    let created = client.set_if_not_exists("customer:1", "mallory")?;
    println!("Overwrote existing customer: {created}");

    let swapped = client.test_and_set("customer:2", "bob", "robert")?;
    println!("Renamed bob: {swapped}");

    client.set("visits", "0")?;
    let visits = client.add("visits", 3)?;
    println!("Visits: {visits}");

    // -------------------------------------------------------------------------
    // 4. Range scans
    // -------------------------------------------------------------------------
    for (key, value) in client.key_value_iterator(RangeQuery::with_prefix("customer:"))? {
        println!("{} => {}", String::from_utf8_lossy(&key), String::from_utf8_lossy(&value));
    }

    let newest: Vec<_> =
        client.key_iterator(RangeQuery::with_prefix("customer:").backward().count(2))?.collect();
    println!("Two highest keys: {newest:?}");
    println!("Customers: {}", client.count(RangeQuery::with_prefix("customer:"))?);

    // -------------------------------------------------------------------------
    // 5. Sequences
    // -------------------------------------------------------------------------
    let ids = client.sequence("next_order_id")?;
    let first = ids.get()?;
    let second = ids.get()?;
    println!("Order ids: {first}, {second} ({} left in lease)", ids.remaining());

    // -------------------------------------------------------------------------
    // 6. Error handling
    // -------------------------------------------------------------------------
    match client.use_table("suppliers") {
        Ok(()) => println!("Unexpectedly found suppliers"),
        Err(err) => println!("Expected error: {err} (status {})", err.status()),
    }

    Ok(())
}
