//! Client-side operation engine for the shardkv clustered key-value store.
//!
//! This SDK turns user calls (point reads and writes, conditional writes,
//! numeric increments, range scans, sequences) into ordered requests against
//! the remote store, and turns its responses back into typed, paginated and
//! consistently ordered results.
//!
//! # Features
//!
//! - **Batching**: operations between `begin` and `submit` travel in one round trip
//! - **Deterministic order**: range results are sorted client-side by [`ByteOrder`]
//! - **Pagination**: lazy range iterators re-query as local pages run out
//! - **Sequences**: leased counters hand out integers without a round trip per value
//! - **Explicit release**: every [`ResultCursor`] releases its response handle exactly once
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shardkv_sdk::{Client, ClientConfig, RangeQuery, mock::MockStore};
//!
//! # fn main() -> shardkv_sdk::Result<()> {
//! let store = Arc::new(MockStore::new());
//! store.add_table("app", "users");
//!
//! let config = ClientConfig::builder().with_node("localhost:7080").build()?;
//! let client = Client::new(config, store);
//! client.use_database("app")?;
//! client.use_table("users")?;
//!
//! client.set("user:1", "alice")?;
//! let created = client.set_if_not_exists("user:1", "bob")?;
//! assert!(!created);
//!
//! for key in client.key_iterator(RangeQuery::with_prefix("user:"))? {
//!     println!("{}", String::from_utf8_lossy(&key));
//! }
//!
//! let ids = client.sequence("next_user_id")?;
//! let id = ids.get()?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Client / Database / Table                │
//! │  point ops │ begin/submit │ iterators │ sequence()          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RequestBatch          │ RangeScan         │ SequenceAllocator│
//! │  modes, size limit     │ paging, ByteOrder │ leases, cache    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Dispatcher + ResultCursor                 │
//! │   one round trip per request │ status checks │ release      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Transport (external)                      │
//! │   wire format │ discovery │ timeout tiers │ MockStore       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod client;
mod config;
mod cursor;
mod error;
mod metrics;
pub mod mock;
mod operation;
mod range;
mod schema;
mod sequence;
mod transport;

// Public API exports
pub use batch::{Appended, BatchGuard, RequestBatch};
pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use cursor::ResultCursor;
pub use error::{Result, SdkError};
pub use metrics::{FlushReason, MetricsSdkMetrics, NoopSdkMetrics, SdkMetrics};
pub use operation::{Command, OPERATION_OVERHEAD_BYTES, Operation};
pub use range::{KeyIterator, KeyValueIterator, RangeQuery};
pub use schema::{Database, Table};
pub use sequence::{SequenceAllocator, SequenceCache};
pub use transport::{Entry, NoopHandle, Request, Response, ResponseHandle, Transport};

// Re-export commonly used types from shardkv-types
pub use shardkv_types::{
    BatchMode, ByteOrder, ConsistencyLevel, DatabaseId, Direction, Key, QuorumId, StatusClass,
    StatusCode, TableId,
    config::{BatchConfig, ScanConfig, SequenceConfig, TimeoutConfig},
};
