//! The seam between the operation engine and the remote store.
//!
//! Everything behind [`Transport`] is an external collaborator: wire format,
//! connection management, master/primary discovery and the enforcement of the
//! timeout tiers. The engine only builds [`Request`]s and interprets the
//! [`Response`]s.

use std::{fmt, time::Duration};

use shardkv_types::{DatabaseId, QuorumId, StatusCode, TableId, config::TimeoutConfig};

use crate::operation::Command;

/// One round trip's worth of commands, in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Commands in the order they were appended.
    pub commands: Vec<Command>,
}

impl Request {
    /// Creates a request from commands.
    #[must_use]
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Returns the summed serialized size of every command.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        self.commands.iter().map(Command::serialized_size).sum()
    }
}

/// One record of a response.
///
/// Point operations produce exactly one entry each, in request order. Range
/// listings produce one entry per listed key; count produces a single entry
/// whose `number` is the count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Key of the record.
    pub key: Vec<u8>,
    /// Value of the record; empty when the operation yields none.
    pub value: Vec<u8>,
    /// Per-entry command status.
    pub status: StatusCode,
    /// Numeric payload for `add` and `count`.
    pub number: Option<i64>,
}

impl Entry {
    /// Creates a successful entry without numeric payload.
    #[must_use]
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value, status: StatusCode::Success, number: None }
    }

    /// Creates an entry reporting `status` for `key`.
    #[must_use]
    pub fn with_status(key: Vec<u8>, status: StatusCode) -> Self {
        Self { key, value: Vec::new(), status, number: None }
    }
}

/// Exclusive handle to the response data held by the transport.
///
/// Released exactly once by the [`ResultCursor`](crate::ResultCursor) that owns
/// it.
pub trait ResponseHandle: Send + fmt::Debug {
    /// Frees the underlying resource.
    fn release(&mut self);
}

/// Handle with nothing behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandle;

impl ResponseHandle for NoopHandle {
    fn release(&mut self) {}
}

/// The transport's answer to one [`Request`].
#[derive(Debug)]
pub struct Response {
    /// Negative when no data was exchanged.
    pub transport_status: StatusCode,
    /// Negative when the remote store rejected the command as a whole.
    pub command_status: StatusCode,
    /// Response records.
    pub entries: Vec<Entry>,
    /// Round-trip time as measured by the transport.
    pub elapsed: Duration,
    /// Exclusive handle to the response data.
    pub handle: Box<dyn ResponseHandle>,
}

impl Response {
    /// A successful response with no entries and nothing to release.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            transport_status: StatusCode::Success,
            command_status: StatusCode::Success,
            entries: Vec::new(),
            elapsed: Duration::ZERO,
            handle: Box::new(NoopHandle),
        }
    }

    /// A response reporting a transport-level failure.
    #[must_use]
    pub fn transport_failure(status: StatusCode, handle: Box<dyn ResponseHandle>) -> Self {
        Self {
            transport_status: status,
            command_status: StatusCode::Success,
            entries: Vec::new(),
            elapsed: Duration::ZERO,
            handle,
        }
    }
}

/// Access to the remote clustered store.
///
/// Every method blocks the calling thread until a response, a timeout or a
/// connectivity failure. Implementations must be shareable across threads.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends all commands of `request` as one round trip.
    fn execute(&self, request: &Request) -> Response;

    /// Updates the timeout tiers enforced on subsequent calls.
    fn set_timeouts(&self, timeouts: &TimeoutConfig);

    /// Resolves a database name.
    fn database_id(&self, name: &str) -> Result<DatabaseId, StatusCode>;

    /// Resolves a table name within a database.
    fn table_id(&self, database: DatabaseId, name: &str) -> Result<TableId, StatusCode>;

    /// Creates a quorum over the given nodes.
    fn create_quorum(&self, name: &str, nodes: &[u64]) -> Result<QuorumId, StatusCode>;

    /// Creates a database.
    fn create_database(&self, name: &str) -> Result<DatabaseId, StatusCode>;

    /// Creates a table in `database`, placed on `quorum`.
    fn create_table(
        &self,
        database: DatabaseId,
        quorum: QuorumId,
        name: &str,
    ) -> Result<TableId, StatusCode>;

    /// Renames a database.
    fn rename_database(&self, database: DatabaseId, name: &str) -> Result<(), StatusCode>;

    /// Deletes a database and all its tables.
    fn delete_database(&self, database: DatabaseId) -> Result<(), StatusCode>;

    /// Renames a table.
    fn rename_table(&self, table: TableId, name: &str) -> Result<(), StatusCode>;

    /// Deletes a table.
    fn delete_table(&self, table: TableId) -> Result<(), StatusCode>;

    /// Removes every key of a table.
    fn truncate_table(&self, table: TableId) -> Result<(), StatusCode>;

    /// Lists database names.
    fn list_databases(&self) -> Result<Vec<String>, StatusCode>;

    /// Lists table names of a database.
    fn list_tables(&self, database: DatabaseId) -> Result<Vec<String>, StatusCode>;

    /// Lists quorum names.
    fn list_quorums(&self) -> Result<Vec<String>, StatusCode>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use shardkv_types::ConsistencyLevel;

    use super::*;
    use crate::operation::Operation;

    #[test]
    fn test_request_serialized_size_sums_commands() {
        let table = TableId::new(1);
        let request = Request::new(vec![
            Command::new(table, ConsistencyLevel::Strict, Operation::set("a", "1")),
            Command::new(table, ConsistencyLevel::Strict, Operation::delete("b")),
        ]);
        let expected = Operation::set("a", "1").serialized_size()
            + Operation::delete("b").serialized_size();
        assert_eq!(request.serialized_size(), expected);
    }

    #[test]
    fn test_empty_response_is_success() {
        let response = Response::empty();
        assert!(response.transport_status.is_success());
        assert!(response.command_status.is_success());
        assert!(response.entries.is_empty());
    }

    #[test]
    fn test_entry_with_status() {
        let entry = Entry::with_status(b"k".to_vec(), StatusCode::Failed);
        assert_eq!(entry.status, StatusCode::Failed);
        assert!(entry.value.is_empty());
        assert_eq!(entry.number, None);
    }
}
