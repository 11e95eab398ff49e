//! Operations appended to a request batch.

use shardkv_types::{ConsistencyLevel, Key, TableId};

use crate::range::RangeQuery;

/// Fixed per-operation overhead counted against the batch limit: a kind tag
/// and the owning table identifier.
pub const OPERATION_OVERHEAD_BYTES: usize = 1 + 8;

/// One user-level request against a table.
///
/// Operations are immutable once appended to a batch. Keys and values are held
/// in their canonical byte form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Reads the value of a key.
    Get {
        /// Key to read.
        key: Vec<u8>,
    },
    /// Writes a value unconditionally.
    Set {
        /// Key to write.
        key: Vec<u8>,
        /// New value.
        value: Vec<u8>,
    },
    /// Writes a value only if the key does not exist yet.
    SetIfNotExists {
        /// Key to write.
        key: Vec<u8>,
        /// New value.
        value: Vec<u8>,
    },
    /// Writes a value only if the stored value equals `test`.
    TestAndSet {
        /// Key to write.
        key: Vec<u8>,
        /// Expected current value.
        test: Vec<u8>,
        /// New value.
        value: Vec<u8>,
    },
    /// Writes a value and returns the previous one.
    GetAndSet {
        /// Key to write.
        key: Vec<u8>,
        /// New value.
        value: Vec<u8>,
    },
    /// Parses the stored value as a decimal number and adds `delta` to it.
    Add {
        /// Key holding the number.
        key: Vec<u8>,
        /// Signed increment.
        delta: i64,
    },
    /// Appends bytes to the stored value.
    Append {
        /// Key to extend.
        key: Vec<u8>,
        /// Bytes to append.
        value: Vec<u8>,
    },
    /// Deletes a key.
    Delete {
        /// Key to delete.
        key: Vec<u8>,
    },
    /// Deletes a key only if the stored value equals `test`.
    TestAndDelete {
        /// Key to delete.
        key: Vec<u8>,
        /// Expected current value.
        test: Vec<u8>,
    },
    /// Lists keys in a range.
    ListKeys {
        /// Range parameters, including the continuation flag.
        query: RangeQuery,
    },
    /// Lists key-value pairs in a range.
    ListKeyValues {
        /// Range parameters, including the continuation flag.
        query: RangeQuery,
    },
    /// Counts keys in a range.
    Count {
        /// Range parameters.
        query: RangeQuery,
    },
}

impl Operation {
    /// Creates a read operation.
    pub fn get(key: impl Into<Key>) -> Self {
        Operation::Get { key: key.into().into_bytes() }
    }

    /// Creates an unconditional write.
    pub fn set(key: impl Into<Key>, value: impl AsRef<[u8]>) -> Self {
        Operation::Set { key: key.into().into_bytes(), value: value.as_ref().to_vec() }
    }

    /// Creates a write that only succeeds if the key is absent.
    pub fn set_if_not_exists(key: impl Into<Key>, value: impl AsRef<[u8]>) -> Self {
        Operation::SetIfNotExists { key: key.into().into_bytes(), value: value.as_ref().to_vec() }
    }

    /// Creates a compare-and-set write.
    pub fn test_and_set(
        key: impl Into<Key>,
        test: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Self {
        Operation::TestAndSet {
            key: key.into().into_bytes(),
            test: test.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        }
    }

    /// Creates a write that returns the previous value.
    pub fn get_and_set(key: impl Into<Key>, value: impl AsRef<[u8]>) -> Self {
        Operation::GetAndSet { key: key.into().into_bytes(), value: value.as_ref().to_vec() }
    }

    /// Creates a numeric increment.
    pub fn add(key: impl Into<Key>, delta: i64) -> Self {
        Operation::Add { key: key.into().into_bytes(), delta }
    }

    /// Creates an append.
    pub fn append(key: impl Into<Key>, value: impl AsRef<[u8]>) -> Self {
        Operation::Append { key: key.into().into_bytes(), value: value.as_ref().to_vec() }
    }

    /// Creates a delete.
    pub fn delete(key: impl Into<Key>) -> Self {
        Operation::Delete { key: key.into().into_bytes() }
    }

    /// Creates a compare-and-delete.
    pub fn test_and_delete(key: impl Into<Key>, test: impl AsRef<[u8]>) -> Self {
        Operation::TestAndDelete { key: key.into().into_bytes(), test: test.as_ref().to_vec() }
    }

    /// Short name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get { .. } => "get",
            Operation::Set { .. } => "set",
            Operation::SetIfNotExists { .. } => "set_if_not_exists",
            Operation::TestAndSet { .. } => "test_and_set",
            Operation::GetAndSet { .. } => "get_and_set",
            Operation::Add { .. } => "add",
            Operation::Append { .. } => "append",
            Operation::Delete { .. } => "delete",
            Operation::TestAndDelete { .. } => "test_and_delete",
            Operation::ListKeys { .. } => "list_keys",
            Operation::ListKeyValues { .. } => "list_key_values",
            Operation::Count { .. } => "count",
        }
    }

    /// Returns true for operations that do not modify the store.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Operation::Get { .. }
                | Operation::ListKeys { .. }
                | Operation::ListKeyValues { .. }
                | Operation::Count { .. }
        )
    }

    /// Returns true for operations whose per-entry FAILED status is an
    /// expected outcome rather than an error.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Operation::SetIfNotExists { .. }
                | Operation::TestAndSet { .. }
                | Operation::TestAndDelete { .. }
        )
    }

    /// Returns the key this operation targets, if it is a point operation.
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        match self {
            Operation::Get { key }
            | Operation::Set { key, .. }
            | Operation::SetIfNotExists { key, .. }
            | Operation::TestAndSet { key, .. }
            | Operation::GetAndSet { key, .. }
            | Operation::Add { key, .. }
            | Operation::Append { key, .. }
            | Operation::Delete { key }
            | Operation::TestAndDelete { key, .. } => Some(key),
            Operation::ListKeys { .. }
            | Operation::ListKeyValues { .. }
            | Operation::Count { .. } => None,
        }
    }

    /// Returns the number of bytes this operation contributes to a batch.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        let payload = match self {
            Operation::Get { key } | Operation::Delete { key } => key.len(),
            Operation::Set { key, value }
            | Operation::SetIfNotExists { key, value }
            | Operation::GetAndSet { key, value }
            | Operation::Append { key, value } => key.len() + value.len(),
            Operation::TestAndSet { key, test, value } => key.len() + test.len() + value.len(),
            Operation::TestAndDelete { key, test } => key.len() + test.len(),
            Operation::Add { key, .. } => key.len() + 8,
            Operation::ListKeys { query }
            | Operation::ListKeyValues { query }
            | Operation::Count { query } => query.serialized_size(),
        };
        OPERATION_OVERHEAD_BYTES + payload
    }
}

/// An operation bound to its table and the consistency level captured when it
/// was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Resolved table identifier.
    pub table: TableId,
    /// Consistency level in effect at append time. Only reads honor it.
    pub consistency: ConsistencyLevel,
    /// The operation itself.
    pub operation: Operation,
}

impl Command {
    /// Binds an operation to a table.
    #[must_use]
    pub fn new(table: TableId, consistency: ConsistencyLevel, operation: Operation) -> Self {
        Self { table, consistency, operation }
    }

    /// Returns the number of bytes this command contributes to a batch.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        self.operation.serialized_size()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_canonicalize_keys() {
        let from_text = Operation::set("key", "value");
        let from_bytes = Operation::set(b"key", b"value");
        assert_eq!(from_text, from_bytes);
    }

    #[test]
    fn test_serialized_size_set() {
        let op = Operation::set("key", "value");
        assert_eq!(op.serialized_size(), OPERATION_OVERHEAD_BYTES + 3 + 5);
    }

    #[test]
    fn test_serialized_size_test_and_set() {
        let op = Operation::test_and_set("k", "old", "new");
        assert_eq!(op.serialized_size(), OPERATION_OVERHEAD_BYTES + 1 + 3 + 3);
    }

    #[test]
    fn test_serialized_size_add_counts_delta() {
        let op = Operation::add("counter", -5);
        assert_eq!(op.serialized_size(), OPERATION_OVERHEAD_BYTES + 7 + 8);
    }

    #[test]
    fn test_classification() {
        assert!(Operation::get("k").is_read());
        assert!(!Operation::delete("k").is_read());
        assert!(Operation::test_and_delete("k", "v").is_conditional());
        assert!(!Operation::set("k", "v").is_conditional());
    }

    #[test]
    fn test_key_accessor() {
        assert_eq!(Operation::append("abc", "x").key(), Some(b"abc".as_slice()));
        let list = Operation::ListKeys { query: RangeQuery::new() };
        assert_eq!(list.key(), None);
        assert_eq!(list.name(), "list_keys");
    }
}
