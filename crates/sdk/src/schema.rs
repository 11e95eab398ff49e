//! Database and table handles.
//!
//! Handles bind operations to a resolved schema identifier, so they work
//! regardless of what the client currently has selected.

use std::sync::Arc;

use shardkv_types::{ConsistencyLevel, DatabaseId, Key, QuorumId, TableId};
use tracing::debug;

use crate::{
    client::{Client, schema_call},
    error::Result,
    operation::Operation,
    range::{KeyIterator, KeyValueIterator, RangeQuery},
    sequence::SequenceAllocator,
};

/// Handle to a database.
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    id: DatabaseId,
    name: String,
}

impl Database {
    pub(crate) fn new(client: Client, id: DatabaseId, name: String) -> Self {
        Self { client, id, name }
    }

    /// Database identifier.
    #[must_use]
    pub fn id(&self) -> DatabaseId {
        self.id
    }

    /// Database name as of the last rename through this handle.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to an existing table.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BadSchema`](crate::SdkError::BadSchema) if the table
    /// does not exist.
    pub fn table(&self, name: &str) -> Result<Table> {
        let id = self.client.table_id(self.id, name)?;
        Ok(Table::new(self.client.clone(), self.id, id, name.to_owned()))
    }

    /// Creates a table placed on `quorum`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the quorum does not exist.
    pub fn create_table(&self, name: &str, quorum: QuorumId) -> Result<Table> {
        let id = schema_call(self.client.transport().create_table(self.id, quorum, name), || {
            format!("create table '{name}' in database '{}'", self.name)
        })?;
        debug!(database = %self.id, table = name, id = %id, quorum = %quorum, "Created table");
        Ok(Table::new(self.client.clone(), self.id, id, name.to_owned()))
    }

    /// Lists table names.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn tables(&self) -> Result<Vec<String>> {
        schema_call(self.client.transport().list_tables(self.id), || {
            format!("database '{}' not found", self.name)
        })
    }

    /// Renames the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the call fails.
    pub fn rename(&mut self, name: &str) -> Result<()> {
        schema_call(self.client.transport().rename_database(self.id, name), || {
            format!("rename database '{}' to '{name}'", self.name)
        })?;
        self.client.rename_selected_database(self.id, name);
        debug!(database = %self.id, from = %self.name, to = name, "Renamed database");
        name.clone_into(&mut self.name);
        Ok(())
    }

    /// Deletes the database and every table in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn delete(self) -> Result<()> {
        let tables = self.tables()?;
        for table in &tables {
            if let Ok(id) = self.client.table_id(self.id, table) {
                self.client.forget_table(id);
            }
        }
        schema_call(self.client.transport().delete_database(self.id), || {
            format!("database '{}' not found", self.name)
        })?;
        self.client.forget_database(self.id);
        debug!(database = %self.id, name = %self.name, tables = tables.len(), "Deleted database");
        Ok(())
    }
}

/// Handle to a table.
///
/// Point operations follow the same batching rules as the unqualified
/// operations on [`Client`].
#[derive(Debug, Clone)]
pub struct Table {
    client: Client,
    database: DatabaseId,
    id: TableId,
    name: String,
}

impl Table {
    pub(crate) fn new(client: Client, database: DatabaseId, id: TableId, name: String) -> Self {
        Self { client, database, id, name }
    }

    /// Table identifier.
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Owning database identifier.
    #[must_use]
    pub fn database(&self) -> DatabaseId {
        self.database
    }

    /// Table name as of the last rename through this handle.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads a key. Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Vec<u8>>> {
        self.client.get_at(self.id, key.into())
    }

    /// Reads a key at `level` without changing the client-wide level.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn get_with_consistency(
        &self,
        key: impl Into<Key>,
        level: ConsistencyLevel,
    ) -> Result<Option<Vec<u8>>> {
        self.client.get_at_level(self.id, key.into(), level)
    }

    /// Reads a key, substituting `default` on any failure.
    pub fn get_or(&self, key: impl Into<Key>, default: impl AsRef<[u8]>) -> Vec<u8> {
        self.client.get_or_at(self.id, key.into(), default.as_ref())
    }

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn set(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<()> {
        self.client.write_at(self.id, Operation::set(key, value))
    }

    /// Writes a value only if the key is absent. Returns false if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn set_if_not_exists(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<bool> {
        self.client.conditional_at(self.id, Operation::set_if_not_exists(key, value))
    }

    /// Writes `value` only if the stored value equals `test`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn test_and_set(
        &self,
        key: impl Into<Key>,
        test: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<bool> {
        self.client.conditional_at(self.id, Operation::test_and_set(key, test, value))
    }

    /// Writes a value and returns the previous one, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn get_and_set(
        &self,
        key: impl Into<Key>,
        value: impl AsRef<[u8]>,
    ) -> Result<Option<Vec<u8>>> {
        self.client.get_and_set_at(self.id, key.into(), value.as_ref())
    }

    /// Adds `delta` to the decimal number stored at `key` and returns the sum.
    ///
    /// # Errors
    ///
    /// Returns a command error if the key is missing or not numeric.
    pub fn add(&self, key: impl Into<Key>, delta: i64) -> Result<i64> {
        self.client.add_at(self.id, key.into(), delta)
    }

    /// Appends bytes to the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn append(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<()> {
        self.client.write_at(self.id, Operation::append(key, value))
    }

    /// Deletes a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn delete(&self, key: impl Into<Key>) -> Result<()> {
        self.client.write_at(self.id, Operation::delete(key))
    }

    /// Deletes a key only if the stored value equals `test`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn test_and_delete(&self, key: impl Into<Key>, test: impl AsRef<[u8]>) -> Result<bool> {
        self.client.conditional_at(self.id, Operation::test_and_delete(key, test))
    }

    /// Counts the keys matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn count(&self, query: RangeQuery) -> Result<u64> {
        self.client.count_at(self.id, query)
    }

    /// Lazily iterates the keys matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if pending operations could not be sent.
    pub fn key_iterator(&self, query: RangeQuery) -> Result<KeyIterator> {
        self.client.key_iterator_at(self.id, query)
    }

    /// Lazily iterates the key-value pairs matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if pending operations could not be sent.
    pub fn key_value_iterator(&self, query: RangeQuery) -> Result<KeyValueIterator> {
        self.client.key_value_iterator_at(self.id, query)
    }

    /// Returns the shared allocator for the counter stored at `key`.
    pub fn sequence(&self, key: impl Into<Key>) -> Arc<SequenceAllocator> {
        self.client.sequence_at(self.id, key.into())
    }

    /// Renames the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the call fails.
    pub fn rename(&mut self, name: &str) -> Result<()> {
        schema_call(self.client.transport().rename_table(self.id, name), || {
            format!("rename table '{}' to '{name}'", self.name)
        })?;
        self.client.rename_selected_table(self.id, name);
        debug!(table = %self.id, from = %self.name, to = name, "Renamed table");
        name.clone_into(&mut self.name);
        Ok(())
    }

    /// Drops the table and every key in it.
    ///
    /// Cached sequence leases of the table are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn drop_table(self) -> Result<()> {
        schema_call(self.client.transport().delete_table(self.id), || {
            format!("table '{}' not found", self.name)
        })?;
        self.client.forget_table(self.id);
        debug!(table = %self.id, name = %self.name, "Deleted table");
        Ok(())
    }

    /// Removes every key of the table.
    ///
    /// Cached sequence leases of the table are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn truncate(&self) -> Result<()> {
        schema_call(self.client.transport().truncate_table(self.id), || {
            format!("table '{}' not found", self.name)
        })?;
        self.client.forget_sequences(self.id);
        debug!(table = %self.id, name = %self.name, "Truncated table");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use shardkv_types::StatusCode;

    use super::*;
    use crate::{ClientConfig, SdkError, mock::MockStore};

    fn client() -> (Arc<MockStore>, Client) {
        let store = Arc::new(MockStore::new());
        let config = ClientConfig::builder().with_node("localhost:7080").build().unwrap();
        (store.clone(), Client::new(config, store))
    }

    #[test]
    fn test_create_and_resolve() {
        let (_store, client) = client();
        let quorum = client.create_quorum("q1", &[1, 2, 3]).unwrap();
        let db = client.create_database("app").unwrap();
        let table = db.create_table("users", quorum).unwrap();

        assert_eq!(client.list_databases().unwrap(), vec!["app".to_owned()]);
        assert_eq!(client.list_quorums().unwrap(), vec!["q1".to_owned()]);
        assert_eq!(db.tables().unwrap(), vec!["users".to_owned()]);
        assert_eq!(client.database("app").unwrap().table("users").unwrap().id(), table.id());
    }

    #[test]
    fn test_duplicate_database_is_command_error() {
        let (_store, client) = client();
        client.create_database("app").unwrap();
        let err = client.create_database("app").unwrap_err();
        assert!(matches!(err, SdkError::Command { status: StatusCode::Failed, .. }));
    }

    #[test]
    fn test_missing_table() {
        let (store, client) = client();
        store.add_table("app", "users");
        let err = client.database("app").unwrap().table("orders").unwrap_err();
        assert!(matches!(err, SdkError::BadSchema { context } if context == "table 'orders' not found"));
    }

    #[test]
    fn test_table_point_operations() {
        let (store, client) = client();
        let id = store.add_table("app", "users");
        let table = client.database("app").unwrap().table("users").unwrap();

        table.set("alice", "1").unwrap();
        assert!(!table.set_if_not_exists("alice", "2").unwrap());
        assert!(table.test_and_set("alice", "1", "3").unwrap());
        assert!(!table.test_and_delete("alice", "1").unwrap());
        assert_eq!(table.get("alice").unwrap(), Some(b"3".to_vec()));
        assert_eq!(table.count(RangeQuery::new()).unwrap(), 1);
        assert_eq!(store.get_raw(id, b"alice"), Some(b"3".to_vec()));
    }

    #[test]
    fn test_table_read_at_explicit_level() {
        let (store, client) = client();
        store.add_table("app", "users");
        let table = client.database("app").unwrap().table("users").unwrap();
        table.set("alice", "1").unwrap();

        let value = table.get_with_consistency("alice", ConsistencyLevel::ReadYourWrites).unwrap();
        assert_eq!(value, Some(b"1".to_vec()));
        assert_eq!(table.get_with_consistency("bob", ConsistencyLevel::Any).unwrap(), None);
        assert_eq!(
            store.read_levels(),
            vec![ConsistencyLevel::ReadYourWrites, ConsistencyLevel::Any]
        );
        assert_eq!(client.consistency_level(), ConsistencyLevel::Strict);
    }

    #[test]
    fn test_truncate_resets_sequences() {
        let (store, client) = client();
        store.add_table("app", "ids");
        let table = client.database("app").unwrap().table("ids").unwrap();
        let seq = table.sequence("order");
        assert_eq!(seq.get().unwrap(), 1);
        assert_eq!(seq.get().unwrap(), 2);

        table.truncate().unwrap();
        let fresh = table.sequence("order");
        assert!(!Arc::ptr_eq(&seq, &fresh));
        assert_eq!(fresh.get().unwrap(), 1);
    }

    #[test]
    fn test_rename_and_drop_track_selection() {
        let (store, client) = client();
        store.add_table("app", "users");
        client.use_database("app").unwrap();
        client.use_table("users").unwrap();

        let mut table = client.database("app").unwrap().table("users").unwrap();
        table.rename("people").unwrap();
        assert_eq!(client.selected_table_name().as_deref(), Some("people"));

        table.drop_table().unwrap();
        assert_eq!(client.selected_table_name(), None);
        assert!(matches!(client.get("k").unwrap_err(), SdkError::BadSchema { .. }));

        let mut db = client.database("app").unwrap();
        db.rename("renamed").unwrap();
        assert_eq!(client.selected_database_name().as_deref(), Some("renamed"));
        db.delete().unwrap();
        assert_eq!(client.selected_database_name(), None);
        assert!(client.list_databases().unwrap().is_empty());
    }
}
