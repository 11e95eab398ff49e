//! Main `Client` implementation.
//!
//! Provides the high-level API over the operation engine: point operations,
//! batching, range scans, sequences, read consistency, timeouts and schema
//! selection. Every remote call is blocking.

use std::{sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use shardkv_types::{
    BatchMode, ConsistencyLevel, DatabaseId, Key, QuorumId, StatusCode, TableId,
    config::TimeoutConfig,
};
use tracing::debug;

use crate::{
    batch::{Appended, BatchGuard, Dispatcher, RequestBatch},
    config::ClientConfig,
    cursor::ResultCursor,
    error::{BadSchemaSnafu, CommandSnafu, Result, SdkError},
    metrics::FlushReason,
    operation::{Command, Operation},
    range::{KeyIterator, KeyValueIterator, RangeQuery},
    schema::Database,
    sequence::{SequenceAllocator, SequenceCache},
    transport::{Entry, Transport},
};

/// Currently selected database and table.
#[derive(Debug, Clone, Default)]
struct Selection {
    database: Option<(DatabaseId, String)>,
    table: Option<(TableId, String)>,
}

#[derive(Debug)]
struct ClientInner {
    config: ClientConfig,
    dispatcher: Dispatcher,
    batch: Mutex<RequestBatch>,
    consistency: RwLock<ConsistencyLevel>,
    timeouts: Mutex<TimeoutConfig>,
    selection: RwLock<Selection>,
    sequences: SequenceCache,
}

/// Client for a shardkv cluster.
///
/// Cheap to clone: clones share the batch, the selected schema, the read
/// consistency level and the sequence cache.
///
/// # Batching
///
/// Without [`begin`](Self::begin) every operation is sent alone. Between
/// `begin` and [`submit`](Self::submit), operations that return nothing
/// (`set`, `append`, `delete`) are queued and sent together. Operations that
/// return a value first send whatever is queued, then run alone, so their
/// value is available immediately.
///
/// A client must not begin a second batch while one is pending; `begin`
/// discards any pending operations.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use shardkv_sdk::{Client, ClientConfig, mock::MockStore};
/// # fn example() -> shardkv_sdk::Result<()> {
/// let config = ClientConfig::builder().with_node("localhost:7080").build()?;
/// let store = Arc::new(MockStore::new());
/// store.add_table("app", "users");
/// let client = Client::new(config, store);
///
/// client.use_database("app")?;
/// client.use_table("users")?;
///
/// client.begin();
/// client.set("alice", "1")?;
/// client.set("bob", "2")?;
/// client.submit()?.close();
///
/// assert_eq!(client.get("alice")?, Some(b"1".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client over `transport`.
    ///
    /// The configured timeout tiers are forwarded to the transport right away.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        transport.set_timeouts(config.timeouts());
        let dispatcher = Dispatcher::new(transport, Arc::clone(config.metrics()));
        let batch = RequestBatch::new(dispatcher.clone(), config.batch());
        debug!(nodes = ?config.nodes(), consistency = %config.consistency(), "Created client");

        Self {
            inner: Arc::new(ClientInner {
                consistency: RwLock::new(config.consistency()),
                timeouts: Mutex::new(config.timeouts().clone()),
                batch: Mutex::new(batch),
                selection: RwLock::new(Selection::default()),
                sequences: SequenceCache::new(),
                dispatcher,
                config,
            }),
        }
    }

    /// Returns the configuration the client was created with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // =========================================================================
    // Batch control
    // =========================================================================

    /// Discards pending operations and starts a new batch.
    pub fn begin(&self) {
        self.inner.batch.lock().begin();
    }

    /// Starts a batch that is submitted when the returned guard is dropped.
    pub fn begin_guard(&self) -> BatchGuard {
        self.begin();
        BatchGuard::new(self.clone())
    }

    /// Sends every pending operation as one round trip.
    ///
    /// The returned cursor holds one entry per queued operation, in queue
    /// order, and must be closed. Submitting an empty batch sends nothing.
    ///
    /// # Errors
    ///
    /// Returns a connectivity or timeout error if the round trip failed; the
    /// outcome of the individual operations is unknown in that case.
    pub fn submit(&self) -> Result<ResultCursor> {
        self.submit_with(FlushReason::Explicit)
    }

    pub(crate) fn submit_with(&self, reason: FlushReason) -> Result<ResultCursor> {
        let cursor = self.inner.batch.lock().submit_with(reason);
        checked(cursor, "submit")
    }

    /// Discards pending operations without sending them.
    pub fn cancel(&self) {
        self.inner.batch.lock().cancel();
    }

    /// Alias of [`cancel`](Self::cancel).
    pub fn rollback(&self) {
        self.cancel();
    }

    /// Returns true between `begin` and the next `submit`/`cancel`.
    #[must_use]
    pub fn is_batch_open(&self) -> bool {
        self.inner.batch.lock().is_open()
    }

    /// Number of queued operations.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.inner.batch.lock().len()
    }

    /// Appends a raw operation against the selected table.
    ///
    /// This is the positional, status-returning form: queued operations yield
    /// their entries from the cursor returned by [`submit`](Self::submit), in
    /// append order. Without an open batch the operation is sent alone and
    /// its result returned as [`Appended::Submitted`].
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BadSchema`] without a selected table and
    /// [`SdkError::BatchLimitExceeded`] when a `NoAutoSubmit` batch is full.
    pub fn append_operation(&self, operation: Operation) -> Result<Appended> {
        let table = self.selected_table()?;
        let command = self.command(table, operation);
        let mut batch = self.inner.batch.lock();
        if batch.is_open() {
            batch.append(command)
        } else {
            Ok(Appended::Submitted(self.inner.dispatcher.submit_one(command)))
        }
    }

    // =========================================================================
    // Point operations on the selected table
    // =========================================================================

    /// Reads a key. Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Vec<u8>>> {
        self.get_at(self.selected_table()?, key.into())
    }

    /// Reads a key at `level`, leaving the client-wide level untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn get_with_consistency(
        &self,
        key: impl Into<Key>,
        level: ConsistencyLevel,
    ) -> Result<Option<Vec<u8>>> {
        self.get_at_level(self.selected_table()?, key.into(), level)
    }

    /// Reads a key, substituting `default` on any failure.
    pub fn get_or(&self, key: impl Into<Key>, default: impl AsRef<[u8]>) -> Vec<u8> {
        let key = key.into();
        match self.selected_table() {
            Ok(table) => self.get_or_at(table, key, default.as_ref()),
            Err(err) => {
                debug!(key = %key, error = %err, "Returning default value");
                default.as_ref().to_vec()
            },
        }
    }

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn set(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<()> {
        self.write_at(self.selected_table()?, Operation::set(key, value))
    }

    /// Writes a value only if the key is absent. Returns false if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn set_if_not_exists(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<bool> {
        self.conditional_at(self.selected_table()?, Operation::set_if_not_exists(key, value))
    }

    /// Writes `value` only if the stored value equals `test`.
    ///
    /// Returns false, leaving the value unchanged, on mismatch.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn test_and_set(
        &self,
        key: impl Into<Key>,
        test: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<bool> {
        self.conditional_at(self.selected_table()?, Operation::test_and_set(key, test, value))
    }

    /// Writes a value and returns the previous one, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn get_and_set(
        &self,
        key: impl Into<Key>,
        value: impl AsRef<[u8]>,
    ) -> Result<Option<Vec<u8>>> {
        self.get_and_set_at(self.selected_table()?, key.into(), value.as_ref())
    }

    /// Adds `delta` to the decimal number stored at `key` and returns the sum.
    ///
    /// # Errors
    ///
    /// Returns a command error if the key is missing or not numeric.
    pub fn add(&self, key: impl Into<Key>, delta: i64) -> Result<i64> {
        self.add_at(self.selected_table()?, key.into(), delta)
    }

    /// Appends bytes to the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn append(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<()> {
        self.write_at(self.selected_table()?, Operation::append(key, value))
    }

    /// Deletes a key. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn delete(&self, key: impl Into<Key>) -> Result<()> {
        self.write_at(self.selected_table()?, Operation::delete(key))
    }

    /// Deletes a key only if the stored value equals `test`.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn test_and_delete(&self, key: impl Into<Key>, test: impl AsRef<[u8]>) -> Result<bool> {
        self.conditional_at(self.selected_table()?, Operation::test_and_delete(key, test))
    }

    // =========================================================================
    // Range operations on the selected table
    // =========================================================================

    /// Counts the keys matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or the call fails.
    pub fn count(&self, query: RangeQuery) -> Result<u64> {
        self.count_at(self.selected_table()?, query)
    }

    /// Lazily iterates the keys matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or pending operations could
    /// not be sent.
    pub fn key_iterator(&self, query: RangeQuery) -> Result<KeyIterator> {
        self.key_iterator_at(self.selected_table()?, query)
    }

    /// Lazily iterates the key-value pairs matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected or pending operations could
    /// not be sent.
    pub fn key_value_iterator(&self, query: RangeQuery) -> Result<KeyValueIterator> {
        self.key_value_iterator_at(self.selected_table()?, query)
    }

    /// Returns the shared allocator for the counter stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if no table is selected.
    pub fn sequence(&self, key: impl Into<Key>) -> Result<Arc<SequenceAllocator>> {
        Ok(self.sequence_at(self.selected_table()?, key.into()))
    }

    // =========================================================================
    // Consistency, batching and timeout settings
    // =========================================================================

    /// Sets the consistency level of subsequent reads.
    ///
    /// Reads already queued keep the level they were queued with.
    pub fn set_consistency_level(&self, level: ConsistencyLevel) {
        *self.inner.consistency.write() = level;
    }

    /// Returns the consistency level applied to new reads.
    #[must_use]
    pub fn consistency_level(&self) -> ConsistencyLevel {
        *self.inner.consistency.read()
    }

    /// Sets the batch mode for subsequent appends.
    pub fn set_batch_mode(&self, mode: BatchMode) {
        self.inner.batch.lock().set_mode(mode);
    }

    /// Returns the current batch mode.
    #[must_use]
    pub fn batch_mode(&self) -> BatchMode {
        self.inner.batch.lock().mode()
    }

    /// Sets the batch size limit in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if `limit` is zero.
    pub fn set_batch_limit_bytes(&self, limit: usize) -> Result<()> {
        self.inner.batch.lock().set_limit_bytes(limit)
    }

    /// Returns the batch size limit in bytes.
    #[must_use]
    pub fn batch_limit_bytes(&self) -> usize {
        self.inner.batch.lock().limit_bytes()
    }

    /// Sets the overall call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if `timeout` is zero.
    pub fn set_global_timeout(&self, timeout: Duration) -> Result<()> {
        self.update_timeouts(|timeouts| timeouts.global = timeout)
    }

    /// Sets the master-discovery timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if `timeout` is zero.
    pub fn set_master_timeout(&self, timeout: Duration) -> Result<()> {
        self.update_timeouts(|timeouts| timeouts.master = timeout)
    }

    /// Sets the primary-discovery timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if `timeout` is zero.
    pub fn set_primary_timeout(&self, timeout: Duration) -> Result<()> {
        self.update_timeouts(|timeouts| timeouts.primary = timeout)
    }

    /// Returns the current timeout tiers.
    #[must_use]
    pub fn timeouts(&self) -> TimeoutConfig {
        self.inner.timeouts.lock().clone()
    }

    fn update_timeouts(&self, update: impl FnOnce(&mut TimeoutConfig)) -> Result<()> {
        let mut timeouts = self.inner.timeouts.lock();
        let mut candidate = timeouts.clone();
        update(&mut candidate);
        candidate.validate()?;
        self.inner.dispatcher.transport().set_timeouts(&candidate);
        debug!(
            global = ?candidate.global,
            master = ?candidate.master,
            primary = ?candidate.primary,
            "Updated timeouts"
        );
        *timeouts = candidate;
        Ok(())
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Selects the database used by unqualified operations.
    ///
    /// Clears the selected table.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BadSchema`] if the database does not exist.
    pub fn use_database(&self, name: &str) -> Result<()> {
        let id = self.database_id(name)?;
        let mut selection = self.inner.selection.write();
        selection.database = Some((id, name.to_owned()));
        selection.table = None;
        debug!(database = name, id = %id, "Selected database");
        Ok(())
    }

    /// Selects the table used by unqualified operations.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BadSchema`] if no database is selected or the table
    /// does not exist.
    pub fn use_table(&self, name: &str) -> Result<()> {
        let database = self.selected_database()?;
        let id = self.table_id(database, name)?;
        self.inner.selection.write().table = Some((id, name.to_owned()));
        debug!(table = name, id = %id, "Selected table");
        Ok(())
    }

    /// Name of the selected database.
    #[must_use]
    pub fn selected_database_name(&self) -> Option<String> {
        self.inner.selection.read().database.as_ref().map(|(_, name)| name.clone())
    }

    /// Name of the selected table.
    #[must_use]
    pub fn selected_table_name(&self) -> Option<String> {
        self.inner.selection.read().table.as_ref().map(|(_, name)| name.clone())
    }

    /// Returns a handle to an existing database.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BadSchema`] if the database does not exist.
    pub fn database(&self, name: &str) -> Result<Database> {
        let id = self.database_id(name)?;
        Ok(Database::new(self.clone(), id, name.to_owned()))
    }

    /// Creates a database.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the call fails.
    pub fn create_database(&self, name: &str) -> Result<Database> {
        let id = schema_call(self.transport().create_database(name), || {
            format!("create database '{name}'")
        })?;
        debug!(database = name, id = %id, "Created database");
        Ok(Database::new(self.clone(), id, name.to_owned()))
    }

    /// Creates a quorum over the given node ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the call fails.
    pub fn create_quorum(&self, name: &str, nodes: &[u64]) -> Result<QuorumId> {
        let id = schema_call(self.transport().create_quorum(name, nodes), || {
            format!("create quorum '{name}'")
        })?;
        debug!(quorum = name, id = %id, nodes = nodes.len(), "Created quorum");
        Ok(id)
    }

    /// Lists database names.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn list_databases(&self) -> Result<Vec<String>> {
        schema_call(self.transport().list_databases(), || "list databases".to_owned())
    }

    /// Lists quorum names.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn list_quorums(&self) -> Result<Vec<String>> {
        schema_call(self.transport().list_quorums(), || "list quorums".to_owned())
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        self.inner.dispatcher.transport()
    }

    pub(crate) fn database_id(&self, name: &str) -> Result<DatabaseId> {
        schema_call(self.transport().database_id(name), || format!("database '{name}' not found"))
    }

    pub(crate) fn table_id(&self, database: DatabaseId, name: &str) -> Result<TableId> {
        schema_call(self.transport().table_id(database, name), || {
            format!("table '{name}' not found")
        })
    }

    fn selected_database(&self) -> Result<DatabaseId> {
        match &self.inner.selection.read().database {
            Some((id, _)) => Ok(*id),
            None => BadSchemaSnafu { context: "no database selected" }.fail(),
        }
    }

    fn selected_table(&self) -> Result<TableId> {
        let selection = self.inner.selection.read();
        match (&selection.database, &selection.table) {
            (None, _) => BadSchemaSnafu { context: "no database selected" }.fail(),
            (Some(_), None) => BadSchemaSnafu { context: "no table selected" }.fail(),
            (Some(_), Some((id, _))) => Ok(*id),
        }
    }

    /// Forgets a dropped table: cached sequences and the selection.
    pub(crate) fn forget_table(&self, table: TableId) {
        self.inner.sequences.invalidate_table(table);
        let mut selection = self.inner.selection.write();
        if selection.table.as_ref().is_some_and(|(id, _)| *id == table) {
            selection.table = None;
        }
    }

    /// Forgets a truncated table's cached sequences.
    pub(crate) fn forget_sequences(&self, table: TableId) {
        self.inner.sequences.invalidate_table(table);
    }

    pub(crate) fn rename_selected_table(&self, table: TableId, name: &str) {
        let mut selection = self.inner.selection.write();
        if let Some((_, selected)) = selection.table.as_mut().filter(|(id, _)| *id == table) {
            name.clone_into(selected);
        }
    }

    pub(crate) fn forget_database(&self, database: DatabaseId) {
        let mut selection = self.inner.selection.write();
        if selection.database.as_ref().is_some_and(|(id, _)| *id == database) {
            *selection = Selection::default();
        }
    }

    pub(crate) fn rename_selected_database(&self, database: DatabaseId, name: &str) {
        let mut selection = self.inner.selection.write();
        if let Some((_, selected)) =
            selection.database.as_mut().filter(|(id, _)| *id == database)
        {
            name.clone_into(selected);
        }
    }

    // =========================================================================
    // Table-targeted implementations, shared with `Table`
    // =========================================================================

    fn command(&self, table: TableId, operation: Operation) -> Command {
        Command::new(table, self.consistency_level(), operation)
    }

    /// Queues `operation` if a batch is open, otherwise sends it alone.
    pub(crate) fn write_at(&self, table: TableId, operation: Operation) -> Result<()> {
        let context = operation.name();
        let command = self.command(table, operation);
        let mut batch = self.inner.batch.lock();
        if !batch.is_open() {
            drop(batch);
            let entry = self.inner.dispatcher.submit_one(command).into_first_entry(context)?;
            return expect_success(entry, context).map(drop);
        }
        match batch.append(command)? {
            Appended::Queued => Ok(()),
            Appended::Flushed(cursor) => {
                checked(cursor, "batch flush").map(|mut cursor| cursor.close())
            },
            Appended::Submitted(cursor) => {
                expect_success(cursor.into_first_entry(context)?, context).map(drop)
            },
        }
    }

    /// Sends queued operations, then `operation` alone, and returns its entry.
    fn execute_at(&self, table: TableId, operation: Operation) -> Result<Option<Entry>> {
        self.execute_command(self.command(table, operation))
    }

    fn execute_command(&self, command: Command) -> Result<Option<Entry>> {
        let context = command.operation.name();
        self.flush_pending()?;
        self.inner.dispatcher.submit_one(command).into_first_entry(context)
    }

    /// Sends queued operations so a following read observes them.
    fn flush_pending(&self) -> Result<()> {
        let mut batch = self.inner.batch.lock();
        if batch.is_empty() {
            return Ok(());
        }
        let cursor = batch.flush(FlushReason::Barrier);
        drop(batch);
        checked(cursor, "batch flush").map(|mut cursor| cursor.close())
    }

    pub(crate) fn get_at(&self, table: TableId, key: Key) -> Result<Option<Vec<u8>>> {
        self.get_at_level(table, key, self.consistency_level())
    }

    pub(crate) fn get_at_level(
        &self,
        table: TableId,
        key: Key,
        level: ConsistencyLevel,
    ) -> Result<Option<Vec<u8>>> {
        match self.execute_command(Command::new(table, level, Operation::get(&key)))? {
            Some(entry) if entry.status == StatusCode::Failed => Ok(None),
            entry => expect_success(entry, "get").map(|entry| Some(entry.value)),
        }
    }

    pub(crate) fn get_or_at(&self, table: TableId, key: Key, default: &[u8]) -> Vec<u8> {
        match self.get_at(table, key.clone()) {
            Ok(Some(value)) => value,
            Ok(None) => default.to_vec(),
            Err(err) => {
                debug!(key = %key, error = %err, "Returning default value");
                default.to_vec()
            },
        }
    }

    pub(crate) fn conditional_at(&self, table: TableId, operation: Operation) -> Result<bool> {
        let context = operation.name();
        match self.execute_at(table, operation)? {
            Some(entry) if entry.status == StatusCode::Failed => Ok(false),
            entry => expect_success(entry, context).map(|_| true),
        }
    }

    pub(crate) fn get_and_set_at(
        &self,
        table: TableId,
        key: Key,
        value: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        match self.execute_at(table, Operation::get_and_set(key, value))? {
            Some(entry) if entry.status == StatusCode::Failed => Ok(None),
            entry => expect_success(entry, "get_and_set").map(|entry| Some(entry.value)),
        }
    }

    pub(crate) fn add_at(&self, table: TableId, key: Key, delta: i64) -> Result<i64> {
        let entry = expect_success(self.execute_at(table, Operation::add(&key, delta))?, "add")?;
        entry.number.ok_or_else(|| {
            CommandSnafu {
                status: StatusCode::Failed,
                message: format!("add on '{key}' returned no number"),
            }
            .build()
        })
    }

    pub(crate) fn count_at(&self, table: TableId, query: RangeQuery) -> Result<u64> {
        let entry = expect_success(self.execute_at(table, Operation::Count { query })?, "count")?;
        entry
            .number
            .and_then(|number| u64::try_from(number).ok())
            .ok_or_else(|| {
                CommandSnafu { status: StatusCode::Failed, message: "count returned no number" }
                    .build()
            })
    }

    pub(crate) fn key_iterator_at(&self, table: TableId, query: RangeQuery) -> Result<KeyIterator> {
        self.flush_pending()?;
        Ok(KeyIterator::new(
            self.inner.dispatcher.clone(),
            table,
            self.consistency_level(),
            query,
            self.inner.config.scan().page_granularity,
        ))
    }

    pub(crate) fn key_value_iterator_at(
        &self,
        table: TableId,
        query: RangeQuery,
    ) -> Result<KeyValueIterator> {
        self.flush_pending()?;
        Ok(KeyValueIterator::new(
            self.inner.dispatcher.clone(),
            table,
            self.consistency_level(),
            query,
            self.inner.config.scan().page_granularity,
        ))
    }

    pub(crate) fn sequence_at(&self, table: TableId, key: Key) -> Arc<SequenceAllocator> {
        self.inner.sequences.get_or_create(
            &self.inner.dispatcher,
            table,
            key.into_bytes(),
            self.inner.config.sequence().granularity,
        )
    }
}

/// Checks a batch result, closing the cursor if it reports a failure.
fn checked(mut cursor: ResultCursor, context: &str) -> Result<ResultCursor> {
    match cursor.check(context) {
        Ok(()) => Ok(cursor),
        Err(err) => {
            cursor.close();
            Err(err)
        },
    }
}

/// Requires a single successful entry.
fn expect_success(entry: Option<Entry>, context: &str) -> Result<Entry> {
    match entry {
        Some(entry) if entry.status.is_error() => Err(SdkError::from_status(entry.status, context)),
        Some(entry) => Ok(entry),
        None => CommandSnafu { status: StatusCode::Failed, message: format!("{context}: no entry") }
            .fail(),
    }
}

/// Maps a schema call's status into an error carrying `context`.
pub(crate) fn schema_call<T>(
    result: std::result::Result<T, StatusCode>,
    context: impl FnOnce() -> String,
) -> Result<T> {
    result.map_err(|status| SdkError::from_status(status, context()))
}
