//! In-memory store for testing code built on the shardkv client.
//!
//! [`MockStore`] implements [`Transport`] against plain maps, so the whole
//! operation engine can be exercised without a cluster.
//!
//! # Features
//!
//! - **Storage**: per-table ordered key-value maps and a schema catalog
//! - **Failure injection**: fail the next N requests with a chosen status
//! - **Request counting**: track how many round trips the client issued
//! - **Handle tracking**: verify every response handle was released
//!
//! Range listings come back in a scrambled order on purpose: the remote store
//! makes no ordering promise and clients must sort.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shardkv_sdk::{Client, ClientConfig, mock::MockStore};
//!
//! # fn example() -> shardkv_sdk::Result<()> {
//! let store = Arc::new(MockStore::new());
//! store.add_table("app", "users");
//!
//! let config = ClientConfig::builder().with_node("localhost:7080").build()?;
//! let client = Client::new(config, store.clone());
//! client.use_database("app")?;
//! client.use_table("users")?;
//! client.set("alice", "1")?;
//! assert_eq!(store.request_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::{Mutex, RwLock};
use shardkv_types::{
    ByteOrder, ConsistencyLevel, DatabaseId, QuorumId, StatusCode, TableId, config::TimeoutConfig,
};

use crate::{
    operation::{Command, Operation},
    range::RangeQuery,
    transport::{Entry, Request, Response, ResponseHandle, Transport},
};

/// Stored data of one table.
#[derive(Debug)]
struct TableData {
    database: DatabaseId,
    quorum: QuorumId,
    name: String,
    rows: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Shared state for the mock store.
#[derive(Debug, Default)]
struct MockState {
    /// Database names by id.
    databases: RwLock<BTreeMap<DatabaseId, String>>,

    /// Tables by id, including their rows.
    tables: RwLock<BTreeMap<TableId, TableData>>,

    /// Quorums by id, with their node ids.
    quorums: RwLock<BTreeMap<QuorumId, (String, Vec<u64>)>>,

    /// Source of schema identifiers.
    next_id: AtomicU64,

    /// Requests still to fail, and the status to fail them with.
    failure: Mutex<Option<(usize, StatusCode)>>,

    /// Total execute calls received.
    request_count: AtomicUsize,

    /// Total commands received across all requests.
    command_count: AtomicUsize,

    /// Response handles handed out and not yet released.
    outstanding_handles: Arc<AtomicUsize>,

    /// Timeout tiers most recently forwarded by a client.
    timeouts: Mutex<Option<TimeoutConfig>>,

    /// Consistency level of every read received, in arrival order.
    read_levels: Mutex<Vec<ConsistencyLevel>>,
}

impl MockState {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Consumes one injected failure, if any is pending.
    fn take_failure(&self) -> Option<StatusCode> {
        let mut failure = self.failure.lock();
        match failure.as_mut() {
            Some((remaining, status)) if *remaining > 0 => {
                *remaining -= 1;
                let status = *status;
                if *remaining == 0 {
                    *failure = None;
                }
                Some(status)
            },
            _ => None,
        }
    }

    fn handle(&self) -> Box<dyn ResponseHandle> {
        self.outstanding_handles.fetch_add(1, Ordering::SeqCst);
        Box::new(MockHandle { outstanding: Arc::clone(&self.outstanding_handles), released: false })
    }
}

/// Response handle that tracks release in the store.
#[derive(Debug)]
struct MockHandle {
    outstanding: Arc<AtomicUsize>,
    released: bool,
}

impl ResponseHandle for MockHandle {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// In-memory [`Transport`] for tests and demos.
#[derive(Debug, Default)]
pub struct MockStore {
    state: MockState,
}

impl MockStore {
    /// Creates an empty store with no databases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `database` and `table` exist and returns the table id.
    ///
    /// Tables created this way are placed on a quorum named `default`.
    pub fn add_table(&self, database: &str, table: &str) -> TableId {
        let database_id = self.ensure_database(database);
        let quorum = self.ensure_quorum("default");

        let mut tables = self.state.tables.write();
        if let Some((id, _)) =
            tables.iter().find(|(_, data)| data.database == database_id && data.name == table)
        {
            return *id;
        }
        let id = TableId::new(self.state.next_id());
        tables.insert(
            id,
            TableData {
                database: database_id,
                quorum,
                name: table.to_owned(),
                rows: BTreeMap::new(),
            },
        );
        id
    }

    /// Writes a row directly, bypassing the request path.
    pub fn put_raw(&self, table: TableId, key: &[u8], value: &[u8]) {
        if let Some(data) = self.state.tables.write().get_mut(&table) {
            data.rows.insert(key.to_vec(), value.to_vec());
        }
    }

    /// Reads a row directly, bypassing the request path.
    #[must_use]
    pub fn get_raw(&self, table: TableId, key: &[u8]) -> Option<Vec<u8>> {
        self.state.tables.read().get(&table).and_then(|data| data.rows.get(key).cloned())
    }

    /// Number of rows stored in `table`.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> usize {
        self.state.tables.read().get(&table).map_or(0, |data| data.rows.len())
    }

    /// Fails the next `count` requests with `status`.
    ///
    /// Each request decrements the counter and returns a transport failure
    /// until it reaches 0. Schema calls are not affected.
    pub fn fail_next(&self, count: usize, status: StatusCode) {
        *self.state.failure.lock() = if count == 0 { None } else { Some((count, status)) };
    }

    /// Returns the total number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Returns the total number of commands received.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.state.command_count.load(Ordering::SeqCst)
    }

    /// Returns the number of response handles not yet released.
    #[must_use]
    pub fn outstanding_handles(&self) -> usize {
        self.state.outstanding_handles.load(Ordering::SeqCst)
    }

    /// Returns the timeout tiers most recently forwarded by a client.
    #[must_use]
    pub fn last_timeouts(&self) -> Option<TimeoutConfig> {
        self.state.timeouts.lock().clone()
    }

    /// Returns the consistency level of every read received, oldest first.
    #[must_use]
    pub fn read_levels(&self) -> Vec<ConsistencyLevel> {
        self.state.read_levels.lock().clone()
    }

    /// Resets all state to initial values.
    pub fn reset(&self) {
        self.state.databases.write().clear();
        self.state.tables.write().clear();
        self.state.quorums.write().clear();
        *self.state.failure.lock() = None;
        *self.state.timeouts.lock() = None;
        self.state.read_levels.lock().clear();
        self.state.request_count.store(0, Ordering::SeqCst);
        self.state.command_count.store(0, Ordering::SeqCst);
    }

    /// Returns the quorum each table of `database` is placed on.
    #[must_use]
    pub fn placement(&self, database: DatabaseId) -> HashMap<String, QuorumId> {
        self.state
            .tables
            .read()
            .values()
            .filter(|data| data.database == database)
            .map(|data| (data.name.clone(), data.quorum))
            .collect()
    }

    fn ensure_database(&self, name: &str) -> DatabaseId {
        let mut databases = self.state.databases.write();
        if let Some((id, _)) = databases.iter().find(|(_, existing)| *existing == name) {
            return *id;
        }
        let id = DatabaseId::new(self.state.next_id());
        databases.insert(id, name.to_owned());
        id
    }

    fn ensure_quorum(&self, name: &str) -> QuorumId {
        let mut quorums = self.state.quorums.write();
        if let Some((id, _)) = quorums.iter().find(|(_, (existing, _))| existing == name) {
            return *id;
        }
        let id = QuorumId::new(self.state.next_id());
        quorums.insert(id, (name.to_owned(), vec![1]));
        id
    }
}

// ============================================================================
// Command execution
// ============================================================================

fn failed(key: &[u8]) -> Entry {
    Entry::with_status(key.to_vec(), StatusCode::Failed)
}

fn written(key: &[u8]) -> Entry {
    Entry::new(key.to_vec(), Vec::new())
}

fn parse_number(value: &[u8]) -> Option<i64> {
    std::str::from_utf8(value).ok().and_then(|text| text.trim().parse().ok())
}

/// Keys matching `query`, in scan order, capped by its count.
fn scan<'a>(
    rows: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    query: &RangeQuery,
) -> Vec<(&'a Vec<u8>, &'a Vec<u8>)> {
    let mut matched: Vec<_> = rows.iter().filter(|(key, _)| query.matches(key)).collect();
    matched.sort_by(|a, b| ByteOrder::compare_directed(a.0, b.0, query.direction));
    if let Some(count) = query.count {
        matched.truncate(usize::try_from(count).unwrap_or(usize::MAX));
    }
    matched
}

/// Reorders a listing so callers cannot rely on the store's order.
fn scramble(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.key.iter().rev().cmp(b.key.iter().rev()));
}

fn apply(rows: &mut BTreeMap<Vec<u8>, Vec<u8>>, operation: &Operation) -> Vec<Entry> {
    match operation {
        Operation::Get { key } => match rows.get(key) {
            Some(value) => vec![Entry::new(key.clone(), value.clone())],
            None => vec![failed(key)],
        },
        Operation::Set { key, value } => {
            rows.insert(key.clone(), value.clone());
            vec![written(key)]
        },
        Operation::SetIfNotExists { key, value } => {
            if rows.contains_key(key) {
                return vec![failed(key)];
            }
            rows.insert(key.clone(), value.clone());
            vec![written(key)]
        },
        Operation::TestAndSet { key, test, value } => {
            if rows.get(key) != Some(test) {
                return vec![failed(key)];
            }
            rows.insert(key.clone(), value.clone());
            vec![written(key)]
        },
        Operation::GetAndSet { key, value } => match rows.insert(key.clone(), value.clone()) {
            Some(old) => vec![Entry::new(key.clone(), old)],
            None => vec![failed(key)],
        },
        Operation::Add { key, delta } => {
            let Some(current) = rows.get(key).and_then(|value| parse_number(value)) else {
                return vec![failed(key)];
            };
            let Some(number) = current.checked_add(*delta) else {
                return vec![failed(key)];
            };
            let text = number.to_string().into_bytes();
            rows.insert(key.clone(), text.clone());
            let mut entry = Entry::new(key.clone(), text);
            entry.number = Some(number);
            vec![entry]
        },
        Operation::Append { key, value } => {
            rows.entry(key.clone()).or_default().extend_from_slice(value);
            vec![written(key)]
        },
        Operation::Delete { key } => {
            rows.remove(key);
            vec![written(key)]
        },
        Operation::TestAndDelete { key, test } => {
            if rows.get(key) != Some(test) {
                return vec![failed(key)];
            }
            rows.remove(key);
            vec![written(key)]
        },
        Operation::ListKeys { query } => {
            let mut entries: Vec<_> =
                scan(rows, query).into_iter().map(|(key, _)| written(key)).collect();
            scramble(&mut entries);
            entries
        },
        Operation::ListKeyValues { query } => {
            let mut entries: Vec<_> = scan(rows, query)
                .into_iter()
                .map(|(key, value)| Entry::new(key.clone(), value.clone()))
                .collect();
            scramble(&mut entries);
            entries
        },
        Operation::Count { query } => {
            let mut entry = Entry::new(Vec::new(), Vec::new());
            entry.number = i64::try_from(scan(rows, query).len()).ok();
            vec![entry]
        },
    }
}

impl Transport for MockStore {
    fn execute(&self, request: &Request) -> Response {
        let started = Instant::now();
        self.state.request_count.fetch_add(1, Ordering::SeqCst);
        self.state.command_count.fetch_add(request.commands.len(), Ordering::SeqCst);
        self.state.read_levels.lock().extend(
            request
                .commands
                .iter()
                .filter(|command| command.operation.is_read())
                .map(|command| command.consistency),
        );

        if let Some(status) = self.state.take_failure() {
            return Response::transport_failure(status, self.state.handle());
        }

        let mut tables = self.state.tables.write();
        let unknown =
            request.commands.iter().any(|Command { table, .. }| !tables.contains_key(table));
        if unknown {
            return Response {
                transport_status: StatusCode::Success,
                command_status: StatusCode::BadSchema,
                entries: Vec::new(),
                elapsed: started.elapsed(),
                handle: self.state.handle(),
            };
        }

        let mut entries = Vec::with_capacity(request.commands.len());
        for command in &request.commands {
            if let Some(data) = tables.get_mut(&command.table) {
                entries.extend(apply(&mut data.rows, &command.operation));
            }
        }

        Response {
            transport_status: StatusCode::Success,
            command_status: StatusCode::Success,
            entries,
            elapsed: started.elapsed().max(Duration::from_micros(1)),
            handle: self.state.handle(),
        }
    }

    fn set_timeouts(&self, timeouts: &TimeoutConfig) {
        *self.state.timeouts.lock() = Some(timeouts.clone());
    }

    fn database_id(&self, name: &str) -> Result<DatabaseId, StatusCode> {
        self.state
            .databases
            .read()
            .iter()
            .find(|(_, existing)| *existing == name)
            .map(|(id, _)| *id)
            .ok_or(StatusCode::BadSchema)
    }

    fn table_id(&self, database: DatabaseId, name: &str) -> Result<TableId, StatusCode> {
        self.state
            .tables
            .read()
            .iter()
            .find(|(_, data)| data.database == database && data.name == name)
            .map(|(id, _)| *id)
            .ok_or(StatusCode::BadSchema)
    }

    fn create_quorum(&self, name: &str, nodes: &[u64]) -> Result<QuorumId, StatusCode> {
        if nodes.is_empty() {
            return Err(StatusCode::Failed);
        }
        let mut quorums = self.state.quorums.write();
        if quorums.values().any(|(existing, _)| existing == name) {
            return Err(StatusCode::Failed);
        }
        let id = QuorumId::new(self.state.next_id());
        quorums.insert(id, (name.to_owned(), nodes.to_vec()));
        Ok(id)
    }

    fn create_database(&self, name: &str) -> Result<DatabaseId, StatusCode> {
        let mut databases = self.state.databases.write();
        if databases.values().any(|existing| existing == name) {
            return Err(StatusCode::Failed);
        }
        let id = DatabaseId::new(self.state.next_id());
        databases.insert(id, name.to_owned());
        Ok(id)
    }

    fn create_table(
        &self,
        database: DatabaseId,
        quorum: QuorumId,
        name: &str,
    ) -> Result<TableId, StatusCode> {
        if !self.state.databases.read().contains_key(&database)
            || !self.state.quorums.read().contains_key(&quorum)
        {
            return Err(StatusCode::BadSchema);
        }
        let mut tables = self.state.tables.write();
        if tables.values().any(|data| data.database == database && data.name == name) {
            return Err(StatusCode::Failed);
        }
        let id = TableId::new(self.state.next_id());
        tables.insert(
            id,
            TableData { database, quorum, name: name.to_owned(), rows: BTreeMap::new() },
        );
        Ok(id)
    }

    fn rename_database(&self, database: DatabaseId, name: &str) -> Result<(), StatusCode> {
        let mut databases = self.state.databases.write();
        if databases.iter().any(|(id, existing)| *id != database && existing == name) {
            return Err(StatusCode::Failed);
        }
        let entry = databases.get_mut(&database).ok_or(StatusCode::BadSchema)?;
        name.clone_into(entry);
        Ok(())
    }

    fn delete_database(&self, database: DatabaseId) -> Result<(), StatusCode> {
        self.state.databases.write().remove(&database).ok_or(StatusCode::BadSchema)?;
        self.state.tables.write().retain(|_, data| data.database != database);
        Ok(())
    }

    fn rename_table(&self, table: TableId, name: &str) -> Result<(), StatusCode> {
        let mut tables = self.state.tables.write();
        let database = tables.get(&table).ok_or(StatusCode::BadSchema)?.database;
        if tables
            .iter()
            .any(|(id, data)| *id != table && data.database == database && data.name == name)
        {
            return Err(StatusCode::Failed);
        }
        if let Some(data) = tables.get_mut(&table) {
            name.clone_into(&mut data.name);
        }
        Ok(())
    }

    fn delete_table(&self, table: TableId) -> Result<(), StatusCode> {
        self.state.tables.write().remove(&table).map(|_| ()).ok_or(StatusCode::BadSchema)
    }

    fn truncate_table(&self, table: TableId) -> Result<(), StatusCode> {
        let mut tables = self.state.tables.write();
        let data = tables.get_mut(&table).ok_or(StatusCode::BadSchema)?;
        data.rows.clear();
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>, StatusCode> {
        Ok(self.state.databases.read().values().cloned().collect())
    }

    fn list_tables(&self, database: DatabaseId) -> Result<Vec<String>, StatusCode> {
        if !self.state.databases.read().contains_key(&database) {
            return Err(StatusCode::BadSchema);
        }
        Ok(self
            .state
            .tables
            .read()
            .values()
            .filter(|data| data.database == database)
            .map(|data| data.name.clone())
            .collect())
    }

    fn list_quorums(&self) -> Result<Vec<String>, StatusCode> {
        Ok(self.state.quorums.read().values().map(|(name, _)| name.clone()).collect())
    }
}
