//! Lease-based sequence allocation.
//!
//! A sequence is a key whose stored value is the next integer to hand out, as
//! decimal text. Instead of one round trip per value, an allocator leases
//! `granularity` values at once with a single remote `add` and dispenses them
//! locally:
//!
//! ```text
//! stored:  key => 2001            add(1000) returns 3001
//! leased:  [2001, 3001)           next = 2001, remaining = 1000
//! ```
//!
//! Values leased but not dispensed before the process exits are lost, which
//! leaves gaps in the sequence. Uniqueness and monotonicity hold as long as
//! every allocator for a key lives in one [`SequenceCache`].

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use shardkv_types::{ConsistencyLevel, Key, StatusCode, TableId};
use snafu::ensure;
use tracing::debug;

use crate::{
    batch::Dispatcher,
    error::{CommandSnafu, ConfigSnafu, Result, SdkError},
    operation::{Command, Operation},
};

/// Locally held part of a leased range.
#[derive(Debug)]
struct Lease {
    /// Next value to dispense.
    next: u64,
    /// Values left in the current lease.
    remaining: u64,
    /// Size of the next lease.
    granularity: u64,
}

/// Dispenses strictly increasing integers for one named counter.
///
/// Safe to share across threads: the check-lease-update sequence runs under a
/// single lock, so two threads never lease twice for one exhaustion or hand
/// out the same value.
#[derive(Debug)]
pub struct SequenceAllocator {
    dispatcher: Dispatcher,
    table: TableId,
    key: Vec<u8>,
    lease: Mutex<Lease>,
}

impl SequenceAllocator {
    pub(crate) fn new(dispatcher: Dispatcher, table: TableId, key: Vec<u8>, granularity: u64) -> Self {
        Self {
            dispatcher,
            table,
            key,
            lease: Mutex::new(Lease { next: 0, remaining: 0, granularity: granularity.max(1) }),
        }
    }

    /// Returns the next value of the sequence.
    ///
    /// A fresh counter starts at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if leasing a new range fails. The local state is left
    /// untouched in that case, so the next call retries the lease.
    pub fn get(&self) -> Result<u64> {
        let mut lease = self.lease.lock();
        if lease.remaining == 0 {
            self.renew(&mut lease)?;
        }
        let value = lease.next;
        lease.next += 1;
        lease.remaining -= 1;
        Ok(value)
    }

    /// Makes the next [`get`](Self::get) return `value`.
    ///
    /// Discards the locally cached range.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote write fails.
    pub fn set(&self, value: u64) -> Result<()> {
        let mut lease = self.lease.lock();
        lease.remaining = 0;
        let command = self.command(Operation::set(self.key.as_slice(), value.to_string()));
        let entry = self.dispatcher.submit_one(command).into_first_entry("sequence set")?;
        match entry {
            Some(entry) if entry.status.is_error() => {
                Err(SdkError::from_status(entry.status, "sequence set"))
            },
            _ => {
                debug!(table = %self.table, key = %Key::from(self.key.as_slice()), value, "Sequence set");
                Ok(())
            },
        }
    }

    /// Restarts the sequence at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote write fails.
    pub fn reset(&self) -> Result<()> {
        self.set(1)
    }

    /// Changes the lease size used by future leases.
    ///
    /// An already leased range is dispensed to the end first.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if `granularity` is zero or does not fit a
    /// signed 64-bit increment.
    pub fn set_granularity(&self, granularity: u64) -> Result<()> {
        ensure!(granularity > 0, ConfigSnafu { message: "sequence granularity must be > 0" });
        ensure!(
            i64::try_from(granularity).is_ok(),
            ConfigSnafu { message: "sequence granularity is too large" }
        );
        self.lease.lock().granularity = granularity;
        Ok(())
    }

    /// Lease size used by future leases.
    #[must_use]
    pub fn granularity(&self) -> u64 {
        self.lease.lock().granularity
    }

    /// Values left in the current lease.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.lease.lock().remaining
    }

    /// Table holding the counter.
    #[must_use]
    pub fn table(&self) -> TableId {
        self.table
    }

    /// Key of the counter.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Leases a new range. Runs with the lease lock held.
    fn renew(&self, lease: &mut Lease) -> Result<()> {
        let granularity = lease.granularity;
        let delta = i64::try_from(granularity)
            .map_err(|_| SdkError::Config { message: "sequence granularity is too large".into() })?;

        // Two attempts: a missing counter is created with the first range
        // already reserved; if another client created it first, add again.
        for _ in 0..2 {
            let add = self.command(Operation::add(self.key.as_slice(), delta));
            let entry = self.dispatcher.submit_one(add).into_first_entry("sequence lease")?;
            match entry {
                Some(entry) if entry.status.is_success() => {
                    let end = entry
                        .number
                        .and_then(|n| u64::try_from(n).ok())
                        .filter(|end| *end >= granularity)
                        .ok_or_else(|| {
                            CommandSnafu {
                                status: StatusCode::Failed,
                                message: format!(
                                    "sequence returned invalid value {:?} for granularity {granularity}",
                                    entry.number
                                ),
                            }
                            .build()
                        })?;
                    self.install(lease, end - granularity, granularity);
                    return Ok(());
                },
                Some(entry) if entry.status == StatusCode::Failed => {
                    let init = self.command(Operation::set_if_not_exists(
                        self.key.as_slice(),
                        (1 + granularity).to_string(),
                    ));
                    let created = self.dispatcher.submit_one(init).into_first_entry("sequence init")?;
                    if created.is_some_and(|entry| entry.status.is_success()) {
                        self.install(lease, 1, granularity);
                        return Ok(());
                    }
                },
                Some(entry) => return Err(SdkError::from_status(entry.status, "sequence lease")),
                None => {
                    return CommandSnafu {
                        status: StatusCode::Failed,
                        message: "sequence lease returned no entry",
                    }
                    .fail();
                },
            }
        }
        CommandSnafu { status: StatusCode::Failed, message: "sequence counter is not numeric" }
            .fail()
    }

    fn install(&self, lease: &mut Lease, first: u64, granularity: u64) {
        lease.next = first;
        lease.remaining = granularity;
        self.dispatcher.metrics().record_sequence_lease(granularity);
        debug!(
            table = %self.table,
            key = %Key::from(self.key.as_slice()),
            granularity,
            first,
            "Leased sequence range"
        );
    }

    fn command(&self, operation: Operation) -> Command {
        Command::new(self.table, ConsistencyLevel::Strict, operation)
    }
}

/// Allocators shared per `(table, key)`, owned by the client.
///
/// Handing out one allocator per counter keeps a single lease per process, so
/// values from one client never overlap.
#[derive(Debug, Default)]
pub struct SequenceCache {
    allocators: Mutex<HashMap<(TableId, Vec<u8>), Arc<SequenceAllocator>>>,
}

impl SequenceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get_or_create(
        &self,
        dispatcher: &Dispatcher,
        table: TableId,
        key: Vec<u8>,
        granularity: u64,
    ) -> Arc<SequenceAllocator> {
        let mut allocators = self.allocators.lock();
        let allocator = allocators.entry((table, key)).or_insert_with_key(|(table, key)| {
            Arc::new(SequenceAllocator::new(dispatcher.clone(), *table, key.clone(), granularity))
        });
        Arc::clone(allocator)
    }

    /// Drops every allocator of `table`, discarding their leases.
    pub(crate) fn invalidate_table(&self, table: TableId) {
        self.allocators.lock().retain(|(owner, _), _| *owner != table);
    }

    /// Number of cached allocators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.allocators.lock().len()
    }

    /// Returns true if no allocator is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocators.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{collections::HashSet, thread};

    use super::*;
    use crate::{metrics::NoopSdkMetrics, mock::MockStore};

    fn setup() -> (Arc<MockStore>, TableId, Dispatcher) {
        let store = Arc::new(MockStore::new());
        let table = store.add_table("db", "sequences");
        let dispatcher = Dispatcher::new(store.clone(), Arc::new(NoopSdkMetrics));
        (store, table, dispatcher)
    }

    #[test]
    fn test_fresh_counter_starts_at_one() {
        let (_store, table, dispatcher) = setup();
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 10);
        assert_eq!(seq.get().unwrap(), 1);
        assert_eq!(seq.get().unwrap(), 2);
        assert_eq!(seq.remaining(), 8);
    }

    #[test]
    fn test_sequential_values_without_gaps() {
        let (store, table, dispatcher) = setup();
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 10);
        let values: Vec<u64> = (0..35).map(|_| seq.get().unwrap()).collect();
        assert_eq!(values, (1..=35).collect::<Vec<_>>());
        // first lease creates the counter (add + init), then 3 more adds
        assert_eq!(store.request_count(), 5);
        assert_eq!(store.get_raw(table, b"ids"), Some(b"41".to_vec()));
    }

    #[test]
    fn test_reset_restarts_at_one() {
        let (_store, table, dispatcher) = setup();
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 100);
        for _ in 0..5 {
            seq.get().unwrap();
        }
        seq.reset().unwrap();
        assert_eq!(seq.remaining(), 0);
        assert_eq!(seq.get().unwrap(), 1);
        assert_eq!(seq.get().unwrap(), 2);
    }

    #[test]
    fn test_set_makes_next_value() {
        let (_store, table, dispatcher) = setup();
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 100);
        seq.set(2500).unwrap();
        assert_eq!(seq.get().unwrap(), 2500);
        assert_eq!(seq.get().unwrap(), 2501);
    }

    #[test]
    fn test_granularity_change_applies_to_next_lease() {
        let (store, table, dispatcher) = setup();
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 2);
        assert_eq!(seq.get().unwrap(), 1);
        seq.set_granularity(5).unwrap();
        assert_eq!(seq.remaining(), 1);
        assert_eq!(seq.get().unwrap(), 2);
        assert_eq!(seq.get().unwrap(), 3);
        assert_eq!(seq.remaining(), 4);
        assert_eq!(store.get_raw(table, b"ids"), Some(b"8".to_vec()));
        assert!(seq.set_granularity(0).is_err());
    }

    #[test]
    fn test_lease_failure_keeps_state() {
        let (store, table, dispatcher) = setup();
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 3);
        for _ in 0..3 {
            seq.get().unwrap();
        }
        store.fail_next(1, StatusCode::NoMaster);
        assert!(seq.get().unwrap_err().is_connectivity());
        assert_eq!(seq.get().unwrap(), 4);
        assert_eq!(store.outstanding_handles(), 0);
    }

    #[test]
    fn test_non_numeric_counter_fails() {
        let (store, table, dispatcher) = setup();
        store.put_raw(table, b"ids", b"not a number");
        let seq = SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 3);
        let err = seq.get().unwrap_err();
        assert!(err.is_command());
    }

    #[test]
    fn test_concurrent_get_is_unique_and_contiguous() {
        let (_store, table, dispatcher) = setup();
        let seq = Arc::new(SequenceAllocator::new(dispatcher, table, b"ids".to_vec(), 7));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..50).map(|_| seq.get().unwrap()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(unique.len(), 400);
        all.sort_unstable();
        assert_eq!(all, (1..=400).collect::<Vec<_>>());
    }

    #[test]
    fn test_cache_shares_allocator_per_key() {
        let (_store, table, dispatcher) = setup();
        let cache = SequenceCache::new();
        let a = cache.get_or_create(&dispatcher, table, b"ids".to_vec(), 10);
        let b = cache.get_or_create(&dispatcher, table, b"ids".to_vec(), 10);
        let c = cache.get_or_create(&dispatcher, table, b"other".to_vec(), 10);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        assert_eq!(a.get().unwrap(), 1);
        assert_eq!(b.get().unwrap(), 2);

        cache.invalidate_table(table);
        assert!(cache.is_empty());
    }
}
