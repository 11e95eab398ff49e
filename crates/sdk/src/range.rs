//! Range scans.
//!
//! A scan fetches pages of at most `page_granularity` entries, sorts each page
//! locally with [`ByteOrder`] (the remote store does not guarantee order) and
//! hands entries out one at a time. When a page is exhausted:
//!
//! - a page shorter than the granularity means no more data exists;
//! - otherwise the next page is requested starting at the last returned key,
//!   with the continuation flag set so that key is not returned twice.
//!
//! The `count` budget caps both the page requests and the yielded entries. A
//! failed page fetch ends the iteration; the error is kept for inspection.

use std::{collections::VecDeque, iter::FusedIterator};

use shardkv_types::{ByteOrder, ConsistencyLevel, Direction, Key, TableId};
use tracing::{debug, warn};

use crate::{
    batch::Dispatcher,
    error::SdkError,
    operation::{Command, Operation},
};

/// Parameters of a range scan.
///
/// Empty byte strings mean "unbounded". For forward scans `start_key` is the
/// inclusive lower bound and `end_key` the exclusive upper bound; backward
/// scans walk from `start_key` down to `end_key`.
///
/// # Example
///
/// ```no_run
/// # use shardkv_sdk::RangeQuery;
/// let query = RangeQuery::with_prefix("user:").count(50).backward();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeQuery {
    /// Only keys starting with this prefix match.
    pub prefix: Vec<u8>,
    /// First key of the scan.
    pub start_key: Vec<u8>,
    /// Scan boundary, exclusive.
    pub end_key: Vec<u8>,
    /// Maximum number of entries; `None` means unlimited.
    pub count: Option<u64>,
    /// Scan direction.
    pub direction: Direction,
    /// Set on continuation requests: exclude `start_key` itself.
    pub(crate) skip: bool,
}

impl RangeQuery {
    /// Creates an unbounded forward query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query restricted to keys with the given prefix.
    pub fn with_prefix(prefix: impl Into<Key>) -> Self {
        Self { prefix: prefix.into().into_bytes(), ..Default::default() }
    }

    /// Sets the prefix filter.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<Key>) -> Self {
        self.prefix = prefix.into().into_bytes();
        self
    }

    /// Sets the first key of the scan.
    #[must_use]
    pub fn start_key(mut self, key: impl Into<Key>) -> Self {
        self.start_key = key.into().into_bytes();
        self
    }

    /// Sets the exclusive scan boundary.
    #[must_use]
    pub fn end_key(mut self, key: impl Into<Key>) -> Self {
        self.end_key = key.into().into_bytes();
        self
    }

    /// Caps the number of entries.
    #[must_use]
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the scan direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Scans in descending byte order.
    #[must_use]
    pub fn backward(self) -> Self {
        self.direction(Direction::Backward)
    }

    /// Returns true on continuation requests, where `start_key` itself was
    /// already returned and must be excluded.
    #[must_use]
    pub fn is_continuation(&self) -> bool {
        self.skip
    }

    /// Returns true if `key` lies within the prefix and key bounds.
    ///
    /// The count budget is not considered.
    #[must_use]
    pub fn matches(&self, key: &[u8]) -> bool {
        use std::cmp::Ordering;

        if !key.starts_with(&self.prefix) {
            return false;
        }
        let after_start = |ordering: Ordering| match ordering {
            Ordering::Equal => !self.skip,
            Ordering::Greater => true,
            Ordering::Less => false,
        };
        let start_ok = self.start_key.is_empty()
            || after_start(ByteOrder::compare_directed(key, &self.start_key, self.direction));
        let end_ok = self.end_key.is_empty()
            || ByteOrder::compare_directed(key, &self.end_key, self.direction) == Ordering::Less;
        start_ok && end_ok
    }

    pub(crate) fn serialized_size(&self) -> usize {
        // count, direction and skip flag
        self.prefix.len() + self.start_key.len() + self.end_key.len() + 8 + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanKind {
    Keys,
    KeyValues,
}

impl ScanKind {
    fn label(self) -> &'static str {
        match self {
            Self::Keys => "keys",
            Self::KeyValues => "key_values",
        }
    }
}

/// Paging state shared by both iterator flavors.
#[derive(Debug)]
struct RangeScan {
    dispatcher: Dispatcher,
    table: TableId,
    consistency: ConsistencyLevel,
    kind: ScanKind,
    query: RangeQuery,
    granularity: u64,
    page: VecDeque<(Vec<u8>, Vec<u8>)>,
    continuation: Option<Vec<u8>>,
    remaining: Option<u64>,
    last_page_len: u64,
    fetches: usize,
    done: bool,
    error: Option<SdkError>,
}

impl RangeScan {
    fn new(
        dispatcher: Dispatcher,
        table: TableId,
        consistency: ConsistencyLevel,
        kind: ScanKind,
        query: RangeQuery,
        granularity: u32,
    ) -> Self {
        let remaining = query.count;
        Self {
            dispatcher,
            table,
            consistency,
            kind,
            query,
            granularity: u64::from(granularity.max(1)),
            page: VecDeque::new(),
            continuation: None,
            remaining,
            last_page_len: 0,
            fetches: 0,
            done: false,
            error: None,
        }
    }

    fn next_pair(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        loop {
            if self.remaining == Some(0) {
                self.finish();
                return None;
            }
            if let Some(pair) = self.page.pop_front() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(pair);
            }
            if self.done {
                return None;
            }
            if self.fetches > 0 && self.last_page_len < self.granularity {
                self.finish();
                return None;
            }
            self.fetch_page();
        }
    }

    fn fetch_page(&mut self) {
        let page_size = self.remaining.map_or(self.granularity, |remaining| {
            remaining.min(self.granularity)
        });

        let mut query = self.query.clone();
        query.count = Some(page_size);
        if let Some(last) = &self.continuation {
            query.start_key.clone_from(last);
            query.skip = true;
        }
        let skip = query.skip;
        let operation = match self.kind {
            ScanKind::Keys => Operation::ListKeys { query },
            ScanKind::KeyValues => Operation::ListKeyValues { query },
        };

        self.fetches += 1;
        let cursor = self.dispatcher.submit_one(Command::new(self.table, self.consistency, operation));
        let mut pairs = match cursor.collect_key_values() {
            Ok(pairs) => pairs,
            Err(err) => {
                warn!(table = %self.table, fetch = self.fetches, error = %err, "Range page fetch failed, ending scan");
                self.error = Some(err);
                self.finish();
                return;
            },
        };

        ByteOrder::sort_pairs(&mut pairs, self.query.direction);
        debug!(
            table = %self.table,
            kind = self.kind.label(),
            page_size,
            returned = pairs.len(),
            skip,
            direction = ?self.query.direction,
            "Fetched range page"
        );
        self.dispatcher.metrics().record_range_page(self.kind.label(), pairs.len());

        self.last_page_len = pairs.len() as u64;
        if pairs.is_empty() {
            self.finish();
        }
        self.continuation = pairs.last().map(|(key, _)| key.clone());
        self.page = pairs.into();
    }

    fn finish(&mut self) {
        self.done = true;
        self.page.clear();
    }
}

/// Lazy, single-pass sequence of keys in a range.
///
/// Keys are yielded exactly once each, in ascending byte order for forward
/// scans and descending for backward scans.
#[derive(Debug)]
pub struct KeyIterator {
    scan: RangeScan,
}

impl KeyIterator {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        table: TableId,
        consistency: ConsistencyLevel,
        query: RangeQuery,
        granularity: u32,
    ) -> Self {
        Self {
            scan: RangeScan::new(dispatcher, table, consistency, ScanKind::Keys, query, granularity),
        }
    }

    /// Error that ended the scan early, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&SdkError> {
        self.scan.error.as_ref()
    }

    /// Number of remote page requests issued so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.scan.fetches
    }
}

impl Iterator for KeyIterator {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan.next_pair().map(|(key, _)| key)
    }
}

impl FusedIterator for KeyIterator {}

/// Lazy, single-pass sequence of key-value pairs in a range.
#[derive(Debug)]
pub struct KeyValueIterator {
    scan: RangeScan,
}

impl KeyValueIterator {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        table: TableId,
        consistency: ConsistencyLevel,
        query: RangeQuery,
        granularity: u32,
    ) -> Self {
        Self {
            scan: RangeScan::new(
                dispatcher,
                table,
                consistency,
                ScanKind::KeyValues,
                query,
                granularity,
            ),
        }
    }

    /// Error that ended the scan early, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&SdkError> {
        self.scan.error.as_ref()
    }

    /// Number of remote page requests issued so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.scan.fetches
    }
}

impl Iterator for KeyValueIterator {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.scan.next_pair()
    }
}

impl FusedIterator for KeyValueIterator {}
