//! Single-pass access to the response of one remote call.
//!
//! A [`ResultCursor`] owns exactly one [`ResponseHandle`]. The handle is
//! released by [`ResultCursor::close`]; dropping an unclosed cursor releases it
//! as well and logs a warning, so leaks show up in logs rather than as
//! exhausted transport resources.

use std::{collections::VecDeque, time::Duration};

use shardkv_types::{StatusCode, status_name};
use tracing::{trace, warn};

use crate::{
    error::{Result, SdkError},
    transport::{Entry, Response, ResponseHandle},
};

/// Decoded response of one remote call.
///
/// Iteration is forward-only and not restartable: entries are consumed as the
/// cursor advances. Request a fresh result to iterate again.
#[derive(Debug)]
pub struct ResultCursor {
    transport_status: StatusCode,
    command_status: StatusCode,
    entries: VecDeque<Entry>,
    elapsed: Duration,
    handle: Option<Box<dyn ResponseHandle>>,
}

impl ResultCursor {
    /// Takes ownership of a transport response.
    ///
    /// When the transport status is negative no data was exchanged, so any
    /// entries the transport attached are discarded.
    #[must_use]
    pub fn new(response: Response) -> Self {
        let Response { transport_status, command_status, entries, elapsed, handle } = response;
        let entries =
            if transport_status.is_error() { VecDeque::new() } else { VecDeque::from(entries) };
        Self { transport_status, command_status, entries, elapsed, handle: Some(handle) }
    }

    /// Creates an already-successful cursor with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Response::empty())
    }

    /// Positions the cursor on the first entry.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ResultClosed`] after [`close`](Self::close).
    pub fn begin(&mut self) -> Result<()> {
        if self.is_closed() {
            return Err(SdkError::ResultClosed);
        }
        Ok(())
    }

    /// Advances to the next entry.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ResultClosed`] after [`close`](Self::close).
    pub fn next(&mut self) -> Result<()> {
        if self.is_closed() {
            return Err(SdkError::ResultClosed);
        }
        self.entries.pop_front();
        Ok(())
    }

    /// Returns true when no current entry exists.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.current().is_none()
    }

    /// Key of the current entry.
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        self.current().map(|entry| entry.key.as_slice())
    }

    /// Value of the current entry.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.current().map(|entry| entry.value.as_slice())
    }

    /// Per-entry status of the current entry.
    #[must_use]
    pub fn entry_status(&self) -> Option<StatusCode> {
        self.current().map(|entry| entry.status)
    }

    /// Numeric payload of the current entry, if it is non-negative.
    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.signed_number().and_then(|n| u64::try_from(n).ok())
    }

    /// Signed numeric payload of the current entry.
    #[must_use]
    pub fn signed_number(&self) -> Option<i64> {
        self.current().and_then(|entry| entry.number)
    }

    /// Returns true if the current entry reports success.
    ///
    /// For conditional operations this distinguishes "value written" from
    /// "test failed" without raising an error.
    #[must_use]
    pub fn is_conditional_success(&self) -> bool {
        self.entry_status().is_some_and(StatusCode::is_success)
    }

    /// Overall transport status.
    #[must_use]
    pub fn transport_status(&self) -> StatusCode {
        self.transport_status
    }

    /// Overall command status.
    #[must_use]
    pub fn command_status(&self) -> StatusCode {
        self.command_status
    }

    /// Round-trip time of the call.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of entries not yet consumed, including the current one.
    #[must_use]
    pub fn remaining(&self) -> usize {
        if self.is_closed() { 0 } else { self.entries.len() }
    }

    /// Converts a negative transport or command status into an error.
    ///
    /// # Errors
    ///
    /// Returns the error matching the first negative status, transport first.
    pub fn check(&self, context: &str) -> Result<()> {
        if self.transport_status.is_error() {
            return Err(SdkError::from_status(self.transport_status, context));
        }
        if self.command_status.is_error() {
            return Err(SdkError::from_status(self.command_status, context));
        }
        Ok(())
    }

    /// Removes and returns the current entry.
    pub fn take_entry(&mut self) -> Option<Entry> {
        if self.is_closed() {
            return None;
        }
        self.entries.pop_front()
    }

    /// Drains the remaining keys and closes the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the call failed or the cursor is already closed.
    pub fn collect_keys(mut self) -> Result<Vec<Vec<u8>>> {
        let keys = self
            .begin()
            .and_then(|()| self.check("collect keys"))
            .map(|()| self.entries.drain(..).map(|entry| entry.key).collect());
        self.close();
        keys
    }

    /// Drains the remaining key-value pairs and closes the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the call failed or the cursor is already closed.
    pub fn collect_key_values(mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let pairs = self
            .begin()
            .and_then(|()| self.check("collect key values"))
            .map(|()| self.entries.drain(..).map(|entry| (entry.key, entry.value)).collect());
        self.close();
        pairs
    }

    /// Checks the call status, takes the first entry and closes the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the call failed or the cursor is already closed.
    pub fn into_first_entry(mut self, context: &str) -> Result<Option<Entry>> {
        let entry = self
            .begin()
            .and_then(|()| self.check(context))
            .map(|()| self.take_entry());
        self.close();
        entry
    }

    /// Releases the response handle. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            self.entries.clear();
            trace!(status = status_name(self.transport_status.as_i32()), "Released result");
        }
    }

    /// Returns true once the handle has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn current(&self) -> Option<&Entry> {
        if self.is_closed() {
            return None;
        }
        self.entries.front()
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(remaining = self.entries.len(), "Result dropped without close, releasing");
            self.close();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Debug)]
    struct CountingHandle(Arc<AtomicUsize>);

    impl ResponseHandle for CountingHandle {
        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn response(entries: Vec<Entry>, releases: &Arc<AtomicUsize>) -> Response {
        Response {
            transport_status: StatusCode::Success,
            command_status: StatusCode::Success,
            entries,
            elapsed: Duration::from_millis(3),
            handle: Box::new(CountingHandle(Arc::clone(releases))),
        }
    }

    #[test]
    fn test_forward_iteration() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor = ResultCursor::new(response(
            vec![Entry::new(b"a".to_vec(), b"1".to_vec()), Entry::new(b"b".to_vec(), b"2".to_vec())],
            &releases,
        ));

        cursor.begin().unwrap();
        assert_eq!(cursor.key(), Some(b"a".as_slice()));
        assert_eq!(cursor.value(), Some(b"1".as_slice()));
        cursor.next().unwrap();
        assert_eq!(cursor.key(), Some(b"b".as_slice()));
        cursor.next().unwrap();
        assert!(cursor.is_end());
        assert_eq!(cursor.elapsed(), Duration::from_millis(3));
        cursor.close();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_entry_consumes_in_order() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor = ResultCursor::new(response(
            vec![
                Entry::new(b"a".to_vec(), b"1".to_vec()),
                Entry::with_status(b"b".to_vec(), StatusCode::Failed),
            ],
            &releases,
        ));

        assert_eq!(cursor.take_entry().unwrap().value, b"1".to_vec());
        assert_eq!(cursor.entry_status(), Some(StatusCode::Failed));
        assert_eq!(cursor.take_entry().unwrap().key, b"b".to_vec());
        assert!(cursor.take_entry().is_none());
        cursor.close();
        assert!(cursor.take_entry().is_none());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor = ResultCursor::new(response(vec![], &releases));
        cursor.close();
        cursor.close();
        drop(cursor);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_unclosed_handle() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let _cursor = ResultCursor::new(response(vec![], &releases));
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_cursor_rejects_access() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor =
            ResultCursor::new(response(vec![Entry::new(b"a".to_vec(), vec![])], &releases));
        cursor.close();
        assert!(matches!(cursor.begin(), Err(SdkError::ResultClosed)));
        assert!(matches!(cursor.next(), Err(SdkError::ResultClosed)));
        assert!(cursor.is_end());
        assert_eq!(cursor.key(), None);
    }

    #[test]
    fn test_transport_failure_hides_entries() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut resp = response(vec![Entry::new(b"a".to_vec(), vec![])], &releases);
        resp.transport_status = StatusCode::NoConnection;
        let mut cursor = ResultCursor::new(resp);
        assert!(cursor.is_end());
        let err = cursor.check("get").unwrap_err();
        assert!(err.is_connectivity());
        cursor.close();
    }

    #[test]
    fn test_command_failure_reported() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut resp = response(vec![], &releases);
        resp.command_status = StatusCode::BadSchema;
        let mut cursor = ResultCursor::new(resp);
        let err = cursor.check("no table selected").unwrap_err();
        assert!(matches!(err, SdkError::BadSchema { .. }));
        cursor.close();
    }

    #[test]
    fn test_numbers_and_conditional_status() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut added = Entry::new(b"n".to_vec(), b"-4".to_vec());
        added.number = Some(-4);
        let failed = Entry::with_status(b"k".to_vec(), StatusCode::Failed);
        let mut cursor = ResultCursor::new(response(vec![added, failed], &releases));

        assert_eq!(cursor.signed_number(), Some(-4));
        assert_eq!(cursor.number(), None);
        assert!(cursor.is_conditional_success());
        cursor.next().unwrap();
        assert!(!cursor.is_conditional_success());
        assert_eq!(cursor.entry_status(), Some(StatusCode::Failed));
        cursor.close();
    }

    #[test]
    fn test_collect_key_values_closes() {
        let releases = Arc::new(AtomicUsize::new(0));
        let cursor = ResultCursor::new(response(
            vec![Entry::new(b"a".to_vec(), b"1".to_vec()), Entry::new(b"b".to_vec(), b"2".to_vec())],
            &releases,
        ));
        let pairs = cursor.collect_key_values().unwrap();
        assert_eq!(pairs, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_cursor() {
        let cursor = ResultCursor::empty();
        assert!(cursor.is_end());
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.check("submit").is_ok());
        assert!(cursor.collect_keys().unwrap().is_empty());
    }
}
