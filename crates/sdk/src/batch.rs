//! Request batching.
//!
//! [`RequestBatch`] accumulates commands between `begin` and `submit`, and
//! decides when they reach the remote store according to its [`BatchMode`]:
//!
//! - `Default`: an append that would exceed the limit first flushes the
//!   pending commands, then starts a new batch with the appended command.
//! - `NoAutoSubmit`: such an append is refused and the batch is unchanged.
//! - `Single`: every append is submitted alone, synchronously.
//!
//! Entries of a submitted batch come back in append order, so callers match
//! commands and entries by position.

use std::{sync::Arc, time::Instant};

use shardkv_types::{BatchMode, config::BatchConfig};
use snafu::ensure;
use tracing::{debug, warn};

use crate::{
    client::Client,
    cursor::ResultCursor,
    error::{BatchLimitExceededSnafu, ConfigSnafu, Result},
    metrics::{FlushReason, SdkMetrics},
    operation::Command,
    transport::{Request, Transport},
};

/// Sends requests to the transport and records their outcome.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
    metrics: Arc<dyn SdkMetrics>,
}

impl Dispatcher {
    pub(crate) fn new(transport: Arc<dyn Transport>, metrics: Arc<dyn SdkMetrics>) -> Self {
        Self { transport, metrics }
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn metrics(&self) -> &Arc<dyn SdkMetrics> {
        &self.metrics
    }

    /// Sends `commands` as one round trip. An empty request never reaches the
    /// transport.
    pub(crate) fn submit(&self, method: &'static str, commands: Vec<Command>) -> ResultCursor {
        if commands.is_empty() {
            return ResultCursor::empty();
        }

        let request = Request::new(commands);
        debug!(
            method,
            operations = request.commands.len(),
            bytes = request.serialized_size(),
            "Submitting request"
        );

        let start = Instant::now();
        let response = self.transport.execute(&request);
        let success = !response.transport_status.is_error() && !response.command_status.is_error();
        self.metrics.record_request(method, start.elapsed(), success);

        if !success {
            warn!(
                method,
                transport_status = %response.transport_status,
                command_status = %response.command_status,
                "Request failed"
            );
        }
        ResultCursor::new(response)
    }

    /// Sends a single command, bypassing any pending batch.
    pub(crate) fn submit_one(&self, command: Command) -> ResultCursor {
        let method = command.operation.name();
        self.submit(method, vec![command])
    }
}

/// Outcome of [`RequestBatch::append`].
#[derive(Debug)]
#[must_use = "cursors must be closed"]
pub enum Appended {
    /// The command was queued; nothing was sent.
    Queued,
    /// The pending commands were flushed to make room; the cursor holds their
    /// result and the appended command starts the new batch.
    Flushed(ResultCursor),
    /// `Single` mode: the command was sent alone and this is its result.
    Submitted(ResultCursor),
}

/// Accumulator for commands sent together in one round trip.
#[derive(Debug)]
pub struct RequestBatch {
    dispatcher: Dispatcher,
    commands: Vec<Command>,
    size_bytes: usize,
    mode: BatchMode,
    limit_bytes: usize,
    open: bool,
}

impl RequestBatch {
    pub(crate) fn new(dispatcher: Dispatcher, config: &BatchConfig) -> Self {
        Self {
            dispatcher,
            commands: Vec::new(),
            size_bytes: 0,
            mode: config.mode,
            limit_bytes: config.limit_bytes,
            open: false,
        }
    }

    /// Discards pending commands and opens a new batch.
    pub fn begin(&mut self) {
        if !self.commands.is_empty() {
            debug!(discarded = self.commands.len(), "Discarding pending commands on begin");
        }
        self.clear();
        self.open = true;
    }

    /// Appends one command according to the batch mode.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BatchLimitExceeded`](crate::SdkError::BatchLimitExceeded)
    /// in `NoAutoSubmit` mode when the command does not fit; the batch is left
    /// unchanged. In `Default` mode, returns the error of a failed limit flush;
    /// the flushed commands are gone and the appended command is not queued.
    pub fn append(&mut self, command: Command) -> Result<Appended> {
        let command_size = command.serialized_size();
        match self.mode {
            BatchMode::Single => Ok(Appended::Submitted(self.dispatcher.submit_one(command))),
            BatchMode::NoAutoSubmit => {
                let requested = self.size_bytes + command_size;
                ensure!(
                    requested <= self.limit_bytes,
                    BatchLimitExceededSnafu { limit: self.limit_bytes, requested }
                );
                self.push(command, command_size);
                Ok(Appended::Queued)
            },
            BatchMode::Default => {
                if !self.commands.is_empty() && self.size_bytes + command_size > self.limit_bytes {
                    let mut cursor = self.flush(FlushReason::Limit);
                    // the appended command is dropped if the flush failed
                    if let Err(err) = cursor.check("batch flush") {
                        cursor.close();
                        return Err(err);
                    }
                    self.push(command, command_size);
                    return Ok(Appended::Flushed(cursor));
                }
                self.push(command, command_size);
                Ok(Appended::Queued)
            },
        }
    }

    /// Sends every pending command as one round trip and closes the batch.
    ///
    /// An empty batch produces an empty, successful result without contacting
    /// the remote store.
    pub fn submit(&mut self) -> ResultCursor {
        self.submit_with(FlushReason::Explicit)
    }

    pub(crate) fn submit_with(&mut self, reason: FlushReason) -> ResultCursor {
        self.open = false;
        self.flush(reason)
    }

    /// Discards pending commands without sending them and closes the batch.
    pub fn cancel(&mut self) {
        if !self.commands.is_empty() {
            debug!(discarded = self.commands.len(), "Cancelled batch");
        }
        self.clear();
        self.open = false;
    }

    /// Sends the pending commands, keeping the batch open.
    pub(crate) fn flush(&mut self, reason: FlushReason) -> ResultCursor {
        let commands = std::mem::take(&mut self.commands);
        let bytes = std::mem::take(&mut self.size_bytes);
        if !commands.is_empty() {
            debug!(%reason, operations = commands.len(), bytes, mode = %self.mode, "Flushing batch");
            self.dispatcher.metrics().record_batch_flush(reason, commands.len());
        }
        self.dispatcher.submit("batch", commands)
    }

    /// Returns true between `begin` and the next `submit`/`cancel`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Summed serialized size of the pending commands.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Current batch mode.
    #[must_use]
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Changes the batch mode for subsequent appends.
    pub fn set_mode(&mut self, mode: BatchMode) {
        self.mode = mode;
    }

    /// Current batch limit in bytes.
    #[must_use]
    pub fn limit_bytes(&self) -> usize {
        self.limit_bytes
    }

    /// Changes the batch limit for subsequent appends.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`](crate::SdkError::Config) if `limit` is zero.
    pub fn set_limit_bytes(&mut self, limit: usize) -> Result<()> {
        ensure!(limit > 0, ConfigSnafu { message: "batch limit must be > 0" });
        self.limit_bytes = limit;
        Ok(())
    }

    fn push(&mut self, command: Command, size: usize) {
        self.size_bytes += size;
        self.commands.push(command);
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.size_bytes = 0;
    }
}

/// Scoped batch: submits the pending commands when dropped unless cancelled.
///
/// Created by [`Client::begin_guard`].
///
/// ```no_run
/// # use shardkv_sdk::Client;
/// # fn example(client: &Client) -> shardkv_sdk::Result<()> {
/// {
///     let _batch = client.begin_guard();
///     client.set("a", "1")?;
///     client.set("b", "2")?;
/// } // submitted here
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
#[must_use = "dropping the guard immediately submits an empty batch"]
pub struct BatchGuard {
    client: Client,
    armed: bool,
}

impl BatchGuard {
    pub(crate) fn new(client: Client) -> Self {
        Self { client, armed: true }
    }

    /// Submits now and returns the result.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed round trip.
    pub fn submit(mut self) -> Result<ResultCursor> {
        self.armed = false;
        self.client.submit()
    }

    /// Discards the pending commands; nothing is sent on drop.
    pub fn cancel(mut self) {
        self.armed = false;
        self.client.cancel();
    }

    /// Alias of [`cancel`](Self::cancel).
    pub fn rollback(self) {
        self.cancel();
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if self.armed {
            match self.client.submit_with(FlushReason::Guard) {
                Ok(mut cursor) => cursor.close(),
                Err(err) => warn!(error = %err, "Batch submit on scope exit failed"),
            }
        }
    }
}
