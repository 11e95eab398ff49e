//! SDK-side metrics for observability and operational monitoring.
//!
//! This module provides a pluggable metrics trait (`SdkMetrics`) that SDK users
//! can implement to collect telemetry from the client. Two implementations are
//! included:
//!
//! - [`NoopSdkMetrics`]: Zero-overhead default that discards all metrics.
//! - [`MetricsSdkMetrics`]: Integration with the [`metrics`](https://docs.rs/metrics) crate facade,
//!   automatically forwarding to whatever recorder is installed (Prometheus, StatsD, etc.).
//!
//! # Metric Names
//!
//! All metrics follow the `shardkv_sdk_` prefix convention:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `shardkv_sdk_requests_total` | Counter | `method`, `status` | Remote calls by method and outcome |
//! | `shardkv_sdk_request_duration_seconds` | Histogram | `method` | Remote call latency distribution |
//! | `shardkv_sdk_batch_flushes_total` | Counter | `reason` | Batch submissions by trigger |
//! | `shardkv_sdk_range_pages_total` | Counter | `kind` | Range scan page fetches |
//! | `shardkv_sdk_sequence_leases_total` | Counter | - | Sequence lease round trips |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shardkv_sdk::{ClientConfig, MetricsSdkMetrics};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::builder()
//!     .with_node("127.0.0.1:7080")
//!     .with_metrics(Arc::new(MetricsSdkMetrics))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc, time::Duration};

/// What triggered a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The caller called `submit()`.
    Explicit,
    /// Appending would have exceeded the batch limit.
    Limit,
    /// A value-returning call needed the pending batch sent first.
    Barrier,
    /// A [`BatchGuard`](crate::BatchGuard) went out of scope.
    Guard,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Limit => write!(f, "limit"),
            Self::Barrier => write!(f, "barrier"),
            Self::Guard => write!(f, "guard"),
        }
    }
}

/// Trait for SDK-side metrics collection.
///
/// Implement this trait to integrate with your metrics backend of choice.
/// All methods have default no-op implementations, so you only need to
/// override the metrics you care about.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` since the SDK shares a single
/// metrics instance across all client clones and sequence allocators.
pub trait SdkMetrics: Send + Sync + fmt::Debug {
    /// Records the outcome of one remote call.
    ///
    /// - `method`: The call name (e.g., "get", "batch", "list_keys").
    /// - `duration`: Wall-clock time of the round trip.
    /// - `success`: Whether both transport and command status were non-negative.
    fn record_request(&self, method: &str, duration: Duration, success: bool) {
        let _ = (method, duration, success);
    }

    /// Records a batch submission.
    fn record_batch_flush(&self, reason: FlushReason, operations: usize) {
        let _ = (reason, operations);
    }

    /// Records one range scan page fetch.
    ///
    /// - `kind`: "keys" or "key_values".
    fn record_range_page(&self, kind: &str, entries: usize) {
        let _ = (kind, entries);
    }

    /// Records one sequence lease round trip.
    fn record_sequence_lease(&self, granularity: u64) {
        let _ = granularity;
    }
}

/// No-op metrics implementation with zero overhead.
///
/// This is the default when no metrics backend is configured.
#[derive(Debug, Clone, Copy)]
pub struct NoopSdkMetrics;

impl SdkMetrics for NoopSdkMetrics {}

/// Metrics implementation using the [`metrics`](https://docs.rs/metrics) crate facade.
///
/// All metric names use the `shardkv_sdk_` prefix.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSdkMetrics;

/// Metric name constants for the `metrics` crate facade.
mod metric_names {
    /// Remote calls by method and outcome.
    pub const REQUESTS_TOTAL: &str = "shardkv_sdk_requests_total";
    /// Remote call duration distribution.
    pub const REQUEST_DURATION: &str = "shardkv_sdk_request_duration_seconds";
    /// Batch submissions by trigger.
    pub const BATCH_FLUSHES_TOTAL: &str = "shardkv_sdk_batch_flushes_total";
    /// Range scan page fetches.
    pub const RANGE_PAGES_TOTAL: &str = "shardkv_sdk_range_pages_total";
    /// Sequence lease round trips.
    pub const SEQUENCE_LEASES_TOTAL: &str = "shardkv_sdk_sequence_leases_total";
}

impl SdkMetrics for MetricsSdkMetrics {
    fn record_request(&self, method: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        metrics::counter!(metric_names::REQUESTS_TOTAL, "method" => method.to_owned(), "status" => status).increment(1);
        metrics::histogram!(metric_names::REQUEST_DURATION, "method" => method.to_owned())
            .record(duration.as_secs_f64());
    }

    fn record_batch_flush(&self, reason: FlushReason, _operations: usize) {
        metrics::counter!(metric_names::BATCH_FLUSHES_TOTAL, "reason" => reason.to_string())
            .increment(1);
    }

    fn record_range_page(&self, kind: &str, _entries: usize) {
        metrics::counter!(metric_names::RANGE_PAGES_TOTAL, "kind" => kind.to_owned()).increment(1);
    }

    fn record_sequence_lease(&self, _granularity: u64) {
        metrics::counter!(metric_names::SEQUENCE_LEASES_TOTAL).increment(1);
    }
}

/// Creates the default metrics instance (no-op).
pub(crate) fn default_metrics() -> Arc<dyn SdkMetrics> {
    Arc::new(NoopSdkMetrics)
}
