//! Test configuration helpers.
//!
//! Provides sensible default configurations for tests, centralizing
//! magic values that would otherwise be scattered across test modules.

use std::time::Duration;

use shardkv_types::{
    BatchMode,
    config::{BatchConfig, ScanConfig, SequenceConfig, TimeoutConfig},
};

/// Node address used by test clients. Nothing listens on it.
pub const TEST_NODE: &str = "127.0.0.1:7080";

/// Returns a batch configuration suitable for tests.
///
/// - `mode`: `Default` (auto-flush on limit)
/// - `limit_bytes`: 4 KiB (small enough that tests can reach it)
#[must_use]
pub fn test_batch_config() -> BatchConfig {
    BatchConfig { mode: BatchMode::Default, limit_bytes: 4 * 1024 }
}

/// Returns a scan configuration with a small page size, so scans over a few
/// dozen keys already span several pages.
#[must_use]
pub fn test_scan_config() -> ScanConfig {
    ScanConfig { page_granularity: 10 }
}

/// Returns a sequence configuration with a small lease size.
#[must_use]
pub fn test_sequence_config() -> SequenceConfig {
    SequenceConfig { granularity: 10 }
}

/// Returns short timeout tiers for tests.
///
/// - `global`: 5s
/// - `master`/`primary`: 1s
#[must_use]
pub fn test_timeout_config() -> TimeoutConfig {
    TimeoutConfig {
        global: Duration::from_secs(5),
        master: Duration::from_secs(1),
        primary: Duration::from_secs(1),
    }
}
