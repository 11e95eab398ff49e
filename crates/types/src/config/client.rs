//! Client engine configuration: timeout tiers, batching, scans and sequences.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::types::BatchMode;

/// Default page granularity for range scans.
pub const DEFAULT_PAGE_GRANULARITY: u32 = 100;

/// Default lease size for sequence allocation.
pub const DEFAULT_SEQUENCE_GRANULARITY: u64 = 1000;

/// Default batch size limit: 1 MiB of serialized operations.
pub const DEFAULT_BATCH_LIMIT_BYTES: usize = 1024 * 1024;

// =========================================================================
// TimeoutConfig
// =========================================================================

/// Timeout tiers enforced by the transport.
///
/// The engine treats these as opaque: an expired tier surfaces as a timeout
/// status on the affected call.
///
/// # Validation Rules
///
/// - every tier must be non-zero
///
/// Tiers are independent: a global timeout shorter than a discovery timeout
/// is valid and simply expires first.
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use shardkv_types::config::TimeoutConfig;
/// let config = TimeoutConfig::builder()
///     .global(Duration::from_secs(30))
///     .build()
///     .expect("valid timeout config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeoutConfig {
    /// Overall bound on a single call.
    #[serde(default = "default_global_timeout")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub global: Duration,
    /// Bound on discovering the cluster master.
    #[serde(default = "default_master_timeout")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub master: Duration,
    /// Bound on discovering the primary of a replica group.
    #[serde(default = "default_primary_timeout")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub primary: Duration,
}

#[bon::bon]
impl TimeoutConfig {
    /// Creates a new timeout configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a tier is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_global_timeout())] global: Duration,
        #[builder(default = default_master_timeout())] master: Duration,
        #[builder(default = default_primary_timeout())] primary: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { global, master, primary };
        config.validate()?;
        Ok(config)
    }
}

impl TimeoutConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in
            [("global", self.global), ("master", self.master), ("primary", self.primary)]
        {
            if value.is_zero() {
                return Err(ConfigError::Validation {
                    message: format!("{name} timeout cannot be zero"),
                });
            }
        }
        Ok(())
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            global: default_global_timeout(),
            master: default_master_timeout(),
            primary: default_primary_timeout(),
        }
    }
}

fn default_global_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_master_timeout() -> Duration {
    Duration::from_secs(21)
}

fn default_primary_timeout() -> Duration {
    Duration::from_secs(21)
}

// =========================================================================
// BatchConfig
// =========================================================================

/// Request batching configuration.
///
/// # Validation Rules
///
/// - `limit_bytes` must be > 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchConfig {
    /// Flush policy.
    #[serde(default)]
    #[schemars(with = "String")]
    pub mode: BatchMode,
    /// Upper bound on the serialized size of one batch.
    #[serde(default = "default_batch_limit")]
    pub limit_bytes: usize,
}

#[bon::bon]
impl BatchConfig {
    /// Creates a new batch configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `limit_bytes` is zero.
    #[builder]
    pub fn new(
        #[builder(default)] mode: BatchMode,
        #[builder(default = default_batch_limit())] limit_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { mode, limit_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl BatchConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "limit_bytes must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { mode: BatchMode::default(), limit_bytes: default_batch_limit() }
    }
}

fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT_BYTES
}

// =========================================================================
// ScanConfig
// =========================================================================

/// Range scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScanConfig {
    /// Entries fetched per remote page.
    #[serde(default = "default_page_granularity")]
    pub page_granularity: u32,
}

#[bon::bon]
impl ScanConfig {
    /// Creates a new scan configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `page_granularity` is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_page_granularity())] page_granularity: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self { page_granularity };
        config.validate()?;
        Ok(config)
    }
}

impl ScanConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_granularity == 0 {
            return Err(ConfigError::Validation {
                message: "page_granularity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { page_granularity: default_page_granularity() }
    }
}

fn default_page_granularity() -> u32 {
    DEFAULT_PAGE_GRANULARITY
}

// =========================================================================
// SequenceConfig
// =========================================================================

/// Sequence allocation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SequenceConfig {
    /// Values leased per remote increment.
    #[serde(default = "default_sequence_granularity")]
    pub granularity: u64,
}

#[bon::bon]
impl SequenceConfig {
    /// Creates a new sequence configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `granularity` is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_sequence_granularity())] granularity: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self { granularity };
        config.validate()?;
        Ok(config)
    }
}

impl SequenceConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.granularity == 0 {
            return Err(ConfigError::Validation {
                message: "granularity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { granularity: default_sequence_granularity() }
    }
}

fn default_sequence_granularity() -> u64 {
    DEFAULT_SEQUENCE_GRANULARITY
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config_defaults_are_valid() {
        let config = TimeoutConfig::builder().build().expect("defaults should be valid");
        assert_eq!(config, TimeoutConfig::default());
        assert_eq!(config.global, Duration::from_secs(120));
    }

    #[test]
    fn test_timeout_config_zero_rejected() {
        let err = TimeoutConfig::builder().master(Duration::ZERO).build().unwrap_err();
        assert!(err.to_string().contains("master timeout cannot be zero"));
    }

    #[test]
    fn test_timeout_config_global_below_discovery_accepted() {
        let config = TimeoutConfig::builder()
            .global(Duration::from_secs(15))
            .build()
            .expect("tiers are independent");
        assert_eq!(config.global, Duration::from_secs(15));
        assert_eq!(config.master, Duration::from_secs(21));
    }

    #[test]
    fn test_timeout_config_humantime_serde() {
        let config = TimeoutConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"2m\""));
        let parsed: TimeoutConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_timeout_config_serde_defaults() {
        let parsed: TimeoutConfig = serde_json::from_str(r#"{"global":"30s"}"#).unwrap();
        assert_eq!(parsed.global, Duration::from_secs(30));
        assert_eq!(parsed.master, Duration::from_secs(21));
    }

    #[test]
    fn test_batch_config_defaults() {
        let config = BatchConfig::builder().build().unwrap();
        assert_eq!(config.mode, BatchMode::Default);
        assert_eq!(config.limit_bytes, DEFAULT_BATCH_LIMIT_BYTES);
    }

    #[test]
    fn test_batch_config_zero_limit_rejected() {
        let result = BatchConfig::builder().limit_bytes(0).build();
        assert!(result.unwrap_err().to_string().contains("limit_bytes"));
    }

    #[test]
    fn test_batch_config_mode_serde() {
        let parsed: BatchConfig = serde_json::from_str(r#"{"mode":"no_auto_submit"}"#).unwrap();
        assert_eq!(parsed.mode, BatchMode::NoAutoSubmit);
        assert_eq!(parsed.limit_bytes, DEFAULT_BATCH_LIMIT_BYTES);
    }

    #[test]
    fn test_scan_config_validation() {
        assert_eq!(ScanConfig::default().page_granularity, 100);
        assert!(ScanConfig::builder().page_granularity(0).build().is_err());
        assert!(ScanConfig::builder().page_granularity(1).build().is_ok());
    }

    #[test]
    fn test_sequence_config_validation() {
        assert_eq!(SequenceConfig::default().granularity, 1000);
        assert!(SequenceConfig::builder().granularity(0).build().is_err());
    }
}
