//! Client configuration with builder pattern.
//!
//! Provides type-safe configuration for SDK clients including:
//! - Controller node addresses
//! - Timeout tiers
//! - Batching, scan and sequence settings
//! - Default read consistency
//! - Metrics sink

use std::{fmt, sync::Arc};

use shardkv_types::{
    ConsistencyLevel,
    config::{BatchConfig, ScanConfig, SequenceConfig, TimeoutConfig},
};
use snafu::ensure;

use crate::{
    error::{ConfigSnafu, Result},
    metrics::{SdkMetrics, default_metrics},
};

/// Configuration for the shardkv client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Controller node addresses in `host:port` form.
    pub(crate) nodes: Vec<String>,

    /// Timeout tiers forwarded to the transport.
    pub(crate) timeouts: TimeoutConfig,

    /// Initial batching settings.
    pub(crate) batch: BatchConfig,

    /// Range scan settings.
    pub(crate) scan: ScanConfig,

    /// Sequence allocation settings.
    pub(crate) sequence: SequenceConfig,

    /// Initial read consistency level.
    pub(crate) consistency: ConsistencyLevel,

    /// Metrics sink.
    pub(crate) metrics: Arc<dyn SdkMetrics>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("nodes", &self.nodes)
            .field("timeouts", &self.timeouts)
            .field("batch", &self.batch)
            .field("scan", &self.scan)
            .field("sequence", &self.sequence)
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the configured controller nodes.
    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Returns the timeout tiers.
    #[must_use]
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Returns the batching settings.
    #[must_use]
    pub fn batch(&self) -> &BatchConfig {
        &self.batch
    }

    /// Returns the range scan settings.
    #[must_use]
    pub fn scan(&self) -> &ScanConfig {
        &self.scan
    }

    /// Returns the sequence settings.
    #[must_use]
    pub fn sequence(&self) -> &SequenceConfig {
        &self.sequence
    }

    /// Returns the initial read consistency level.
    #[must_use]
    pub fn consistency(&self) -> ConsistencyLevel {
        self.consistency
    }

    /// Returns the metrics sink.
    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn SdkMetrics> {
        &self.metrics
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    nodes: Vec<String>,
    timeouts: Option<TimeoutConfig>,
    batch: Option<BatchConfig>,
    scan: Option<ScanConfig>,
    sequence: Option<SequenceConfig>,
    consistency: Option<ConsistencyLevel>,
    metrics: Option<Arc<dyn SdkMetrics>>,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("nodes", &self.nodes)
            .field("timeouts", &self.timeouts)
            .field("batch", &self.batch)
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

impl ClientConfigBuilder {
    /// Sets the controller node addresses.
    ///
    /// At least one node must be provided, each in `host:port` form.
    #[must_use]
    pub fn with_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a single controller node address.
    #[must_use]
    pub fn with_node<S: Into<String>>(mut self, node: S) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Sets the timeout tiers.
    ///
    /// Default: [`TimeoutConfig::default()`].
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the initial batching settings.
    ///
    /// Default: [`BatchConfig::default()`].
    #[must_use]
    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = Some(batch);
        self
    }

    /// Sets the range scan settings.
    #[must_use]
    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = Some(scan);
        self
    }

    /// Sets the sequence settings.
    #[must_use]
    pub fn with_sequence(mut self, sequence: SequenceConfig) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Sets the initial read consistency level.
    ///
    /// Default: [`ConsistencyLevel::Strict`].
    #[must_use]
    pub fn with_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Sets the metrics sink.
    ///
    /// Default: [`NoopSdkMetrics`](crate::NoopSdkMetrics).
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn SdkMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No nodes provided
    /// - Any node address is not `host:port`
    /// - Any embedded config fails its own validation
    pub fn build(self) -> Result<ClientConfig> {
        ensure!(!self.nodes.is_empty(), ConfigSnafu { message: "at least one node is required" });

        for node in &self.nodes {
            validate_node(node)?;
        }

        let timeouts = self.timeouts.unwrap_or_default();
        timeouts.validate()?;
        let batch = self.batch.unwrap_or_default();
        batch.validate()?;
        let scan = self.scan.unwrap_or_default();
        scan.validate()?;
        let sequence = self.sequence.unwrap_or_default();
        sequence.validate()?;

        Ok(ClientConfig {
            nodes: self.nodes,
            timeouts,
            batch,
            scan,
            sequence,
            consistency: self.consistency.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_else(default_metrics),
        })
    }
}

/// Validates a `host:port` node address.
fn validate_node(node: &str) -> Result<()> {
    let Some((host, port)) = node.rsplit_once(':') else {
        return ConfigSnafu { message: format!("node '{node}' must be in host:port form") }.fail();
    };
    ensure!(!host.is_empty(), ConfigSnafu { message: format!("node '{node}' has an empty host") });
    ensure!(
        port.parse::<u16>().is_ok_and(|port| port != 0),
        ConfigSnafu { message: format!("node '{node}' has an invalid port") }
    );
    Ok(())
}
