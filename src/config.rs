//! Configuration for the firehose pipeline.
//!
//! All configuration is assembled before pipeline construction and is
//! immutable afterwards: it is passed to
//! [`Firehose::new()`](crate::pipeline::Firehose::new) and never consulted
//! again for live updates. Structs can be built programmatically or
//! deserialized from JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use firehose::config::{FirehoseConfig, ReplayConfig};
//! use firehose::offsets::ReplayWindow;
//!
//! let config = FirehoseConfig {
//!     topic: "events".into(),
//!     replay: Some(ReplayConfig {
//!         window: ReplayWindow::LastFourHours,
//!         end_offset: None,
//!     }),
//!     ..FirehoseConfig::for_testing("events")
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! FirehoseConfig
//! ├── topic: String                 # topic mirrored (same name on both clusters)
//! ├── source: BrokerConfig          # source cluster bootstrap brokers
//! ├── destination: BrokerConfig     # destination cluster bootstrap brokers
//! ├── workers: WorkerConfig         # consumer / producer concurrency
//! ├── queue_capacity: usize         # transfer queue bound (backpressure)
//! ├── replay: Option<ReplayConfig>  # historical window; absent = live tail
//! ├── budget: ErrorBudgetConfig     # per-partition read error thresholds
//! ├── batching: BatchConfig         # destination batching knobs
//! └── monitor: MonitorConfig        # RPS / queue depth reporting ticks
//! ```

use crate::error::{FirehoseError, Result};
use crate::offsets::ReplayWindow;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config: passed to Firehose::new()
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `Firehose::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirehoseConfig {
    /// Topic to mirror. The destination topic carries the same name.
    pub topic: String,

    /// Source cluster connection settings.
    pub source: BrokerConfig,

    /// Destination cluster connection settings.
    pub destination: BrokerConfig,

    /// Worker pool sizes.
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Transfer queue capacity. Enqueues suspend when the queue is full;
    /// this is the pipeline's only flow-control mechanism.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Historical replay window. `None` tails the live stream with no
    /// end offset.
    #[serde(default)]
    pub replay: Option<ReplayConfig>,

    /// Read error thresholds per partition.
    #[serde(default)]
    pub budget: ErrorBudgetConfig,

    /// Destination batching knobs.
    #[serde(default)]
    pub batching: BatchConfig,

    /// Monitoring tick intervals.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_queue_capacity() -> usize {
    100_000
}

impl FirehoseConfig {
    /// Create a minimal config for testing.
    pub fn for_testing(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            source: BrokerConfig {
                brokers: vec!["localhost:9092".to_string()],
            },
            destination: BrokerConfig {
                brokers: vec!["localhost:9093".to_string()],
            },
            workers: WorkerConfig::default(),
            queue_capacity: default_queue_capacity(),
            replay: None,
            budget: ErrorBudgetConfig::default(),
            batching: BatchConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }

    /// Whether this run is a bounded historical replay.
    pub fn is_historical(&self) -> bool {
        self.replay.is_some()
    }

    /// Client id reported to both clusters.
    pub fn client_id(&self) -> &'static str {
        if self.is_historical() {
            "firehose-historical"
        } else {
            "firehose"
        }
    }

    /// Validate the configuration before pipeline construction.
    pub fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(FirehoseError::Config("topic must not be empty".into()));
        }
        if self.source.brokers.is_empty() {
            return Err(FirehoseError::Config(
                "source.brokers must not be empty".into(),
            ));
        }
        if self.destination.brokers.is_empty() {
            return Err(FirehoseError::Config(
                "destination.brokers must not be empty".into(),
            ));
        }
        if self.workers.consumers == 0 {
            return Err(FirehoseError::Config(
                "workers.consumers must be at least 1".into(),
            ));
        }
        if self.workers.producers == 0 {
            return Err(FirehoseError::Config(
                "workers.producers must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(FirehoseError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.budget.max_errors == 0 {
            return Err(FirehoseError::Config(
                "budget.max_errors must be at least 1".into(),
            ));
        }
        if let Some(ref replay) = self.replay {
            let fraction = replay.window.fraction();
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(FirehoseError::Config(format!(
                    "replay fraction must be in (0, 1], got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BrokerConfig / WorkerConfig: cluster endpoints and pool sizes
// ═══════════════════════════════════════════════════════════════════════════════

/// Connection settings for one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Bootstrap broker addresses (`host:port`).
    pub brokers: Vec<String>,
}

impl BrokerConfig {
    /// Comma-joined broker list, the form the client library expects.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

/// Worker pool sizes. Fixed at startup; there is no runtime rebalancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of consumer workers. Partitions are assigned round-robin
    /// across them at startup.
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// Number of producer workers draining the shared transfer queue.
    #[serde(default = "default_producers")]
    pub producers: usize,
}

fn default_consumers() -> usize {
    4
}

fn default_producers() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            consumers: 4,
            producers: 4,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ReplayConfig / ErrorBudgetConfig: window and thresholds
// ═══════════════════════════════════════════════════════════════════════════════

/// Historical replay window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Fraction of the retained offset span to replay.
    pub window: ReplayWindow,

    /// Fixed end offset applied to every partition, for reproducible
    /// backfills. Defaults to each partition's newest offset at
    /// resolution time.
    #[serde(default)]
    pub end_offset: Option<i64>,
}

/// Read error thresholds, applied per partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBudgetConfig {
    /// Consecutive read failures before the partition is abandoned.
    /// Resets on any successful read.
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,

    /// Total read failures over the partition's lifetime before it is
    /// abandoned, regardless of interleaved successes.
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

fn default_max_errors() -> u32 {
    10
}

fn default_max_retry() -> u32 {
    100
}

impl Default for ErrorBudgetConfig {
    fn default() -> Self {
        Self {
            max_errors: 10,
            max_retry: 100,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BatchConfig / MonitorConfig: batching and reporting ticks
// ═══════════════════════════════════════════════════════════════════════════════

/// Destination batching knobs, mapped onto the producer client's own
/// batching (`batch.num.messages` / `linger.ms`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum records per destination batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush interval as a duration string (e.g. "500ms").
    #[serde(default = "default_flush_interval")]
    pub flush_interval: String,
}

fn default_batch_size() -> usize {
    500
}

fn default_flush_interval() -> String {
    "500ms".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval: "500ms".to_string(),
        }
    }
}

impl BatchConfig {
    /// Parse the flush interval string to a Duration.
    pub fn flush_interval_duration(&self) -> Duration {
        humantime::parse_duration(&self.flush_interval).unwrap_or(Duration::from_millis(500))
    }
}

/// Monitoring tick intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Whether monitoring tasks are spawned at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// RPS sampling interval as a duration string (e.g. "30s").
    #[serde(default = "default_rps_tick")]
    pub rps_tick: String,

    /// Queue depth sampling interval as a duration string (e.g. "10s").
    #[serde(default = "default_depth_tick")]
    pub depth_tick: String,
}

fn default_true() -> bool {
    true
}

fn default_rps_tick() -> String {
    "30s".to_string()
}

fn default_depth_tick() -> String {
    "10s".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps_tick: "30s".to_string(),
            depth_tick: "10s".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Parse the RPS tick string to a Duration.
    pub fn rps_tick_duration(&self) -> Duration {
        humantime::parse_duration(&self.rps_tick).unwrap_or(Duration::from_secs(30))
    }

    /// Parse the depth tick string to a Duration.
    pub fn depth_tick_duration(&self) -> Duration {
        humantime::parse_duration(&self.depth_tick).unwrap_or(Duration::from_secs(10))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
