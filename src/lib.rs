//! # Firehose
//!
//! Mirrors one topic from a source Kafka cluster to a destination
//! cluster, either tailing the live stream or replaying a fractional
//! slice of retained history ("the last 4 hours").
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                                firehose                                  │
//! │                                                                          │
//! │  ┌────────────────┐   ┌────────────────┐   ┌──────────────────────────┐  │
//! │  │ Consumer pool  │──►│ Transfer queue │──►│ Producer pool            │  │
//! │  │ (1 reader per  │   │ (bounded FIFO, │   │ (+ ack drain task per    │  │
//! │  │  partition)    │   │  backpressure) │   │  worker)                 │  │
//! │  └────────────────┘   └────────────────┘   └──────────────────────────┘  │
//! │         ▲                      │                        │                │
//! │         │                      ▼                        ▼                │
//! │  ┌────────────────┐   ┌────────────────┐   ┌──────────────────────────┐  │
//! │  │ OffsetResolver │   │ Monitor        │   │ Shutdown coordinator     │  │
//! │  │ (fraction →    │   │ (RPS + queue   │   │ (broadcast signal,       │  │
//! │  │  start/end)    │   │  depth ticks)  │   │  drain-and-join)         │  │
//! │  └────────────────┘   └────────────────┘   └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is at-least-once; each partition is an independent unit of
//! work with its records preserved in source-offset order, while
//! cross-partition ordering is unspecified.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use firehose::{Firehose, FirehoseConfig, KafkaSink, KafkaSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> firehose::Result<()> {
//!     let config = FirehoseConfig::for_testing("events");
//!     let source = Arc::new(KafkaSource::new(&config));
//!     let sink = Arc::new(KafkaSink::new(&config)?);
//!
//!     let mut engine = Firehose::new(config, source, sink)?;
//!     engine.start().await?;
//!     engine.wait().await; // runs until SIGINT/SIGTERM or replay completion
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod kafka;
pub mod metrics;
pub mod monitor;
pub mod offsets;
pub mod pipeline;
pub mod producer;
pub mod progress;
pub mod queue;
pub mod shutdown;

// Re-exports for convenience
pub use broker::{OffsetBound, PartitionReader, Record, SinkBroker, SourceBroker};
pub use config::{FirehoseConfig, ReplayConfig};
pub use error::{FirehoseError, Result};
pub use kafka::{KafkaSink, KafkaSource};
pub use offsets::{OffsetResolver, ReplayWindow, ReplicationJob};
pub use pipeline::{EngineState, Firehose};
pub use shutdown::ShutdownController;
