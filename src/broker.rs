// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Broker capability traits.
//!
//! Defines the narrow interface the pipeline needs from the underlying
//! broker client library. Wire protocol, partition leadership discovery
//! and group coordination are the client's business; the pipeline only
//! consumes offset bounds, partition readers and a publish operation.
//!
//! Source and sink are separate traits so components hold exactly the
//! capability they use: the offset resolver sees [`SourceBroker`] only,
//! producer workers see [`SinkBroker`] only. This also keeps mocks small.
//!
//! # Example
//!
//! ```rust,no_run
//! use firehose::broker::{BoxFuture, Record, SinkBroker, PublishAck};
//!
//! struct NullSink;
//!
//! impl SinkBroker for NullSink {
//!     fn publish(&self, record: Record) -> BoxFuture<'_, PublishAck> {
//!         Box::pin(async move {
//!             let ack: PublishAck =
//!                 Box::pin(async move { Ok((record.partition, record.offset)) });
//!             Ok(ack)
//!         })
//!     }
//! }
//! ```

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Deferred publish acknowledgment.
///
/// Resolves to the destination `(partition, offset)` once the broker
/// confirms delivery. Awaited by a dedicated drain task, never inline
/// on the publishing worker's hot path.
pub type PublishAck = Pin<Box<dyn Future<Output = Result<(i32, i64)>> + Send + 'static>>;

/// A single record in flight between the clusters.
///
/// Immutable once read from the source; ownership moves from the
/// consumer worker through the transfer queue to exactly one producer
/// worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Topic the record was read from (and is published to).
    pub topic: String,
    /// Source partition. Preserved on publish so replicated history
    /// stays co-located.
    pub partition: i32,
    /// Record key bytes (may be empty).
    pub key: Vec<u8>,
    /// Record payload bytes (may be empty).
    pub value: Vec<u8>,
    /// Source offset of the record.
    pub offset: i64,
}

/// Which end of a partition's retained offset span to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBound {
    /// Offset of the oldest retained record.
    Oldest,
    /// Next offset to be assigned (one past the newest record).
    Newest,
}

/// An open read cursor over one partition.
///
/// Yields records in source-offset order starting from the offset the
/// reader was opened at. `next_record` suspends until a record is
/// available or the broker reports an error; partitions have no natural
/// end, so the caller decides when to stop.
pub trait PartitionReader: Send {
    /// Read the next record.
    fn next_record(&mut self) -> Pin<Box<dyn Future<Output = Result<Record>> + Send + '_>>;
}

/// Read-side capabilities of the source cluster.
pub trait SourceBroker: Send + Sync + 'static {
    /// List the partition ids of a topic.
    fn list_partitions(&self, topic: &str) -> BoxFuture<'_, Vec<i32>>;

    /// Query one end of a partition's retained offset span.
    fn offset_bound(&self, topic: &str, partition: i32, bound: OffsetBound)
        -> BoxFuture<'_, i64>;

    /// Open a read cursor at `start`.
    fn open_reader(
        &self,
        topic: &str,
        partition: i32,
        start: i64,
    ) -> BoxFuture<'_, Box<dyn PartitionReader>>;
}

/// Write-side capability of the destination cluster.
pub trait SinkBroker: Send + Sync + 'static {
    /// Submit a record for publishing.
    ///
    /// The outer future completes once the record is accepted into the
    /// client's send buffer (it may suspend briefly when the buffer is
    /// full); the returned [`PublishAck`] completes when the broker
    /// acknowledges delivery. Keeping the two apart lets submission run
    /// ahead of acknowledgment bookkeeping.
    fn publish(&self, record: Record) -> BoxFuture<'_, PublishAck>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            topic: "events".to_string(),
            partition: 3,
            key: b"k1".to_vec(),
            value: b"v1".to_vec(),
            offset: 42,
        }
    }

    #[test]
    fn test_record_clone_equality() {
        let record = sample_record();
        let cloned = record.clone();
        assert_eq!(record, cloned);
    }

    #[test]
    fn test_record_debug_contains_topic() {
        let record = sample_record();
        let debug = format!("{:?}", record);
        assert!(debug.contains("events"));
        assert!(debug.contains("42"));
    }

    #[test]
    fn test_offset_bound_copy_equality() {
        let bound = OffsetBound::Newest;
        let copied: OffsetBound = bound;
        assert_eq!(bound, copied);
        assert_ne!(OffsetBound::Oldest, OffsetBound::Newest);
    }
}
