// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory broker for pipeline tests.
//!
//! Plays both roles: a source with scripted partition logs and a sink
//! that records what was published. Failure injection is per partition
//! (failing reads) and per offset (failing acks), so tests can exercise
//! the error budget and the fatal-publish path without a real cluster.
//!
//! A reader that exhausts its scripted log pends forever, which is what
//! a real partition does when no new records arrive.

use firehose::broker::{
    BoxFuture, OffsetBound, PartitionReader, PublishAck, Record, SinkBroker, SourceBroker,
};
use firehose::error::{FirehoseError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Mutex;

struct PartitionLog {
    oldest: i64,
    records: Vec<Record>,
    /// Reads that fail (retryably) before the first success.
    fail_first_reads: usize,
}

/// A scripted in-memory broker.
pub struct MockBroker {
    topic: String,
    partitions: HashMap<i32, PartitionLog>,
    /// Records accepted for publishing, in submission order.
    published: Mutex<Vec<Record>>,
    /// Source offsets whose delivery acks fail.
    fail_ack_offsets: HashSet<i64>,
    /// Submissions that fail outright (submit-time, not ack-time).
    fail_publish_offsets: HashSet<i64>,
}

impl MockBroker {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            partitions: HashMap::new(),
            published: Mutex::new(Vec::new()),
            fail_ack_offsets: HashSet::new(),
            fail_publish_offsets: HashSet::new(),
        }
    }

    /// Seed a partition with `count` records at offsets
    /// `oldest .. oldest + count`.
    pub fn with_partition(mut self, partition: i32, oldest: i64, count: i64) -> Self {
        let records = (oldest..oldest + count)
            .map(|offset| Record {
                topic: self.topic.clone(),
                partition,
                key: format!("k-{partition}-{offset}").into_bytes(),
                value: format!("v-{partition}-{offset}").into_bytes(),
                offset,
            })
            .collect();
        self.partitions.insert(
            partition,
            PartitionLog {
                oldest,
                records,
                fail_first_reads: 0,
            },
        );
        self
    }

    /// Make the first `count` reads of a partition fail retryably.
    pub fn with_failing_reads(mut self, partition: i32, count: usize) -> Self {
        self.partitions
            .get_mut(&partition)
            .expect("partition must be seeded first")
            .fail_first_reads = count;
        self
    }

    /// Fail the delivery ack of the record at this source offset.
    pub fn with_failing_ack(mut self, offset: i64) -> Self {
        self.fail_ack_offsets.insert(offset);
        self
    }

    /// Fail submission of the record at this source offset.
    pub fn with_failing_publish(mut self, offset: i64) -> Self {
        self.fail_publish_offsets.insert(offset);
        self
    }

    /// Everything accepted for publishing, in submission order.
    pub fn published(&self) -> Vec<Record> {
        self.published.lock().unwrap().clone()
    }

    /// Offsets accepted for one partition, in submission order.
    pub fn published_offsets(&self, partition: i32) -> Vec<i64> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.partition == partition)
            .map(|r| r.offset)
            .collect()
    }
}

impl SourceBroker for MockBroker {
    fn list_partitions(&self, topic: &str) -> BoxFuture<'_, Vec<i32>> {
        let known = topic == self.topic;
        let mut partitions: Vec<i32> = self.partitions.keys().copied().collect();
        partitions.sort_unstable();
        let topic = topic.to_string();
        Box::pin(async move {
            if !known {
                return Err(FirehoseError::broker_msg(
                    "metadata",
                    format!("topic {topic} not found"),
                ));
            }
            Ok(partitions)
        })
    }

    fn offset_bound(
        &self,
        _topic: &str,
        partition: i32,
        bound: OffsetBound,
    ) -> BoxFuture<'_, i64> {
        let bounds = self
            .partitions
            .get(&partition)
            .map(|log| (log.oldest, log.oldest + log.records.len() as i64));
        Box::pin(async move {
            let (oldest, newest) = bounds.ok_or_else(|| {
                FirehoseError::broker_msg("watermarks", format!("partition {partition} unknown"))
            })?;
            Ok(match bound {
                OffsetBound::Oldest => oldest,
                OffsetBound::Newest => newest,
            })
        })
    }

    fn open_reader(
        &self,
        _topic: &str,
        partition: i32,
        start: i64,
    ) -> BoxFuture<'_, Box<dyn PartitionReader>> {
        let scripted = self.partitions.get(&partition).map(|log| {
            let records: VecDeque<Record> = log
                .records
                .iter()
                .filter(|r| r.offset >= start)
                .cloned()
                .collect();
            (records, log.fail_first_reads)
        });
        Box::pin(async move {
            let (records, fail_remaining) = scripted.ok_or_else(|| {
                FirehoseError::broker_msg("fetch", format!("partition {partition} unknown"))
            })?;
            Ok(Box::new(MockReader {
                records,
                fail_remaining,
            }) as Box<dyn PartitionReader>)
        })
    }
}

struct MockReader {
    records: VecDeque<Record>,
    fail_remaining: usize,
}

impl PartitionReader for MockReader {
    fn next_record(
        &mut self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Record>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_remaining > 0 {
                self.fail_remaining -= 1;
                return Err(FirehoseError::broker_msg("fetch", "injected read failure"));
            }
            match self.records.pop_front() {
                Some(record) => Ok(record),
                // Scripted log exhausted: behave like a live partition
                // with no new records.
                None => futures::future::pending().await,
            }
        })
    }
}

impl SinkBroker for MockBroker {
    fn publish(&self, record: Record) -> BoxFuture<'_, PublishAck> {
        Box::pin(async move {
            if self.fail_publish_offsets.contains(&record.offset) {
                return Err(FirehoseError::publish(
                    record.topic,
                    record.partition,
                    "injected publish failure",
                ));
            }

            let ack_fails = self.fail_ack_offsets.contains(&record.offset);
            let (partition, offset) = (record.partition, record.offset);
            let topic = record.topic.clone();

            if !ack_fails {
                self.published.lock().unwrap().push(record);
            }

            let ack: PublishAck = Box::pin(async move {
                if ack_fails {
                    Err(FirehoseError::publish(
                        topic,
                        partition,
                        "injected ack failure",
                    ))
                } else {
                    Ok((partition, offset))
                }
            });
            Ok(ack)
        })
    }
}
