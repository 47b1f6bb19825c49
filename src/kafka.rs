// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Kafka implementations of the broker capability traits.
//!
//! [`KafkaSource`] opens one assigned `StreamConsumer` per partition
//! reader; there is no consumer-group coordination, the pipeline does its own
//! static assignment. Metadata and watermark queries go through a
//! short-lived `BaseConsumer` on the blocking pool since the underlying
//! calls are synchronous.
//!
//! [`KafkaSink`] publishes through a `FutureProducer` with
//! `send_result`, which hands back the delivery future immediately so
//! acknowledgments can be drained off the submission path. Destination
//! partition is set explicitly from the record (manual partitioning);
//! the broker confirms with acks=all and a bounded retry count before a
//! delivery is reported failed.

use crate::broker::{
    BoxFuture, OffsetBound, PartitionReader, PublishAck, Record, SinkBroker, SourceBroker,
};
use crate::config::FirehoseConfig;
use crate::error::{FirehoseError, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::{Offset, TopicPartitionList};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, trace};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const WATERMARK_TIMEOUT: Duration = Duration::from_secs(5);
/// Backoff while the producer's local send buffer is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

/// Source-cluster client.
pub struct KafkaSource {
    client_config: ClientConfig,
}

impl KafkaSource {
    /// Build a source client from the pipeline configuration.
    pub fn new(config: &FirehoseConfig) -> Self {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", config.source.bootstrap_servers())
            .set("client.id", config.client_id())
            .set("group.id", format!("{}-firehose", config.topic))
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false");
        Self { client_config }
    }
}

impl SourceBroker for KafkaSource {
    fn list_partitions(&self, topic: &str) -> BoxFuture<'_, Vec<i32>> {
        let client_config = self.client_config.clone();
        let topic = topic.to_string();
        Box::pin(async move {
            blocking(move || {
                let consumer: BaseConsumer = client_config
                    .create()
                    .map_err(|e| FirehoseError::broker("create consumer", e))?;
                let metadata = consumer
                    .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
                    .map_err(|e| FirehoseError::broker("metadata", e))?;
                let meta_topic = metadata
                    .topics()
                    .iter()
                    .find(|t| t.name() == topic)
                    .ok_or_else(|| {
                        FirehoseError::broker_msg("metadata", format!("topic {topic} not found"))
                    })?;
                Ok(meta_topic.partitions().iter().map(|p| p.id()).collect())
            })
            .await
        })
    }

    fn offset_bound(
        &self,
        topic: &str,
        partition: i32,
        bound: OffsetBound,
    ) -> BoxFuture<'_, i64> {
        let client_config = self.client_config.clone();
        let topic = topic.to_string();
        Box::pin(async move {
            blocking(move || {
                let consumer: BaseConsumer = client_config
                    .create()
                    .map_err(|e| FirehoseError::broker("create consumer", e))?;
                let (oldest, newest) = consumer
                    .fetch_watermarks(&topic, partition, WATERMARK_TIMEOUT)
                    .map_err(|e| FirehoseError::broker("watermarks", e))?;
                Ok(match bound {
                    OffsetBound::Oldest => oldest,
                    OffsetBound::Newest => newest,
                })
            })
            .await
        })
    }

    fn open_reader(
        &self,
        topic: &str,
        partition: i32,
        start: i64,
    ) -> BoxFuture<'_, Box<dyn PartitionReader>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let consumer: StreamConsumer = self
                .client_config
                .create()
                .map_err(|e| FirehoseError::broker("create consumer", e))?;

            let mut assignment = TopicPartitionList::new();
            assignment
                .add_partition_offset(&topic, partition, Offset::Offset(start))
                .map_err(|e| FirehoseError::broker("assign", e))?;
            consumer
                .assign(&assignment)
                .map_err(|e| FirehoseError::broker("assign", e))?;

            debug!(topic = %topic, partition, start, "Opened partition reader");
            Ok(Box::new(KafkaPartitionReader { consumer }) as Box<dyn PartitionReader>)
        })
    }
}

/// An assigned single-partition read cursor.
struct KafkaPartitionReader {
    consumer: StreamConsumer,
}

impl PartitionReader for KafkaPartitionReader {
    fn next_record(&mut self) -> Pin<Box<dyn std::future::Future<Output = Result<Record>> + Send + '_>> {
        Box::pin(async move {
            let message = self
                .consumer
                .recv()
                .await
                .map_err(|e| FirehoseError::broker("fetch", e))?;
            trace!(
                partition = message.partition(),
                offset = message.offset(),
                "Read record"
            );
            Ok(Record {
                topic: message.topic().to_string(),
                partition: message.partition(),
                key: message.key().unwrap_or_default().to_vec(),
                value: message.payload().unwrap_or_default().to_vec(),
                offset: message.offset(),
            })
        })
    }
}

/// Destination-cluster client.
pub struct KafkaSink {
    producer: FutureProducer,
}

impl KafkaSink {
    /// Build a sink client from the pipeline configuration.
    pub fn new(config: &FirehoseConfig) -> Result<Self> {
        let flush_ms = config.batching.flush_interval_duration().as_millis();
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.destination.bootstrap_servers())
            .set("client.id", config.client_id())
            .set("acks", "all")
            .set("message.send.max.retries", "5")
            .set("batch.num.messages", config.batching.batch_size.to_string())
            .set("linger.ms", flush_ms.to_string())
            .create()
            .map_err(|e| FirehoseError::broker("create producer", e))?;
        Ok(Self { producer })
    }
}

impl SinkBroker for KafkaSink {
    fn publish(&self, record: Record) -> BoxFuture<'_, PublishAck> {
        Box::pin(async move {
            loop {
                let payload = FutureRecord::to(&record.topic)
                    .partition(record.partition)
                    .key(&record.key)
                    .payload(&record.value);

                match self.producer.send_result(payload) {
                    Ok(delivery) => {
                        let topic = record.topic;
                        let partition = record.partition;
                        let ack: PublishAck = Box::pin(async move {
                            match delivery.await {
                                Ok(Ok((partition, offset))) => Ok((partition, offset)),
                                Ok(Err((e, _message))) => {
                                    Err(FirehoseError::publish(topic, partition, e.to_string()))
                                }
                                Err(_canceled) => Err(FirehoseError::publish(
                                    topic,
                                    partition,
                                    "delivery future canceled (producer dropped)",
                                )),
                            }
                        });
                        return Ok(ack);
                    }
                    Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                        // Local send buffer is full; wait for the
                        // producer to drain a little and resubmit.
                        trace!(partition = record.partition, "Producer queue full, backing off");
                        tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
                    }
                    Err((e, _)) => {
                        return Err(FirehoseError::publish(
                            record.topic.clone(),
                            record.partition,
                            e.to_string(),
                        ));
                    }
                }
            }
        })
    }
}

/// Run a blocking client call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FirehoseError::Internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    // Client construction is lazy in librdkafka; no broker connection
    // is attempted until the first operation, so these run offline.

    #[test]
    fn test_source_builds_from_config() {
        let config = FirehoseConfig::for_testing("events");
        let source = KafkaSource::new(&config);
        assert_eq!(
            source.client_config.get("group.id"),
            Some("events-firehose")
        );
        assert_eq!(source.client_config.get("client.id"), Some("firehose"));
        assert_eq!(
            source.client_config.get("enable.auto.commit"),
            Some("false")
        );
    }

    #[test]
    fn test_sink_builds_from_config() {
        let config = FirehoseConfig::for_testing("events");
        assert!(KafkaSink::new(&config).is_ok());
    }

    #[test]
    fn test_source_client_id_historical() {
        use crate::config::ReplayConfig;
        use crate::offsets::ReplayWindow;

        let mut config = FirehoseConfig::for_testing("events");
        config.replay = Some(ReplayConfig {
            window: ReplayWindow::LastDay,
            end_offset: None,
        });
        let source = KafkaSource::new(&config);
        assert_eq!(
            source.client_config.get("client.id"),
            Some("firehose-historical")
        );
    }
}
