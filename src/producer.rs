// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Producer pool workers.
//!
//! Each worker dequeues records from the shared transfer queue and
//! submits them to the destination, preserving the source partition
//! number. Dequeue and submission happen under the queue guard, so
//! submission order matches dequeue order and one partition's records
//! reach the destination in source-offset order regardless of how many
//! workers drain the queue.
//!
//! Acknowledgments are awaited by a dedicated companion task per
//! worker: submission rate and ack arrival rate diverge under load, and
//! draining acks inline would stall queue drain (and through it the
//! consumer pool) whenever the ack stream falls behind.
//!
//! A publish failure is fatal for the worker that hit it. The failed
//! record is surfaced via `firehose_records_lost_total` rather than
//! migrated to a sibling; the rest of the pool keeps running.
//!
//! # Exit conditions
//!
//! - shutdown signal (in-flight submissions still get their acks awaited)
//! - the transfer queue closes: every consumer worker has finished, the
//!   buffer is drained, and `dequeue()` returned `None`
//! - a publish failure on this worker

use crate::broker::{PublishAck, SinkBroker};
use crate::error::FirehoseError;
use crate::metrics;
use crate::progress::WorkerStats;
use crate::queue::TransferReceiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Maximum unacknowledged submissions per worker before submission
/// waits for the drain task to catch up.
const ACK_BACKLOG: usize = 4096;

/// A producer pool worker.
pub struct ProducerWorker<D> {
    worker_id: usize,
    topic: String,
    sink: Arc<D>,
    queue: TransferReceiver,
    stats: Arc<WorkerStats>,
    shutdown: watch::Receiver<bool>,
}

impl<D: SinkBroker> ProducerWorker<D> {
    pub fn new(
        worker_id: usize,
        topic: impl Into<String>,
        sink: Arc<D>,
        queue: TransferReceiver,
        stats: Arc<WorkerStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            worker_id,
            topic: topic.into(),
            sink,
            queue,
            stats,
            shutdown,
        }
    }

    /// Run the worker until the queue closes, shutdown fires, or a
    /// publish fails.
    pub async fn run(self) {
        let span = info_span!("producer", worker = self.worker_id);
        let Self {
            worker_id,
            topic,
            sink,
            queue,
            stats,
            mut shutdown,
        } = self;

        async move {
            info!("Starting producer worker");

            let (ack_tx, ack_rx) = mpsc::channel::<(Instant, PublishAck)>(ACK_BACKLOG);
            let failed = Arc::new(AtomicBool::new(false));
            let drainer = tokio::spawn(
                drain_acks(ack_rx, Arc::clone(&stats), Arc::clone(&failed), topic.clone())
                    .instrument(info_span!("ack_drain", worker = worker_id)),
            );

            loop {
                if failed.load(Ordering::Acquire) {
                    error!("Publish failure reported by ack drain, stopping worker");
                    break;
                }
                if *shutdown.borrow() {
                    break;
                }

                // Dequeue and submit under the queue guard: submission
                // order matches dequeue order, which preserves
                // per-partition source order at the destination.
                let mut guard = tokio::select! {
                    biased;

                    _ = shutdown.changed() => break,
                    guard = queue.lock() => guard,
                };

                let record = tokio::select! {
                    biased;

                    _ = shutdown.changed() => break,
                    record = guard.recv() => record,
                };

                let Some(record) = record else {
                    debug!("Transfer queue closed and drained");
                    break;
                };
                let partition = record.partition;

                // The record is dequeued; its publish attempt completes
                // even if shutdown fires mid-submission.
                let submitted = sink.publish(record).await;
                drop(guard);

                match submitted {
                    Ok(ack) => {
                        if ack_tx.send((Instant::now(), ack)).await.is_err() {
                            error!("Ack drain task is gone, stopping worker");
                            break;
                        }
                    }
                    Err(e) => {
                        stats.record_error();
                        metrics::record_publish_error(&topic, partition);
                        metrics::record_record_lost(&topic, partition);
                        error!(partition, error = %e, "Publish failed, stopping worker");
                        break;
                    }
                }
            }

            // Close the ack stream and wait for in-flight publishes to
            // finish their attempts before the worker exits.
            drop(ack_tx);
            if let Err(e) = drainer.await {
                warn!(error = %e, "Ack drain task panicked");
            }

            info!("Producer worker stopped");
        }
        .instrument(span)
        .await
    }
}

/// Await publish acknowledgments off the submission path.
async fn drain_acks(
    mut acks: mpsc::Receiver<(Instant, PublishAck)>,
    stats: Arc<WorkerStats>,
    failed: Arc<AtomicBool>,
    topic: String,
) {
    while let Some((submitted_at, ack)) = acks.recv().await {
        match ack.await {
            Ok((partition, offset)) => {
                stats.record_processed();
                metrics::record_records_published(&topic, partition, 1);
                metrics::record_ack_wait(&topic, submitted_at.elapsed());
                tracing::trace!(partition, offset, "Delivery acknowledged");
            }
            Err(e) => {
                let partition = match &e {
                    FirehoseError::Publish { partition, .. } => *partition,
                    _ => -1,
                };
                stats.record_error();
                metrics::record_publish_error(&topic, partition);
                metrics::record_record_lost(&topic, partition);
                failed.store(true, Ordering::Release);
                error!(partition, error = %e, "Delivery acknowledgment reported failure");
            }
        }
    }
}
