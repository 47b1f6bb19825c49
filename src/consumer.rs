// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Consumer pool workers.
//!
//! Each worker owns a disjoint subset of the topic's partitions, fixed
//! at startup. The partitions of one worker are pulled concurrently;
//! each partition has exactly one reader, so records enter the transfer
//! queue in source-offset order per partition.
//!
//! # Suspension points
//!
//! A pull suspends in two places, and the shutdown signal is a select
//! case at both:
//! - waiting for the next record from the broker
//! - waiting for transfer queue space (the backpressure point)
//!
//! On shutdown the pull stops where it stands; nothing further is
//! drained from the source.
//!
//! # Error budget
//!
//! Read errors are counted per partition: more than `max_errors`
//! consecutive failures, or more than `max_retry` failures over the
//! partition's lifetime, abandons the partition. Abandonment is
//! reported via logs and metrics and leaves sibling partitions running.
//! There is no extra backoff beyond the broker client's own.

use crate::broker::SourceBroker;
use crate::config::ErrorBudgetConfig;
use crate::metrics;
use crate::offsets::PartitionAssignment;
use crate::progress::{CompletionBoard, WorkerStats};
use crate::queue::TransferSender;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

/// How one partition's pull ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartitionOutcome {
    /// Reached the end offset (historical mode only).
    Completed,
    /// Error budget exhausted or a non-retryable read error.
    Abandoned,
    /// Shutdown signal observed.
    Interrupted,
}

/// A consumer pool worker.
pub struct ConsumerWorker<S> {
    worker_id: usize,
    topic: String,
    source: Arc<S>,
    assignments: Vec<PartitionAssignment>,
    queue: TransferSender,
    stats: Arc<WorkerStats>,
    completions: Arc<CompletionBoard>,
    budget: ErrorBudgetConfig,
    shutdown: watch::Receiver<bool>,
}

impl<S: SourceBroker> ConsumerWorker<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worker_id: usize,
        topic: impl Into<String>,
        source: Arc<S>,
        assignments: Vec<PartitionAssignment>,
        queue: TransferSender,
        stats: Arc<WorkerStats>,
        completions: Arc<CompletionBoard>,
        budget: ErrorBudgetConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            worker_id,
            topic: topic.into(),
            source,
            assignments,
            queue,
            stats,
            completions,
            budget,
            shutdown,
        }
    }

    /// Run the worker until its partitions are done or shutdown fires.
    ///
    /// The worker's queue senders are dropped on return; once every
    /// consumer worker has returned, the transfer queue closes and the
    /// producer pool drains out naturally.
    pub async fn run(self) {
        let span = info_span!("consumer", worker = self.worker_id);
        let Self {
            worker_id: _,
            topic,
            source,
            assignments,
            queue,
            stats,
            completions,
            budget,
            shutdown,
        } = self;

        async move {
            info!(partitions = assignments.len(), "Starting consumer worker");

            let pulls = assignments.iter().map(|assignment| {
                pull_partition(
                    &topic,
                    Arc::clone(&source),
                    *assignment,
                    queue.clone(),
                    Arc::clone(&stats),
                    budget.clone(),
                    shutdown.clone(),
                )
            });

            for (assignment, outcome) in assignments.iter().zip(join_all(pulls).await) {
                match outcome {
                    PartitionOutcome::Completed => {
                        completions.mark_complete(assignment.partition);
                        metrics::record_partition_completed(&topic);
                        info!(
                            partition = assignment.partition,
                            "Partition reached final offset"
                        );
                    }
                    PartitionOutcome::Abandoned => {
                        // Terminal for the completion board too, so one
                        // poisoned partition cannot hang a replay.
                        completions.mark_complete(assignment.partition);
                        metrics::record_partition_abandoned(&topic);
                        warn!(partition = assignment.partition, "Partition abandoned");
                    }
                    PartitionOutcome::Interrupted => {
                        debug!(
                            partition = assignment.partition,
                            "Partition pull interrupted by shutdown"
                        );
                    }
                }
            }

            info!("Consumer worker stopped");
        }
        .instrument(span)
        .await
    }
}

/// Pull one partition from `start` until its end offset, its error
/// budget, or the shutdown signal.
async fn pull_partition<S: SourceBroker>(
    topic: &str,
    source: Arc<S>,
    assignment: PartitionAssignment,
    queue: TransferSender,
    stats: Arc<WorkerStats>,
    budget: ErrorBudgetConfig,
    mut shutdown: watch::Receiver<bool>,
) -> PartitionOutcome {
    let partition = assignment.partition;

    // A fixed-end backfill can resolve to a window that is already
    // exhausted; such a partition is complete before the first read.
    if let Some(end) = assignment.end {
        if assignment.start >= end {
            debug!(partition, "Offset window is empty, nothing to replay");
            return PartitionOutcome::Completed;
        }
    }

    let mut reader = match source.open_reader(topic, partition, assignment.start).await {
        Ok(reader) => reader,
        Err(e) => {
            stats.record_error();
            metrics::record_read_error(topic, partition);
            warn!(partition, error = %e, "Failed to open partition reader");
            return PartitionOutcome::Abandoned;
        }
    };

    info!(
        partition,
        start = assignment.start,
        end = assignment.end,
        "Pulling partition"
    );

    let mut consecutive_errors = 0u32;
    let mut total_errors = 0u32;

    loop {
        if *shutdown.borrow() {
            return PartitionOutcome::Interrupted;
        }

        let read = tokio::select! {
            biased;

            _ = shutdown.changed() => return PartitionOutcome::Interrupted,
            read = reader.next_record() => read,
        };

        match read {
            Ok(record) => {
                consecutive_errors = 0;
                let offset = record.offset;

                // Backpressure point: suspends while the queue is full.
                tokio::select! {
                    biased;

                    _ = shutdown.changed() => return PartitionOutcome::Interrupted,
                    sent = queue.enqueue(record) => {
                        if sent.is_err() {
                            return PartitionOutcome::Interrupted;
                        }
                    }
                }

                stats.record_processed();
                metrics::record_records_pulled(topic, partition, 1);

                // `end` is exclusive (the broker's next offset), so the
                // window's last record sits at end - 1.
                if let Some(end) = assignment.end {
                    if offset + 1 >= end {
                        return PartitionOutcome::Completed;
                    }
                }
            }
            Err(e) => {
                stats.record_error();
                metrics::record_read_error(topic, partition);
                consecutive_errors += 1;
                total_errors += 1;

                if !e.is_retryable() {
                    warn!(partition, error = %e, "Non-retryable read error, abandoning partition");
                    return PartitionOutcome::Abandoned;
                }
                if consecutive_errors > budget.max_errors || total_errors > budget.max_retry {
                    warn!(
                        partition,
                        consecutive_errors,
                        total_errors,
                        "Error budget exhausted, abandoning partition"
                    );
                    return PartitionOutcome::Abandoned;
                }

                warn!(partition, error = %e, consecutive_errors, "Retryable read error");
            }
        }
    }
}
