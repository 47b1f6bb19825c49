// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Pipeline coordinator.
//!
//! The main orchestrator that ties together:
//! - Offset resolution via [`crate::offsets::OffsetResolver`]
//! - The consumer pool via [`crate::consumer::ConsumerWorker`]
//! - The bounded hand-off via [`crate::queue`]
//! - The producer pool via [`crate::producer::ProducerWorker`]
//! - Throughput/saturation reporting via [`crate::monitor`]
//!
//! # Lifecycle
//!
//! 1. `start()` resolves the replication job (fatal: no worker is
//!    spawned after a setup error) and spawns every task.
//! 2. `wait()` blocks until an OS interrupt fires or the run finishes
//!    on its own: consumers complete their partitions, the queue closes
//!    and drains, producers exit, and the sentinel triggers shutdown.
//! 3. `shutdown()` fires the broadcast signal exactly once and blocks
//!    until every worker task has returned, so no worker is killed
//!    mid-publish.

mod types;

pub use types::EngineState;

use crate::broker::{SinkBroker, SourceBroker};
use crate::config::FirehoseConfig;
use crate::consumer::ConsumerWorker;
use crate::error::{FirehoseError, Result};
use crate::metrics;
use crate::monitor::{DepthReporter, RpsReporter};
use crate::offsets::{OffsetResolver, PartitionAssignment, ReplicationJob};
use crate::producer::ProducerWorker;
use crate::progress::{CompletionBoard, WorkerStats};
use crate::queue;
use crate::shutdown::{self, ShutdownController};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long each task gets to drain in-flight work during shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The firehose pipeline engine.
///
/// Generic over the source and sink broker capabilities so tests can
/// drive it with in-memory brokers.
pub struct Firehose<S, D> {
    config: FirehoseConfig,
    source: Arc<S>,
    sink: Arc<D>,
    state_tx: watch::Sender<EngineState>,
    state_rx: watch::Receiver<EngineState>,
    shutdown: ShutdownController,
    handles: Vec<tokio::task::JoinHandle<()>>,
    completions: Option<Arc<CompletionBoard>>,
    job: Option<ReplicationJob>,
}

impl<S: SourceBroker, D: SinkBroker> Firehose<S, D> {
    /// Create a new pipeline.
    ///
    /// The engine starts in `Created` state; call
    /// [`start()`](Self::start) to resolve offsets and spawn workers.
    pub fn new(config: FirehoseConfig, source: Arc<S>, sink: Arc<D>) -> Result<Self> {
        config.validate()?;
        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        Ok(Self {
            config,
            source,
            sink,
            state_tx,
            state_rx,
            shutdown: ShutdownController::new(),
            handles: Vec::new(),
            completions: None,
            job: None,
        })
    }

    /// Current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// A receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Whether the engine is running.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    /// The topic being mirrored.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// The resolved replication job, once `start()` has succeeded.
    pub fn job(&self) -> Option<&ReplicationJob> {
        self.job.as_ref()
    }

    /// Partitions not yet complete or abandoned, once `start()` has
    /// succeeded. Only meaningful for historical replays.
    pub fn partitions_remaining(&self) -> Option<usize> {
        self.completions.as_ref().map(|c| c.remaining())
    }

    /// A handle that can trigger shutdown from outside the engine.
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    fn set_state(&self, state: EngineState) {
        let _ = self.state_tx.send(state);
        metrics::set_engine_state(&state.to_string());
    }

    /// Start the pipeline.
    ///
    /// 1. Resolves the replication job (fatal on failure)
    /// 2. Creates the transfer queue
    /// 3. Spawns consumer workers, producer workers and monitors
    /// 4. Spawns the sentinel that turns "all workers returned" into
    ///    the shutdown trigger
    pub async fn start(&mut self) -> Result<()> {
        if self.state() != EngineState::Created {
            return Err(FirehoseError::InvalidState {
                expected: "Created".to_string(),
                actual: self.state().to_string(),
            });
        }

        info!(
            topic = %self.config.topic,
            consumers = self.config.workers.consumers,
            producers = self.config.workers.producers,
            queue_capacity = self.config.queue_capacity,
            historical = self.config.is_historical(),
            "Starting firehose pipeline"
        );
        self.set_state(EngineState::Resolving);

        let resolver = OffsetResolver::new(Arc::clone(&self.source), self.config.topic.as_str());
        let job = match &self.config.replay {
            Some(replay) => {
                resolver
                    .resolve_job(replay.window.fraction(), replay.end_offset)
                    .await
            }
            None => resolver.live_job().await,
        };
        let job = match job {
            Ok(job) => job,
            Err(e) => {
                self.set_state(EngineState::Failed);
                return Err(e);
            }
        };

        let (queue_tx, queue_rx) = queue::bounded(self.config.queue_capacity);
        let depth_gauge = queue_tx.gauge();
        let completions = Arc::new(CompletionBoard::new(&job.partitions()));

        // Static assignment: partitions round-robin across the consumer
        // pool. Workers beyond the partition count would own nothing and
        // are not spawned.
        let consumer_count = self.config.workers.consumers.min(job.assignments.len());
        if consumer_count < self.config.workers.consumers {
            warn!(
                configured = self.config.workers.consumers,
                spawned = consumer_count,
                partitions = job.assignments.len(),
                "More consumer workers configured than partitions"
            );
        }
        let mut slices: Vec<Vec<PartitionAssignment>> = vec![Vec::new(); consumer_count];
        for (i, assignment) in job.assignments.iter().enumerate() {
            slices[i % consumer_count].push(*assignment);
        }

        let mut worker_handles = Vec::new();
        let mut consumer_stats = Vec::with_capacity(consumer_count);
        for (worker_id, assignments) in slices.into_iter().enumerate() {
            let stats = Arc::new(WorkerStats::new());
            consumer_stats.push(Arc::clone(&stats));

            let worker = ConsumerWorker::new(
                worker_id,
                self.config.topic.as_str(),
                Arc::clone(&self.source),
                assignments,
                queue_tx.clone(),
                stats,
                Arc::clone(&completions),
                self.config.budget.clone(),
                self.shutdown.subscribe(),
            );
            worker_handles.push(tokio::spawn(worker.run()));
        }
        // The workers own the only senders now; when the last worker
        // returns, the queue closes and the producer pool drains out.
        drop(queue_tx);

        let mut producer_stats = Vec::with_capacity(self.config.workers.producers);
        for worker_id in 0..self.config.workers.producers {
            let stats = Arc::new(WorkerStats::new());
            producer_stats.push(Arc::clone(&stats));

            let worker = ProducerWorker::new(
                worker_id,
                self.config.topic.as_str(),
                Arc::clone(&self.sink),
                queue_rx.clone(),
                stats,
                self.shutdown.subscribe(),
            );
            worker_handles.push(tokio::spawn(worker.run()));
        }
        drop(queue_rx);

        // Sentinel: when every data worker has returned (historical
        // replay finished and drained, or all partitions abandoned),
        // trigger shutdown so `wait()` unblocks without an interrupt.
        let controller = self.shutdown.clone();
        self.handles.push(tokio::spawn(async move {
            for handle in worker_handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Worker task panicked");
                }
            }
            if controller.trigger() {
                info!("All worker tasks returned, triggering shutdown");
            }
        }));

        if self.config.monitor.enabled {
            self.handles.push(tokio::spawn(
                RpsReporter::new(
                    "consumer",
                    self.config.topic.as_str(),
                    consumer_stats,
                    self.config.monitor.rps_tick_duration(),
                    self.shutdown.subscribe(),
                )
                .run(),
            ));
            self.handles.push(tokio::spawn(
                RpsReporter::new(
                    "producer",
                    self.config.topic.as_str(),
                    producer_stats,
                    self.config.monitor.rps_tick_duration(),
                    self.shutdown.subscribe(),
                )
                .run(),
            ));
            self.handles.push(tokio::spawn(
                DepthReporter::new(
                    depth_gauge,
                    self.config.monitor.depth_tick_duration(),
                    self.shutdown.subscribe(),
                )
                .run(),
            ));
        }

        self.completions = Some(completions);
        self.job = Some(job);
        self.set_state(EngineState::Running);
        info!("Firehose pipeline running");
        Ok(())
    }

    /// Block until an OS interrupt or worker completion (historical
    /// replay drained, or every partition abandoned) triggers shutdown,
    /// then drain and stop.
    ///
    /// Call after a successful [`start()`](Self::start); from any other
    /// state this shuts down immediately.
    pub async fn wait(&mut self) {
        if self.is_running() {
            let mut shutdown_rx = self.shutdown.subscribe();
            if !*shutdown_rx.borrow() {
                tokio::select! {
                    _ = shutdown::interrupted() => {
                        info!("Interrupt received, shutting down");
                        self.shutdown.trigger();
                    }
                    res = shutdown_rx.changed() => {
                        let _ = res;
                    }
                }
            }
        }
        self.shutdown().await;
    }

    /// Shut the pipeline down gracefully.
    ///
    /// Fires the broadcast signal (a repeated trigger is a no-op) and
    /// blocks until every task has returned, so in-flight records that
    /// were already dequeued finish their publish attempt.
    pub async fn shutdown(&mut self) {
        if self.state() == EngineState::Stopped {
            return;
        }

        info!("Shutting down firehose pipeline");
        self.set_state(EngineState::ShuttingDown);
        self.shutdown.trigger();

        let handles = std::mem::take(&mut self.handles);
        let task_count = handles.len();
        if task_count > 0 {
            info!(task_count, "Waiting for tasks to drain and complete");
        }

        for (i, handle) in handles.into_iter().enumerate() {
            match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {
                    debug!(task = i + 1, "Task completed gracefully");
                }
                Ok(Err(e)) => {
                    warn!(task = i + 1, error = %e, "Task panicked during shutdown");
                }
                Err(_) => {
                    warn!(task = i + 1, "Task timed out during shutdown");
                }
            }
        }

        self.set_state(EngineState::Stopped);
        info!("Firehose pipeline stopped");
    }
}
