//! Throughput and saturation monitoring.
//!
//! Two periodic reporters, both purely observational: they read atomic
//! counters and the queue depth gauge, emit metrics, and never touch the
//! data path. A reporter failure (or a missing metrics exporter) cannot
//! affect replication.
//!
//! - [`RpsReporter`]: per pool, snapshots every worker's `processed`
//!   counter on a fixed tick, derives aggregate records/sec from the
//!   delta and emits it alongside the raw cumulative counts.
//! - [`DepthReporter`]: emits the transfer queue depth as a saturation
//!   signal on its own (faster) tick.

use crate::metrics;
use crate::progress::WorkerStats;
use crate::queue::DepthGauge;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, info_span, Instrument};

/// Records/sec from a counter delta over an elapsed wall-clock span.
fn compute_rps(delta: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        delta as f64 / elapsed_secs
    } else {
        0.0
    }
}

/// Periodic throughput reporter for one worker pool.
pub struct RpsReporter {
    pool: &'static str,
    topic: String,
    stats: Vec<Arc<WorkerStats>>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl RpsReporter {
    pub fn new(
        pool: &'static str,
        topic: impl Into<String>,
        stats: Vec<Arc<WorkerStats>>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            pool,
            topic: topic.into(),
            stats,
            interval,
            shutdown,
        }
    }

    /// Run until shutdown fires.
    pub async fn run(self) {
        let span = info_span!("rps_reporter", pool = self.pool);
        let Self {
            pool,
            topic,
            stats,
            interval,
            mut shutdown,
        } = self;

        let snapshot = |stats: &[Arc<WorkerStats>]| -> (u64, u64) {
            let processed = stats.iter().map(|s| s.processed()).sum();
            let errors = stats.iter().map(|s| s.errors()).sum();
            (processed, errors)
        };

        async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            timer.tick().await; // first tick completes immediately

            let (mut last_processed, _) = snapshot(&stats);
            let mut last_at = Instant::now();

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.changed() => break,
                    _ = timer.tick() => {
                        let (processed, errors) = snapshot(&stats);
                        let delta = processed.saturating_sub(last_processed);
                        let rps = compute_rps(delta, last_at.elapsed().as_secs_f64());

                        metrics::record_pool_rps(pool, &topic, rps);
                        metrics::set_pool_processed(pool, &topic, processed);
                        metrics::set_pool_errors(pool, &topic, errors);

                        info!(
                            pool,
                            processed,
                            errors,
                            rps = format_args!("{rps:.1}"),
                            "Pool throughput"
                        );

                        last_processed = processed;
                        last_at = Instant::now();
                    }
                }
            }

            debug!("RPS reporter stopped");
        }
        .instrument(span)
        .await
    }
}

/// Periodic transfer queue depth reporter.
pub struct DepthReporter {
    gauge: DepthGauge,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl DepthReporter {
    pub fn new(gauge: DepthGauge, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            gauge,
            interval,
            shutdown,
        }
    }

    /// Run until shutdown fires.
    pub async fn run(self) {
        let span = info_span!("depth_reporter");
        let Self {
            gauge,
            interval,
            mut shutdown,
        } = self;

        async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.changed() => break,
                    _ = timer.tick() => {
                        let depth = gauge.depth();
                        metrics::set_queue_depth(depth);
                        metrics::set_queue_saturation(gauge.saturation());
                        info!(depth, capacity = gauge.capacity(), "Transfer queue depth");
                    }
                }
            }

            debug!("Depth reporter stopped");
        }
        .instrument(span)
        .await
    }
}
