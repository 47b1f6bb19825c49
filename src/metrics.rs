//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Records pulled from the source and published to the destination
//! - Read/publish errors and lost records
//! - Partition completion and abandonment
//! - Transfer queue saturation
//! - Per-pool throughput (records/sec)
//! - Engine state
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `firehose_` and follow Prometheus
//! conventions: counters end in `_total`, gauges represent current
//! state, histograms track distributions.
//!
//! Emission goes through the `metrics` facade; whatever exporter the
//! host process installs is the sink. Emission is fire-and-forget and
//! never touches the data path.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record records pulled from a source partition.
pub fn record_records_pulled(topic: &str, partition: i32, count: usize) {
    counter!("firehose_records_pulled_total", "topic" => topic.to_string(), "partition" => partition.to_string())
        .increment(count as u64);
}

/// Record records acknowledged by the destination.
pub fn record_records_published(topic: &str, partition: i32, count: usize) {
    counter!("firehose_records_published_total", "topic" => topic.to_string(), "partition" => partition.to_string())
        .increment(count as u64);
}

/// Record a failed partition read.
pub fn record_read_error(topic: &str, partition: i32) {
    counter!("firehose_read_errors_total", "topic" => topic.to_string(), "partition" => partition.to_string())
        .increment(1);
}

/// Record a failed publish.
pub fn record_publish_error(topic: &str, partition: i32) {
    counter!("firehose_publish_errors_total", "topic" => topic.to_string(), "partition" => partition.to_string())
        .increment(1);
}

/// Record a record dropped by a failed worker (at-least-once violation
/// surfaced for alerting).
pub fn record_record_lost(topic: &str, partition: i32) {
    counter!("firehose_records_lost_total", "topic" => topic.to_string(), "partition" => partition.to_string())
        .increment(1);
}

/// Record a partition reaching its end offset.
pub fn record_partition_completed(topic: &str) {
    counter!("firehose_partitions_completed_total", "topic" => topic.to_string()).increment(1);
}

/// Record a partition abandoned after exhausting its error budget.
pub fn record_partition_abandoned(topic: &str) {
    counter!("firehose_partitions_abandoned_total", "topic" => topic.to_string()).increment(1);
}

/// Record how long a publish acknowledgment was waited on.
pub fn record_ack_wait(topic: &str, duration: Duration) {
    histogram!("firehose_ack_wait_seconds", "topic" => topic.to_string())
        .record(duration.as_secs_f64());
}

/// Gauge for the transfer queue depth.
pub fn set_queue_depth(depth: usize) {
    gauge!("firehose_queue_depth").set(depth as f64);
}

/// Gauge for the transfer queue fill ratio.
pub fn set_queue_saturation(ratio: f64) {
    gauge!("firehose_queue_saturation").set(ratio);
}

/// Gauge for a pool's aggregate throughput over the last tick.
pub fn record_pool_rps(pool: &str, topic: &str, rps: f64) {
    gauge!("firehose_pool_records_per_second", "pool" => pool.to_string(), "topic" => topic.to_string())
        .set(rps);
}

/// Gauge for a pool's cumulative processed count.
pub fn set_pool_processed(pool: &str, topic: &str, total: u64) {
    gauge!("firehose_pool_processed_cumulative", "pool" => pool.to_string(), "topic" => topic.to_string())
        .set(total as f64);
}

/// Gauge for a pool's cumulative error count.
pub fn set_pool_errors(pool: &str, topic: &str, total: u64) {
    gauge!("firehose_pool_errors_cumulative", "pool" => pool.to_string(), "topic" => topic.to_string())
        .set(total as f64);
}

/// Gauge for engine state.
pub fn set_engine_state(state: &str) {
    // Encode state as numeric for alerting.
    let value = match state {
        "Created" => 0.0,
        "Resolving" => 1.0,
        "Running" => 2.0,
        "ShuttingDown" => 3.0,
        "Stopped" => 4.0,
        "Failed" => 5.0,
        _ => -1.0,
    };
    gauge!("firehose_engine_state").set(value);
}
