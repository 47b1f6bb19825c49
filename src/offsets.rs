// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fractional-window offset resolution.
//!
//! Turns a human-meaningful replay window ("last 4 hours") into concrete
//! integer offsets per partition, using the broker's reported
//! oldest/newest bounds:
//!
//! ```text
//! diff  = newest - oldest
//! start = floor(newest - diff * fraction)
//! end   = newest            (or a caller-supplied fixed end)
//! ```
//!
//! `newest` is the broker's *next* offset, so `end` is exclusive: the
//! last record of the window sits at `end - 1`, and a partition is
//! complete once the just-read record's `offset + 1 >= end`.
//!
//! The named presets assume four days of retention, which is where the
//! odd-looking fractions come from (1h of a 96h log is ~0.0104 of it).
//! They are conveniences, not limits; any fraction in `(0, 1]` is valid.
//!
//! Resolution failures are fatal for job setup and are not retried here;
//! the caller restarts resolution.

use crate::broker::{OffsetBound, SourceBroker};
use crate::error::{FirehoseError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Fraction of a four-day log covering the last hour.
pub const LAST_ONE_HOUR: f64 = 0.01042;
/// Fraction covering the last four hours.
pub const LAST_FOUR_HOURS: f64 = 0.041647;
/// Fraction covering the last twelve hours.
pub const LAST_TWELVE_HOURS: f64 = 0.125;
/// Fraction covering the last day.
pub const LAST_ONE_DAY: f64 = 0.25;
/// Fraction covering the last two days.
pub const LAST_TWO_DAYS: f64 = 0.5;
/// Fraction covering the last three days.
pub const LAST_THREE_DAYS: f64 = 0.75;
/// Fraction covering the full retained log.
pub const LAST_FOUR_DAYS: f64 = 1.0;

/// A replay window, named or raw.
///
/// Serializes as the kebab-case preset name or a bare fraction:
/// `"last-four-hours"`, `0.33`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayWindow {
    LastHour,
    LastFourHours,
    LastTwelveHours,
    LastDay,
    LastTwoDays,
    LastThreeDays,
    LastFourDays,
    #[serde(untagged)]
    Fraction(f64),
}

impl ReplayWindow {
    /// The fraction of the retained offset span this window covers.
    pub fn fraction(&self) -> f64 {
        match self {
            Self::LastHour => LAST_ONE_HOUR,
            Self::LastFourHours => LAST_FOUR_HOURS,
            Self::LastTwelveHours => LAST_TWELVE_HOURS,
            Self::LastDay => LAST_ONE_DAY,
            Self::LastTwoDays => LAST_TWO_DAYS,
            Self::LastThreeDays => LAST_THREE_DAYS,
            Self::LastFourDays => LAST_FOUR_DAYS,
            Self::Fraction(f) => *f,
        }
    }
}

/// Resolved offset window for one partition. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetWindow {
    pub start: i64,
    pub end: i64,
}

/// The window arithmetic, separated from broker I/O.
///
/// `start = floor(newest - (newest - oldest) * fraction)`, clamped into
/// `[oldest, newest]`; `end = newest`. Returns `None` when the retained
/// span is empty.
pub fn fractional_window(oldest: i64, newest: i64, fraction: f64) -> Option<OffsetWindow> {
    let diff = newest - oldest;
    if diff <= 0 {
        return None;
    }
    let start = (newest as f64 - diff as f64 * fraction).floor() as i64;
    Some(OffsetWindow {
        start: start.clamp(oldest, newest),
        end: newest,
    })
}

/// One partition's slice of a replication job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionAssignment {
    /// Partition id.
    pub partition: i32,
    /// First offset to read.
    pub start: i64,
    /// Exclusive end offset; `None` tails the live stream forever.
    pub end: Option<i64>,
}

/// The resolved work description for a run. Created once at startup,
/// read-only thereafter.
#[derive(Debug, Clone)]
pub struct ReplicationJob {
    pub topic: String,
    pub assignments: Vec<PartitionAssignment>,
}

impl ReplicationJob {
    /// Partition ids covered by this job.
    pub fn partitions(&self) -> Vec<i32> {
        self.assignments.iter().map(|a| a.partition).collect()
    }

    /// Whether this job has a fixed end offset on every partition.
    pub fn is_historical(&self) -> bool {
        !self.assignments.is_empty() && self.assignments.iter().all(|a| a.end.is_some())
    }
}

/// Resolves replay fractions into per-partition offset windows.
///
/// Holds only the source read capability; it composes with the broker
/// client rather than extending it.
pub struct OffsetResolver<S> {
    source: Arc<S>,
    topic: String,
}

impl<S: SourceBroker> OffsetResolver<S> {
    pub fn new(source: Arc<S>, topic: impl Into<String>) -> Self {
        Self {
            source,
            topic: topic.into(),
        }
    }

    /// Resolve the offset window for one partition.
    ///
    /// Fails with [`FirehoseError::OffsetUnavailable`] if either bound
    /// cannot be retrieved or the partition holds no messages.
    pub async fn resolve_partition(
        &self,
        partition: i32,
        fraction: f64,
        fixed_end: Option<i64>,
    ) -> Result<OffsetWindow> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(FirehoseError::Config(format!(
                "replay fraction must be in (0, 1], got {fraction}"
            )));
        }

        let newest = self.bound(partition, OffsetBound::Newest).await?;
        let oldest = self.bound(partition, OffsetBound::Oldest).await?;

        let window = fractional_window(oldest, newest, fraction).ok_or_else(|| {
            FirehoseError::offset_unavailable(&self.topic, partition, "partition has no messages")
        })?;
        let window = OffsetWindow {
            start: window.start,
            end: fixed_end.unwrap_or(window.end),
        };

        debug!(
            topic = %self.topic,
            partition,
            oldest,
            newest,
            fraction,
            start = window.start,
            end = window.end,
            "Resolved offset window"
        );

        Ok(window)
    }

    /// Resolve a full historical job: every partition of the topic with
    /// a start and an exclusive end offset.
    pub async fn resolve_job(
        &self,
        fraction: f64,
        fixed_end: Option<i64>,
    ) -> Result<ReplicationJob> {
        let partitions = self.list_partitions().await?;
        let mut assignments = Vec::with_capacity(partitions.len());

        for partition in partitions {
            let window = self
                .resolve_partition(partition, fraction, fixed_end)
                .await?;
            assignments.push(PartitionAssignment {
                partition,
                start: window.start,
                end: Some(window.end),
            });
        }

        info!(
            topic = %self.topic,
            partitions = assignments.len(),
            fraction,
            "Resolved historical replication job"
        );

        Ok(ReplicationJob {
            topic: self.topic.clone(),
            assignments,
        })
    }

    /// Resolve a live-tail job: every partition starting at its newest
    /// offset, with no end.
    pub async fn live_job(&self) -> Result<ReplicationJob> {
        let partitions = self.list_partitions().await?;
        let mut assignments = Vec::with_capacity(partitions.len());

        for partition in partitions {
            let newest = self.bound(partition, OffsetBound::Newest).await?;
            assignments.push(PartitionAssignment {
                partition,
                start: newest,
                end: None,
            });
        }

        info!(
            topic = %self.topic,
            partitions = assignments.len(),
            "Resolved live replication job"
        );

        Ok(ReplicationJob {
            topic: self.topic.clone(),
            assignments,
        })
    }

    async fn list_partitions(&self) -> Result<Vec<i32>> {
        let partitions = self.source.list_partitions(&self.topic).await?;
        if partitions.is_empty() {
            return Err(FirehoseError::broker_msg(
                "metadata",
                format!("topic {} has no partitions", self.topic),
            ));
        }
        Ok(partitions)
    }

    async fn bound(&self, partition: i32, bound: OffsetBound) -> Result<i64> {
        self.source
            .offset_bound(&self.topic, partition, bound)
            .await
            .map_err(|e| {
                FirehoseError::offset_unavailable(&self.topic, partition, e.to_string())
            })
    }
}
