//! Worker counters and partition completion tracking.
//!
//! [`WorkerStats`] is one pair of atomic counters per worker, written
//! only by its owning worker and read by the monitor: no lock, no
//! shared-mutable state.
//!
//! [`CompletionBoard`] tracks which partitions of a historical replay
//! have reached their end offset (or were abandoned, which is terminal
//! too). Marking is idempotent. The board is observability state: the
//! run actually terminates through the transfer queue closing once every
//! consumer worker has finished its partitions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Per-worker transaction counters.
///
/// Single writer (the owning worker), multiple readers (the monitor).
#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    errors: AtomicU64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully handled record.
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failure.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative processed count.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Cumulative error count.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Per-partition completion flags for a historical replay.
pub struct CompletionBoard {
    flags: HashMap<i32, AtomicBool>,
    remaining: AtomicUsize,
}

impl CompletionBoard {
    /// Create a board covering the given partitions.
    ///
    /// An empty partition set counts as already complete.
    pub fn new(partitions: &[i32]) -> Self {
        let flags: HashMap<i32, AtomicBool> = partitions
            .iter()
            .map(|p| (*p, AtomicBool::new(false)))
            .collect();
        Self {
            remaining: AtomicUsize::new(flags.len()),
            flags,
        }
    }

    /// Mark a partition complete. Returns `true` only on the first mark;
    /// repeated marks and unknown partitions are no-ops.
    pub fn mark_complete(&self, partition: i32) -> bool {
        let Some(flag) = self.flags.get(&partition) else {
            return false;
        };
        if flag.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.remaining.fetch_sub(1, Ordering::AcqRel);
        true
    }

    /// Whether a specific partition has completed.
    pub fn is_complete(&self, partition: i32) -> bool {
        self.flags
            .get(&partition)
            .map(|f| f.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Whether every partition has completed.
    pub fn all_complete(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    /// Partitions still outstanding.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = WorkerStats::new();
        assert_eq!(stats.processed(), 0);
        assert_eq!(stats.errors(), 0);
    }

    #[test]
    fn test_stats_increment() {
        let stats = WorkerStats::new();
        stats.record_processed();
        stats.record_processed();
        stats.record_error();
        assert_eq!(stats.processed(), 2);
        assert_eq!(stats.errors(), 1);
    }

    #[test]
    fn test_board_marks_each_partition_once() {
        let board = CompletionBoard::new(&[0, 1, 2]);
        assert_eq!(board.remaining(), 3);

        assert!(board.mark_complete(1));
        assert!(!board.mark_complete(1), "second mark is a no-op");
        assert!(board.is_complete(1));
        assert!(!board.is_complete(0));
        assert_eq!(board.remaining(), 2);
        assert!(!board.all_complete());
    }

    #[test]
    fn test_board_unknown_partition_ignored() {
        let board = CompletionBoard::new(&[0]);
        assert!(!board.mark_complete(99));
        assert_eq!(board.remaining(), 1);
    }

    #[test]
    fn test_board_all_complete() {
        let board = CompletionBoard::new(&[4, 7]);
        board.mark_complete(4);
        assert!(!board.all_complete());
        board.mark_complete(7);
        assert!(board.all_complete());
        assert_eq!(board.remaining(), 0);
    }

    #[test]
    fn test_board_empty_is_complete() {
        let board = CompletionBoard::new(&[]);
        assert!(board.all_complete());
        assert_eq!(board.remaining(), 0);
    }
}
