//! Property-based tests using proptest.
//!
//! These verify invariants that should hold for all inputs: the window
//! arithmetic of the offset resolver and the no-loss/no-duplication/
//! bounded-depth contract of the transfer queue.

use firehose::broker::Record;
use firehose::offsets::{fractional_window, ReplayWindow};
use firehose::queue;
use proptest::prelude::*;

// =============================================================================
// Offset Window Properties
// =============================================================================

proptest! {
    /// For any fraction in (0, 1], the window is ordered and inside the
    /// retained span.
    #[test]
    fn window_is_ordered_and_bounded(
        oldest in 0i64..1_000_000_000,
        diff in 1i64..1_000_000_000,
        fraction in 0.000_001f64..=1.0,
    ) {
        let newest = oldest + diff;
        let window = fractional_window(oldest, newest, fraction).unwrap();

        prop_assert!(window.start <= window.end);
        prop_assert!(window.start >= oldest);
        prop_assert_eq!(window.end, newest);
    }

    /// The replayed span approximates `diff * fraction` within one
    /// offset unit (floor rounding).
    #[test]
    fn window_span_matches_fraction(
        oldest in 0i64..1_000_000_000,
        diff in 1i64..1_000_000_000,
        fraction in 0.000_001f64..=1.0,
    ) {
        let newest = oldest + diff;
        let window = fractional_window(oldest, newest, fraction).unwrap();

        let span = (newest - window.start) as f64;
        let expected = diff as f64 * fraction;
        prop_assert!((span - expected).abs() <= 1.0);
    }

    /// A full-fraction window always starts at the oldest offset.
    #[test]
    fn window_full_fraction_starts_at_oldest(
        oldest in 0i64..1_000_000_000,
        diff in 1i64..1_000_000_000,
    ) {
        let newest = oldest + diff;
        let window = fractional_window(oldest, newest, 1.0).unwrap();
        prop_assert_eq!(window.start, oldest);
    }

    /// An empty retained span never yields a window.
    #[test]
    fn window_empty_span_is_none(offset in 0i64..1_000_000_000) {
        prop_assert!(fractional_window(offset, offset, 0.5).is_none());
    }

    /// A larger fraction never starts later than a smaller one.
    #[test]
    fn window_fraction_is_monotone(
        oldest in 0i64..1_000_000,
        diff in 1i64..1_000_000,
        f1 in 0.01f64..=1.0,
        f2 in 0.01f64..=1.0,
    ) {
        let newest = oldest + diff;
        let (lo, hi) = if f1 <= f2 { (f1, f2) } else { (f2, f1) };
        let small = fractional_window(oldest, newest, lo).unwrap();
        let large = fractional_window(oldest, newest, hi).unwrap();
        prop_assert!(large.start <= small.start);
    }

    /// Replay window serde round-trips for raw fractions.
    #[test]
    fn replay_window_fraction_roundtrips(fraction in 0.000_001f64..=1.0) {
        let json = serde_json::to_string(&ReplayWindow::Fraction(fraction)).unwrap();
        let parsed: ReplayWindow = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(parsed.fraction(), fraction);
    }
}

// =============================================================================
// Transfer Queue Properties
// =============================================================================

fn record(partition: i32, offset: i64) -> Record {
    Record {
        topic: "events".to_string(),
        partition,
        key: vec![],
        value: vec![],
        offset,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Feeding any number of records through any capacity loses nothing,
    /// duplicates nothing, preserves FIFO order for the single producing
    /// stream, and never reports a depth above capacity.
    #[test]
    fn queue_preserves_stream_and_bounds_depth(
        capacity in 1usize..64,
        count in 0i64..200,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let (tx, rx) = queue::bounded(capacity);
            let gauge = rx.gauge();

            let feeder = tokio::spawn(async move {
                for offset in 0..count {
                    tx.enqueue(record(0, offset)).await.unwrap();
                }
            });

            let mut received = Vec::new();
            while let Some(r) = rx.dequeue().await {
                assert!(gauge.depth() <= capacity, "depth exceeded capacity");
                received.push(r.offset);
            }
            feeder.await.unwrap();

            assert_eq!(received, (0..count).collect::<Vec<_>>());
        });
    }

    /// Two interleaved partition streams each come out in their own
    /// source order.
    #[test]
    fn queue_keeps_each_partition_stream_ordered(
        capacity in 1usize..32,
        count in 1i64..100,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let (tx, rx) = queue::bounded(capacity);
            let tx2 = tx.clone();

            let feed_a = tokio::spawn(async move {
                for offset in 0..count {
                    tx.enqueue(record(0, offset)).await.unwrap();
                }
            });
            let feed_b = tokio::spawn(async move {
                for offset in 0..count {
                    tx2.enqueue(record(1, offset)).await.unwrap();
                }
            });

            let mut by_partition: [Vec<i64>; 2] = [Vec::new(), Vec::new()];
            while let Some(r) = rx.dequeue().await {
                by_partition[r.partition as usize].push(r.offset);
            }
            feed_a.await.unwrap();
            feed_b.await.unwrap();

            let expected: Vec<i64> = (0..count).collect();
            assert_eq!(by_partition[0], expected);
            assert_eq!(by_partition[1], expected);
        });
    }
}
