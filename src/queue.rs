//! Bounded transfer queue between the consumer and producer pools.
//!
//! A single fixed-capacity FIFO hand-off shared by all workers. Enqueue
//! suspends when the queue is full; that stall, propagated back to the
//! partition readers, is the pipeline's entire backpressure story.
//! Dequeue suspends when the queue is empty.
//!
//! # Close semantics
//!
//! Each consumer worker owns a [`TransferSender`] clone and drops it when
//! its last partition completes or is abandoned. Once every sender is
//! gone *and* the buffer is drained, [`TransferReceiver::dequeue`]
//! returns `None`. A producer worker can therefore treat `None` as
//! "every partition is finished and nothing is left to publish" without
//! polling queue length against completion tokens.
//!
//! Records from one partition enter in source-offset order through its
//! single reader and are never reordered by the queue; interleaving
//! *across* partitions is unspecified.

use crate::broker::Record;
use crate::error::{FirehoseError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Read-only view of the queue's fill level, for the monitor.
#[derive(Clone)]
pub struct DepthGauge {
    depth: Arc<AtomicUsize>,
    capacity: usize,
}

impl DepthGauge {
    /// Records currently buffered.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Fixed capacity the queue was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill ratio in `[0, 1]`, a saturation signal.
    pub fn saturation(&self) -> f64 {
        self.depth() as f64 / self.capacity as f64
    }
}

/// Enqueue half, cloned once per consumer worker.
#[derive(Clone)]
pub struct TransferSender {
    tx: mpsc::Sender<Record>,
    gauge: DepthGauge,
}

impl TransferSender {
    /// Enqueue a record, suspending while the queue is full.
    ///
    /// Fails with [`FirehoseError::Shutdown`] if every receiver is gone,
    /// which only happens when the pipeline is tearing down.
    pub async fn enqueue(&self, record: Record) -> Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| FirehoseError::Shutdown)?;
        self.gauge.depth.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Depth gauge handle for this queue.
    pub fn gauge(&self) -> DepthGauge {
        self.gauge.clone()
    }
}

/// Dequeue half, cloned once per producer worker.
#[derive(Clone)]
pub struct TransferReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Record>>>,
    gauge: DepthGauge,
}

impl TransferReceiver {
    /// Dequeue the next record, suspending while the queue is empty.
    ///
    /// Returns `None` once every sender has been dropped and the buffer
    /// is drained. Cancellation-safe: a cancelled `dequeue` never loses
    /// a record.
    pub async fn dequeue(&self) -> Option<Record> {
        let mut guard = self.lock().await;
        guard.recv().await
    }

    /// Acquire the dequeue side exclusively.
    ///
    /// A producer worker holds the guard across dequeue *and* submission
    /// so that submission order matches dequeue order; that is what
    /// keeps one partition's records in source-offset order at the
    /// destination even with several producer workers.
    pub async fn lock(&self) -> DequeueGuard<'_> {
        DequeueGuard {
            rx: self.rx.lock().await,
            gauge: &self.gauge,
        }
    }

    /// Depth gauge handle for this queue.
    pub fn gauge(&self) -> DepthGauge {
        self.gauge.clone()
    }
}

/// Exclusive access to the dequeue side of the queue.
pub struct DequeueGuard<'a> {
    rx: tokio::sync::MutexGuard<'a, mpsc::Receiver<Record>>,
    gauge: &'a DepthGauge,
}

impl DequeueGuard<'_> {
    /// Dequeue the next record. Cancellation-safe.
    pub async fn recv(&mut self) -> Option<Record> {
        let record = self.rx.recv().await;
        if record.is_some() {
            self.gauge.depth.fetch_sub(1, Ordering::Relaxed);
        }
        record
    }
}

/// Create a transfer queue with the given capacity.
pub fn bounded(capacity: usize) -> (TransferSender, TransferReceiver) {
    assert!(capacity > 0, "transfer queue capacity must be non-zero");
    let (tx, rx) = mpsc::channel(capacity);
    let gauge = DepthGauge {
        depth: Arc::new(AtomicUsize::new(0)),
        capacity,
    };
    (
        TransferSender {
            tx,
            gauge: gauge.clone(),
        },
        TransferReceiver {
            rx: Arc::new(Mutex::new(rx)),
            gauge,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(offset: i64) -> Record {
        Record {
            topic: "events".to_string(),
            partition: 0,
            key: vec![],
            value: offset.to_be_bytes().to_vec(),
            offset,
        }
    }

    #[tokio::test]
    async fn test_fifo_order_single_stream() {
        let (tx, rx) = bounded(10);
        for offset in 0..5 {
            tx.enqueue(record(offset)).await.unwrap();
        }
        for offset in 0..5 {
            assert_eq!(rx.dequeue().await.unwrap().offset, offset);
        }
    }

    #[tokio::test]
    async fn test_depth_tracks_enqueue_dequeue() {
        let (tx, rx) = bounded(10);
        let gauge = tx.gauge();
        assert_eq!(gauge.depth(), 0);

        tx.enqueue(record(1)).await.unwrap();
        tx.enqueue(record(2)).await.unwrap();
        assert_eq!(gauge.depth(), 2);

        rx.dequeue().await.unwrap();
        assert_eq!(gauge.depth(), 1);
        assert_eq!(gauge.capacity(), 10);
    }

    #[tokio::test]
    async fn test_enqueue_suspends_when_full() {
        let (tx, rx) = bounded(2);
        tx.enqueue(record(1)).await.unwrap();
        tx.enqueue(record(2)).await.unwrap();

        // Third enqueue must not complete until a slot frees up.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), tx.enqueue(record(3))).await;
        assert!(blocked.is_err(), "enqueue should suspend at capacity");

        rx.dequeue().await.unwrap();
        tokio::time::timeout(Duration::from_millis(50), tx.enqueue(record(3)))
            .await
            .expect("slot freed")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dequeue_suspends_when_empty() {
        let (_tx, rx) = bounded(2);
        let blocked = tokio::time::timeout(Duration::from_millis(50), rx.dequeue()).await;
        assert!(blocked.is_err(), "dequeue should suspend when empty");
    }

    #[tokio::test]
    async fn test_close_drains_then_none() {
        let (tx, rx) = bounded(10);
        tx.enqueue(record(1)).await.unwrap();
        tx.enqueue(record(2)).await.unwrap();
        drop(tx);

        assert_eq!(rx.dequeue().await.unwrap().offset, 1);
        assert_eq!(rx.dequeue().await.unwrap().offset, 2);
        assert!(rx.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_close_requires_all_senders_dropped() {
        let (tx, rx) = bounded(10);
        let tx2 = tx.clone();
        drop(tx);

        tx2.enqueue(record(7)).await.unwrap();
        assert_eq!(rx.dequeue().await.unwrap().offset, 7);

        // One sender still alive: dequeue suspends instead of closing.
        let blocked = tokio::time::timeout(Duration::from_millis(50), rx.dequeue()).await;
        assert!(blocked.is_err());

        drop(tx2);
        assert!(rx.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_gone_is_shutdown() {
        let (tx, rx) = bounded(2);
        drop(rx);
        let err = tx.enqueue(record(1)).await.unwrap_err();
        assert!(matches!(err, FirehoseError::Shutdown));
    }

    #[tokio::test]
    async fn test_concurrent_consumers_share_queue() {
        let (tx, rx) = bounded(100);
        let rx2 = rx.clone();

        let feeder = tokio::spawn(async move {
            for offset in 0..50 {
                tx.enqueue(record(offset)).await.unwrap();
            }
        });

        let a = tokio::spawn(async move {
            let mut got = Vec::new();
            while let Some(r) = rx.dequeue().await {
                got.push(r.offset);
            }
            got
        });
        let b = tokio::spawn(async move {
            let mut got = Vec::new();
            while let Some(r) = rx2.dequeue().await {
                got.push(r.offset);
            }
            got
        });

        feeder.await.unwrap();
        let mut all = a.await.unwrap();
        all.extend(b.await.unwrap());
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }
}
