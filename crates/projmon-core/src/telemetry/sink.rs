//! Bounded delivery queue
//!
//! [`SinkClient::send`] never waits on the network: points go into a bounded
//! queue drained by a fixed pool of workers. When the queue is full the point
//! is dropped and counted. Shutdown closes the queue and gives the workers a
//! deadline to finish what is already queued.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::{Point, PointWriter, SinkError};
use crate::config::SinkConfig;

/// Most points a worker sends in one write
pub const MAX_BATCH: usize = 32;

/// Queue and pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    /// Points that may wait before new ones are dropped
    pub queue_capacity: usize,
    /// Concurrent writers
    pub workers: usize,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            workers: 2,
        }
    }
}

impl From<&SinkConfig> for SinkOptions {
    fn from(config: &SinkConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            workers: config.workers,
        }
    }
}

#[derive(Debug, Default)]
struct SinkStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    /// Points handed to the writer and not yet settled
    in_flight: AtomicUsize,
}

/// Delivery counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Points the writer accepted
    pub delivered: u64,
    /// Points in batches the writer rejected
    pub failed: u64,
    /// Points refused because the queue was full
    pub dropped: u64,
}

/// Outcome of [`SinkClient::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Counters at the end of shutdown
    pub stats: StatsSnapshot,
    /// Points still queued or mid-write when the deadline passed
    pub abandoned: usize,
    /// Whether the deadline passed before the workers finished
    pub timed_out: bool,
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<Point>>>;

/// Handle for forwarding points to the time-series store
pub struct SinkClient {
    tx: mpsc::Sender<Point>,
    rx: SharedReceiver,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<SinkStats>,
}

impl SinkClient {
    /// Spawn the worker pool on the current runtime
    pub fn start(writer: Arc<dyn PointWriter>, options: SinkOptions) -> Self {
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));
        let stats = Arc::new(SinkStats::default());

        let workers = (0..options.workers.max(1))
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    Arc::clone(&rx),
                    Arc::clone(&writer),
                    Arc::clone(&stats),
                ))
            })
            .collect();

        Self {
            tx,
            rx,
            workers,
            stats,
        }
    }

    /// Queue a point for delivery without waiting.
    ///
    /// The point is stamped with the current time if it has no timestamp yet.
    pub fn send(&self, mut point: Point) -> Result<(), SinkError> {
        point.stamp_now();
        match self.tx.try_send(point) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SinkError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SinkError::Closed),
        }
    }

    /// Current delivery counters
    pub fn stats(&self) -> StatsSnapshot {
        snapshot(&self.stats)
    }

    /// Points waiting for a worker
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Stop accepting points and wait up to `timeout` for the queue to drain
    pub async fn shutdown(self, timeout: Duration) -> DrainReport {
        let SinkClient {
            tx,
            rx,
            mut workers,
            stats,
        } = self;
        drop(tx);

        // Finished handles are popped so the abort path only sees live workers
        let drained = tokio::time::timeout(timeout, async {
            while let Some(handle) = workers.last_mut() {
                let _ = handle.await;
                workers.pop();
            }
        })
        .await;

        let timed_out = drained.is_err();
        let mut abandoned = 0;
        if timed_out {
            for handle in &workers {
                handle.abort();
            }
            for handle in workers {
                let _ = handle.await;
            }
            abandoned = rx.lock().await.len() + stats.in_flight.load(Ordering::Relaxed);
            tracing::warn!(abandoned, "telemetry drain timed out");
        }

        let report = DrainReport {
            stats: snapshot(&stats),
            abandoned,
            timed_out,
        };
        tracing::info!(?report, "telemetry sink stopped");
        report
    }
}

fn snapshot(stats: &SinkStats) -> StatsSnapshot {
    StatsSnapshot {
        delivered: stats.delivered.load(Ordering::Relaxed),
        failed: stats.failed.load(Ordering::Relaxed),
        dropped: stats.dropped.load(Ordering::Relaxed),
    }
}

async fn worker(
    id: usize,
    rx: SharedReceiver,
    writer: Arc<dyn PointWriter>,
    stats: Arc<SinkStats>,
) {
    loop {
        let batch = {
            let mut rx = rx.lock().await;
            let Some(first) = rx.recv().await else {
                break;
            };
            let mut batch = vec![first];
            while batch.len() < MAX_BATCH {
                match rx.try_recv() {
                    Ok(point) => batch.push(point),
                    Err(_) => break,
                }
            }
            batch
        };

        let count = batch.len() as u64;
        // Left raised if the worker is aborted mid-write
        stats.in_flight.fetch_add(batch.len(), Ordering::Relaxed);
        let result = writer.write(&batch).await;
        stats.in_flight.fetch_sub(batch.len(), Ordering::Relaxed);

        match result {
            Ok(()) => {
                stats.delivered.fetch_add(count, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(count, Ordering::Relaxed);
                tracing::warn!(worker = id, points = count, "error sending points to InfluxDB: {e}");
            }
        }
    }

    tracing::debug!(worker = id, "telemetry worker finished");
}
