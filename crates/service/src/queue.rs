//! Bounded hand-off from ingestion to the anomaly worker.
//!
//! Ingestion never waits on evaluation: `submit` either enqueues or fails
//! immediately. The worker drains the queue until every [`AnomalyQueue`]
//! handle is dropped, then reports what it did.

use std::sync::Arc;

use chrono::Utc;
use gridwatch_core::Reading;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::anomaly::AnomalyService;
use crate::error::ServiceError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Cloneable submit handle.
#[derive(Debug, Clone)]
pub struct AnomalyQueue {
    tx: mpsc::Sender<Reading>,
}

/// Counters returned when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: usize,
    pub anomalies: usize,
    pub failed: usize,
}

impl AnomalyQueue {
    /// Start a worker draining into `service`.
    pub fn spawn(service: Arc<AnomalyService>, capacity: usize) -> (Self, JoinHandle<WorkerStats>) {
        let (tx, rx) = mpsc::channel::<Reading>(capacity.max(1));
        let handle = tokio::spawn(run_worker(service, rx));
        (Self { tx }, handle)
    }

    /// Enqueue without waiting.
    pub fn submit(&self, reading: Reading) -> Result<(), ServiceError> {
        self.tx.try_send(reading).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ServiceError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ServiceError::QueueClosed,
        })
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

async fn run_worker(service: Arc<AnomalyService>, mut rx: mpsc::Receiver<Reading>) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(reading) = rx.recv().await {
        stats.processed += 1;
        match service.evaluate(&reading, Utc::now()).await {
            Ok(eval) if eval.alert.is_some() => stats.anomalies += 1,
            Ok(_) => {}
            Err(e) => {
                stats.failed += 1;
                warn!(
                    facility_id = %reading.facility_id,
                    meter_id = %reading.meter_id,
                    timestamp = reading.timestamp,
                    error = %e,
                    "anomaly evaluation failed"
                );
            }
        }
    }

    info!(
        processed = stats.processed,
        anomalies = stats.anomalies,
        failed = stats.failed,
        "anomaly worker stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_core::config::AnomalyConfig;
    use gridwatch_notify::Dispatcher;
    use gridwatch_storage::MemoryStore;

    fn service(store: &Arc<MemoryStore>) -> Arc<AnomalyService> {
        Arc::new(AnomalyService::new(
            store.clone(),
            store.clone(),
            Arc::new(Dispatcher::empty()),
            AnomalyConfig::default(),
        ))
    }

    #[tokio::test]
    async fn worker_drains_and_stops_when_handles_drop() {
        let store = Arc::new(MemoryStore::new());
        let (queue, worker) = AnomalyQueue::spawn(service(&store), 8);

        queue.submit(Reading::new("facility-001", "m1", 1_705_276_800, 230.0, 10.0, 5.0)).unwrap();
        queue.submit(Reading::new("facility-001", "m2", 1_705_276_800, 230.0, 10.0, 0.0)).unwrap();
        drop(queue);

        let stats = worker.await.unwrap();
        assert_eq!(stats, WorkerStats { processed: 2, anomalies: 1, failed: 0 });
    }

    #[tokio::test]
    async fn invalid_readings_are_counted_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let (queue, worker) = AnomalyQueue::spawn(service(&store), 8);

        queue.submit(Reading::new("facility-001", "", 1_705_276_800, 230.0, 10.0, 5.0)).unwrap();
        queue.submit(Reading::new("facility-001", "m1", 1_705_276_800, 230.0, 10.0, 5.0)).unwrap();
        drop(queue);

        let stats = worker.await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.anomalies, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn full_queue_rejects_without_blocking() {
        let store = Arc::new(MemoryStore::new());
        let (queue, worker) = AnomalyQueue::spawn(service(&store), 1);
        let reading = Reading::new("facility-001", "m1", 1_705_276_800, 230.0, 10.0, 5.0);

        // The worker cannot run until this task yields, so the second
        // submit sees a full buffer.
        queue.submit(reading.clone()).unwrap();
        assert!(matches!(queue.submit(reading), Err(ServiceError::QueueFull)));

        drop(queue);
        assert_eq!(worker.await.unwrap().processed, 1);
    }

    #[tokio::test]
    async fn submit_after_worker_exit_is_closed() {
        let store = Arc::new(MemoryStore::new());
        let (queue, worker) = AnomalyQueue::spawn(service(&store), 4);
        worker.abort();
        let _ = worker.await;

        let reading = Reading::new("facility-001", "m1", 1_705_276_800, 230.0, 10.0, 5.0);
        assert!(matches!(queue.submit(reading), Err(ServiceError::QueueClosed)));
    }
}
