//! Polling loop.
use std::sync::Arc;

use queue::Transport;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::processor::{BatchReport, Processor};

/// Receives and handles batches until `cancel` fires.
///
/// An empty receive or a transport error pauses for
/// [`WorkerConfig::poll_interval`] before the next attempt. Cancellation
/// stops the receive and the pause immediately. A batch in progress releases
/// deliveries still in their simulated delay, which stay unacknowledged and
/// come back after their visibility window; deliveries already committing
/// finish and are acknowledged before the loop returns.
pub async fn run_worker(
    transport: Arc<dyn Transport>,
    processor: Arc<Processor>,
    config: WorkerConfig,
    cancel: CancellationToken,
) -> BatchReport {
    let mut totals = BatchReport::default();
    info!(
        batch_size = config.batch_size,
        poll_interval_ms = config.poll_interval_ms,
        "worker_started"
    );

    while !cancel.is_cancelled() {
        let received = tokio::select! {
            () = cancel.cancelled() => break,
            received = transport.receive(config.batch_size) => received,
        };

        match received {
            Ok(deliveries) if deliveries.is_empty() => {
                debug!("queue_empty");
            }
            Ok(deliveries) => {
                let report = processor
                    .handle_batch_until(transport.as_ref(), deliveries, &cancel)
                    .await;
                if report.interrupted > 0 {
                    warn!(interrupted = report.interrupted, "batch_interrupted");
                }
                totals.merge(report);
                continue;
            }
            Err(err) => {
                warn!(error = %err, "receive_failed");
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(config.poll_interval()) => {}
        }
    }

    info!(
        committed = totals.committed,
        duplicates = totals.duplicates,
        failed = totals.failed,
        ack_failures = totals.ack_failures,
        interrupted = totals.interrupted,
        "worker_stopped"
    );
    totals
}

/// Spawns `config.concurrency` independent polling loops sharing one
/// transport and one processor.
pub fn spawn_workers(
    transport: Arc<dyn Transport>,
    processor: Arc<Processor>,
    config: &WorkerConfig,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<BatchReport>> {
    (0..config.concurrency)
        .map(|_| {
            tokio::spawn(run_worker(
                Arc::clone(&transport),
                Arc::clone(&processor),
                config.clone(),
                cancel.child_token(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use ingest::{CanonicalMessage, Source};
    use queue::{InMemoryQueue, OutboundMessage, QueueDepth};
    use store::{
        IdempotencyGuard, InMemoryStore, LogStore, PutOutcome, StorageKey, StoreError,
        StoredLogRecord,
    };

    use super::*;

    fn body(log_id: &str) -> String {
        serde_json::to_string(&CanonicalMessage {
            tenant_id: "t1".into(),
            log_id: log_id.into(),
            text: "ping 10.0.0.1".into(),
            source: Source::Text,
            ingested_at: Utc::now(),
        })
        .unwrap()
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            simulate_delay: false,
            poll_interval_ms: 5,
            batch_size: 2,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drains_queue_until_cancelled() {
        let queue = Arc::new(InMemoryQueue::default());
        for i in 0..5 {
            queue
                .send(OutboundMessage::new(body(&format!("log-{i}"))))
                .await
                .unwrap();
        }

        let store = Arc::new(InMemoryStore::new());
        let config = fast_config();
        let processor = Arc::new(Processor::new(
            IdempotencyGuard::new(store.clone()),
            config.clone(),
        ));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(
            queue.clone(),
            processor,
            config,
            cancel.clone(),
        ));

        for _ in 0..200 {
            if store.len().unwrap() == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        let totals = handle.await.unwrap();

        assert_eq!(store.len().unwrap(), 5);
        assert_eq!(totals.committed, 5);
        assert_eq!(queue.depth().unwrap(), QueueDepth::default());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_batch_leaves_messages_unacknowledged() {
        let queue = Arc::new(InMemoryQueue::default());
        queue.send(OutboundMessage::new(body("slow"))).await.unwrap();

        let store = Arc::new(InMemoryStore::new());
        let config = WorkerConfig {
            simulate_delay: true,
            cost_per_char_ms: 1_000,
            ..fast_config()
        };
        let processor = Arc::new(Processor::new(
            IdempotencyGuard::new(store.clone()),
            config.clone(),
        ));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(queue.clone(), processor, config, cancel.clone()));

        // The message costs 13 s; cancel well before that.
        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();
        let totals = handle.await.unwrap();

        assert_eq!(totals.processed(), 0);
        assert_eq!(totals.interrupted, 1);
        assert!(store.is_empty().unwrap());
        assert_eq!(queue.depth().unwrap().in_flight, 1);
    }

    /// Writes through to memory, then holds the caller a little longer, so
    /// the record is visible before the commit step returns.
    struct LaggingStore {
        inner: InMemoryStore,
        lag: Duration,
    }

    impl LogStore for LaggingStore {
        fn put_if_absent(&self, record: &StoredLogRecord) -> Result<PutOutcome, StoreError> {
            let outcome = self.inner.put_if_absent(record)?;
            std::thread::sleep(self.lag);
            Ok(outcome)
        }

        fn get(&self, key: &StorageKey) -> Result<Option<StoredLogRecord>, StoreError> {
            self.inner.get(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_after_commit_still_acknowledges() {
        let queue = Arc::new(InMemoryQueue::default());
        queue.send(OutboundMessage::new(body("late-ack"))).await.unwrap();

        let store = Arc::new(LaggingStore {
            inner: InMemoryStore::new(),
            lag: Duration::from_millis(50),
        });
        let config = fast_config();
        let processor = Arc::new(Processor::new(
            IdempotencyGuard::new(store.clone()),
            config.clone(),
        ));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(queue.clone(), processor, config, cancel.clone()));

        // Cancel as soon as the record lands, while the commit step is
        // still inside the store call.
        for _ in 0..500 {
            if store.inner.len().unwrap() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();
        let totals = handle.await.unwrap();

        assert_eq!(store.inner.len().unwrap(), 1);
        assert_eq!(totals.committed, 1);
        assert_eq!(totals.interrupted, 0);
        assert_eq!(queue.depth().unwrap(), QueueDepth::default());
    }

    #[tokio::test]
    async fn spawns_one_loop_per_concurrency_slot() {
        let queue: Arc<dyn Transport> = Arc::new(InMemoryQueue::default());
        let processor = Arc::new(Processor::new(
            IdempotencyGuard::new(Arc::new(InMemoryStore::new())),
            fast_config(),
        ));
        let cancel = CancellationToken::new();
        let config = WorkerConfig {
            concurrency: 3,
            ..fast_config()
        };
        let handles = spawn_workers(queue, processor, &config, &cancel);
        assert_eq!(handles.len(), 3);

        cancel.cancel();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), BatchReport::default());
        }
    }
}
