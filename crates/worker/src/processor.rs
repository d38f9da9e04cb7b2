//! Per-message commit step and batch handling.
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use ingest::CanonicalMessage;
use metrics::{counter, histogram};
use queue::{Delivery, Transport};
use store::{CommitOutcome, IdempotencyGuard, StoredLogRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{round_seconds, WorkerConfig};
use crate::error::ProcessingFailure;

/// Tally of one or more handled batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Deliveries whose record was written by this worker.
    pub committed: usize,
    /// Deliveries whose record already existed.
    pub duplicates: usize,
    /// Deliveries left unacknowledged after a processing failure.
    pub failed: usize,
    /// Deliveries that were processed but whose acknowledgement failed.
    pub ack_failures: usize,
    /// Deliveries released before their commit because the worker was
    /// shutting down.
    pub interrupted: usize,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.committed += other.committed;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
        self.ack_failures += other.ack_failures;
        self.interrupted += other.interrupted;
    }

    pub fn processed(&self) -> usize {
        self.committed + self.duplicates
    }
}

/// Turns queued canonical messages into stored records.
///
/// The processor keeps no state between messages. Everything it needs to
/// decide whether a message was already handled lives in the store behind
/// the [`IdempotencyGuard`].
#[derive(Debug, Clone)]
pub struct Processor {
    guard: IdempotencyGuard,
    config: WorkerConfig,
}

impl Processor {
    pub fn new(guard: IdempotencyGuard, config: WorkerConfig) -> Self {
        Self { guard, config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Decodes a queue body into a canonical message, rejecting payloads
    /// that could not have come from the gateway.
    pub fn decode(body: &str) -> Result<CanonicalMessage, ProcessingFailure> {
        let message: CanonicalMessage = serde_json::from_str(body)
            .map_err(|err| ProcessingFailure::Malformed(err.to_string()))?;
        if message.tenant_id.is_empty() || !ingest::is_tenant_safe(&message.tenant_id) {
            return Err(ProcessingFailure::Malformed(format!(
                "invalid tenant_id {:?}",
                message.tenant_id
            )));
        }
        if message.log_id.is_empty() {
            return Err(ProcessingFailure::Malformed("empty log_id".into()));
        }
        Ok(message)
    }

    /// Runs the commit step for one message body: simulated processing,
    /// redaction, then a conditional write.
    ///
    /// Both [`CommitOutcome`] variants mean the message is done and may be
    /// acknowledged.
    pub async fn process(&self, body: &str) -> Result<CommitOutcome, ProcessingFailure> {
        self.process_inner(body, None).await
    }

    /// Like [`process`](Self::process), but gives up with
    /// [`ProcessingFailure::Interrupted`] if `cancel` fires during the
    /// simulated delay. Once the commit has started it runs to completion.
    pub async fn process_until(
        &self,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<CommitOutcome, ProcessingFailure> {
        self.process_inner(body, Some(cancel)).await
    }

    async fn process_inner(
        &self,
        body: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommitOutcome, ProcessingFailure> {
        let message = Self::decode(body)?;
        let tenant_id = message.tenant_id.clone();
        let log_id = message.log_id.clone();

        let cost = self.config.simulated_cost(&message.text);
        if self.config.simulate_delay {
            match cancel {
                Some(cancel) => tokio::select! {
                    () = cancel.cancelled() => return Err(ProcessingFailure::Interrupted),
                    () = tokio::time::sleep(cost) => {}
                },
                None => tokio::time::sleep(cost).await,
            }
        }

        let redaction = redact::redact_with_summary(&message.text);
        let processing_time_seconds = round_seconds(cost);
        let record = StoredLogRecord::from_message(
            message,
            redaction.text,
            Utc::now(),
            processing_time_seconds,
        );

        let outcome = self.commit(record).await?;
        histogram!("logflow_worker_processing_seconds").record(processing_time_seconds);
        info!(
            tenant_id = %tenant_id,
            log_id = %log_id,
            outcome = outcome.as_str(),
            processing_time_seconds,
            redactions = redaction.summary.total(),
            "message_processed"
        );
        Ok(outcome)
    }

    /// Conditionally writes `record`. The store call is blocking, so it runs
    /// on the blocking pool.
    pub async fn commit(&self, record: StoredLogRecord) -> Result<CommitOutcome, ProcessingFailure> {
        let guard = self.guard.clone();
        let outcome = tokio::task::spawn_blocking(move || guard.try_commit(&record))
            .await
            .map_err(|err| ProcessingFailure::Join(err.to_string()))??;
        Ok(outcome)
    }

    /// Processes every delivery concurrently and acknowledges each one that
    /// reached a commit outcome. Failed deliveries are left for the
    /// transport to redeliver.
    pub async fn handle_batch(
        &self,
        transport: &dyn Transport,
        deliveries: Vec<Delivery>,
    ) -> BatchReport {
        self.handle_batch_inner(transport, deliveries, None).await
    }

    /// Like [`handle_batch`](Self::handle_batch), releasing deliveries that
    /// are still in their simulated delay when `cancel` fires. Deliveries
    /// already committing finish and are acknowledged.
    pub async fn handle_batch_until(
        &self,
        transport: &dyn Transport,
        deliveries: Vec<Delivery>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        self.handle_batch_inner(transport, deliveries, Some(cancel)).await
    }

    async fn handle_batch_inner(
        &self,
        transport: &dyn Transport,
        deliveries: Vec<Delivery>,
        cancel: Option<&CancellationToken>,
    ) -> BatchReport {
        let started = Instant::now();
        let size = deliveries.len();
        let outcomes = join_all(
            deliveries
                .into_iter()
                .map(|delivery| self.handle_delivery(transport, delivery, cancel)),
        )
        .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            report.merge(outcome);
        }
        debug!(
            size,
            committed = report.committed,
            duplicates = report.duplicates,
            failed = report.failed,
            ack_failures = report.ack_failures,
            interrupted = report.interrupted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch_handled"
        );
        report
    }

    async fn handle_delivery(
        &self,
        transport: &dyn Transport,
        delivery: Delivery,
        cancel: Option<&CancellationToken>,
    ) -> BatchReport {
        let span = info_span!(
            "worker.message",
            message_id = %delivery.message_id,
            receive_count = delivery.receive_count
        );
        async move {
            let mut report = BatchReport::default();
            match self.process_inner(&delivery.body, cancel).await {
                Ok(outcome) => {
                    counter!("logflow_worker_messages_total", "outcome" => outcome.as_str())
                        .increment(1);
                    match outcome {
                        CommitOutcome::Committed => report.committed += 1,
                        CommitOutcome::AlreadyExists => report.duplicates += 1,
                    }
                    if let Err(err) = transport.ack(&delivery.receipt).await {
                        warn!(error = %err, "ack_failed");
                        report.ack_failures += 1;
                    }
                }
                Err(ProcessingFailure::Interrupted) => {
                    debug!("delivery_released");
                    report.interrupted += 1;
                }
                Err(failure) => {
                    counter!("logflow_worker_messages_total", "outcome" => "failed").increment(1);
                    warn!(
                        kind = failure.kind(),
                        error = %failure,
                        "processing_failed"
                    );
                    report.failed += 1;
                }
            }
            report
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ingest::Source;
    use queue::{InMemoryQueue, OutboundMessage, QueueDepth, RedeliveryPolicy};
    use store::{InMemoryStore, LogStore, PutOutcome, StorageKey, StoreError};

    use super::*;

    fn message(log_id: &str, text: &str) -> String {
        serde_json::to_string(&CanonicalMessage {
            tenant_id: "acme_corp".into(),
            log_id: log_id.into(),
            text: text.into(),
            source: Source::Json,
            ingested_at: Utc::now(),
        })
        .unwrap()
    }

    fn processor(store: Arc<dyn LogStore>, simulate_delay: bool) -> Processor {
        Processor::new(
            IdempotencyGuard::new(store),
            WorkerConfig {
                simulate_delay,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn commit_step_twice_yields_one_record() {
        let store = Arc::new(InMemoryStore::new());
        let p = processor(store.clone(), false);
        let body = message("log-1", "User john@example.com called 555-1234");

        assert_eq!(p.process(&body).await.unwrap(), CommitOutcome::Committed);
        assert_eq!(p.process(&body).await.unwrap(), CommitOutcome::AlreadyExists);
        assert_eq!(store.len().unwrap(), 1);

        let record = store
            .get(&StorageKey::new("acme_corp", "log-1"))
            .unwrap()
            .expect("stored");
        assert_eq!(record.original_text, "User john@example.com called 555-1234");
        assert_eq!(record.redacted_text, "User [EMAIL_REDACTED] called [REDACTED]");
        assert_eq!(record.text_length, 37);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_delay_matches_recorded_cost() {
        let store = Arc::new(InMemoryStore::new());
        let p = processor(store.clone(), true);
        let started = tokio::time::Instant::now();

        p.process(&message("log-2", "call 555-0199")).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(650));
        let record = store
            .get(&StorageKey::new("acme_corp", "log-2"))
            .unwrap()
            .expect("stored");
        assert_eq!(record.processing_time_seconds, 0.65);
        assert!(record.processed_at >= record.ingested_at);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_delay_releases_delivery_without_writing() {
        let q = InMemoryQueue::default();
        q.send(OutboundMessage::new(message("log-5", "slow line"))).await.unwrap();

        let store = Arc::new(InMemoryStore::new());
        let p = processor(store.clone(), true);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            p.process_until(&message("log-5", "slow line"), &cancel).await,
            Err(ProcessingFailure::Interrupted)
        ));

        let deliveries = q.receive(10).await.unwrap();
        let report = p.handle_batch_until(&q, deliveries, &cancel).await;
        assert_eq!(report.interrupted, 1);
        assert_eq!(report.failed, 0);
        assert!(store.is_empty().unwrap());
        assert_eq!(q.depth().unwrap().in_flight, 1);
    }

    #[tokio::test]
    async fn cancellation_does_not_stop_an_undelayed_commit() {
        let store = Arc::new(InMemoryStore::new());
        let p = processor(store.clone(), false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = p.process_until(&message("log-6", "fast"), &cancel).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn malformed_bodies_are_rejected_before_any_write() {
        let store = Arc::new(InMemoryStore::new());
        let p = processor(store.clone(), false);

        let bodies = [
            "not json".to_string(),
            r#"{"tenant_id":"acme_corp"}"#.to_string(),
            message("", "x"),
            message("l", "x").replace("acme_corp", "acme corp"),
        ];
        for body in &bodies {
            assert!(
                matches!(p.process(body).await, Err(ProcessingFailure::Malformed(_))),
                "body {body:?}"
            );
        }
        assert!(store.is_empty().unwrap());
    }

    struct OfflineStore;

    impl LogStore for OfflineStore {
        fn put_if_absent(&self, _: &StoredLogRecord) -> Result<PutOutcome, StoreError> {
            Err(StoreError::backend("connection refused"))
        }

        fn get(&self, _: &StorageKey) -> Result<Option<StoredLogRecord>, StoreError> {
            Err(StoreError::backend("connection refused"))
        }
    }

    #[tokio::test]
    async fn failed_deliveries_are_not_acknowledged() {
        let q = InMemoryQueue::new(RedeliveryPolicy {
            visibility_timeout: Duration::from_secs(60),
            max_receive_count: 3,
        });
        q.send(OutboundMessage::new(message("log-3", "x"))).await.unwrap();
        q.send(OutboundMessage::new("garbage")).await.unwrap();

        let p = processor(Arc::new(OfflineStore), false);
        let deliveries = q.receive(10).await.unwrap();
        let report = p.handle_batch(&q, deliveries).await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.processed(), 0);
        assert_eq!(
            q.depth().unwrap(),
            QueueDepth {
                ready: 0,
                in_flight: 2,
                dead_lettered: 0
            }
        );
    }

    #[tokio::test]
    async fn duplicate_deliveries_are_acknowledged() {
        let q = InMemoryQueue::default();
        let body = message("log-4", "boot ok");
        q.send(OutboundMessage::new(body.clone())).await.unwrap();
        q.send(OutboundMessage::new(body)).await.unwrap();

        let store = Arc::new(InMemoryStore::new());
        let p = processor(store.clone(), false);
        let deliveries = q.receive(10).await.unwrap();
        let report = p.handle_batch(&q, deliveries).await;

        assert_eq!(report.committed, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.ack_failures, 0);
        assert_eq!(q.depth().unwrap(), QueueDepth::default());
        assert_eq!(store.len().unwrap(), 1);
    }
}
