//! In-process queue with SQS-style visibility and dead-lettering.
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RedeliveryPolicy;
use crate::error::QueueError;
use crate::transport::{Delivery, MessageId, OutboundMessage, ReceiptHandle, Transport};

/// Counts of messages in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    /// Visible and waiting for a consumer.
    pub ready: usize,
    /// Handed out and not yet acknowledged.
    pub in_flight: usize,
    pub dead_lettered: usize,
}

/// A message that exhausted its receive budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub message_id: MessageId,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
    pub receive_count: u32,
    pub dead_lettered_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Stored {
    seq: u64,
    message_id: MessageId,
    body: String,
    attributes: BTreeMap<String, String>,
    receive_count: u32,
}

#[derive(Debug)]
struct InFlight {
    message: Stored,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    ready: VecDeque<Stored>,
    in_flight: HashMap<ReceiptHandle, InFlight>,
    dead: Vec<DeadLetter>,
    closed: bool,
}

impl State {
    /// Returns lapsed in-flight deliveries to the ready queue, oldest
    /// lapse first, so redelivery order is deterministic.
    fn reclaim_expired(&mut self, now: Instant) {
        let mut expired: Vec<ReceiptHandle> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(r, _)| r.clone())
            .collect();
        if expired.is_empty() {
            return;
        }
        expired.sort_by_key(|r| {
            let f = &self.in_flight[r];
            (f.visible_at, f.message.seq)
        });
        for receipt in expired {
            if let Some(flight) = self.in_flight.remove(&receipt) {
                debug!(
                    message_id = %flight.message.message_id,
                    receive_count = flight.message.receive_count,
                    "visibility_lapsed"
                );
                self.ready.push_back(flight.message);
            }
        }
    }
}

/// A [`Transport`] held entirely in memory.
///
/// Time is read from [`tokio::time::Instant`], so tests running on a paused
/// clock can step through visibility windows with `tokio::time::advance`.
#[derive(Debug)]
pub struct InMemoryQueue {
    policy: RedeliveryPolicy,
    state: Mutex<State>,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(RedeliveryPolicy::default())
    }
}

impl InMemoryQueue {
    pub fn new(policy: RedeliveryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(State::default()),
        }
    }

    pub fn policy(&self) -> RedeliveryPolicy {
        self.policy
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::internal("poisoned lock"))
    }

    /// Current message counts. Deliveries whose window has lapsed but which
    /// have not been reclaimed by a receive still count as in flight.
    pub fn depth(&self) -> Result<QueueDepth, QueueError> {
        let state = self.lock()?;
        Ok(QueueDepth {
            ready: state.ready.len(),
            in_flight: state.in_flight.len(),
            dead_lettered: state.dead.len(),
        })
    }

    /// Snapshot of the dead-letter channel.
    pub fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        Ok(self.lock()?.dead.clone())
    }

    /// Makes every subsequent operation fail with
    /// [`QueueError::Unavailable`], as if the broker were unreachable.
    pub fn close(&self) -> Result<(), QueueError> {
        self.lock()?.closed = true;
        Ok(())
    }

    /// Undoes [`close`](Self::close).
    pub fn reopen(&self) -> Result<(), QueueError> {
        self.lock()?.closed = false;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().map(|s| s.closed).unwrap_or(true)
    }
}

fn unavailable() -> QueueError {
    QueueError::Unavailable("queue is closed".into())
}

#[async_trait]
impl Transport for InMemoryQueue {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, QueueError> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(unavailable());
        }
        let message_id = MessageId::generate();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.ready.push_back(Stored {
            seq,
            message_id: message_id.clone(),
            body: message.body,
            attributes: message.attributes,
            receive_count: 0,
        });
        debug!(message_id = %message_id, "message_enqueued");
        Ok(message_id)
    }

    async fn receive(&self, max_messages: usize) -> Result<Vec<Delivery>, QueueError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        if state.closed {
            return Err(unavailable());
        }
        state.reclaim_expired(now);

        let mut batch = Vec::new();
        while batch.len() < max_messages {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };

            if message.receive_count >= self.policy.max_receive_count {
                warn!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    "message_dead_lettered"
                );
                state.dead.push(DeadLetter {
                    message_id: message.message_id,
                    body: message.body,
                    attributes: message.attributes,
                    receive_count: message.receive_count,
                    dead_lettered_at: Utc::now(),
                });
                continue;
            }

            message.receive_count += 1;
            let receipt = ReceiptHandle::generate();
            batch.push(Delivery {
                message_id: message.message_id.clone(),
                receipt: receipt.clone(),
                body: message.body.clone(),
                attributes: message.attributes.clone(),
                receive_count: message.receive_count,
            });
            state.in_flight.insert(
                receipt,
                InFlight {
                    message,
                    visible_at: now + self.policy.visibility_timeout,
                },
            );
        }
        Ok(batch)
    }

    async fn ack(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(unavailable());
        }
        match state.in_flight.remove(receipt) {
            Some(flight) => {
                debug!(message_id = %flight.message.message_id, "message_acked");
                Ok(())
            }
            None => Err(QueueError::UnknownReceipt(receipt.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn queue(visibility_secs: u64, max_receive_count: u32) -> InMemoryQueue {
        InMemoryQueue::new(RedeliveryPolicy {
            visibility_timeout: Duration::from_secs(visibility_secs),
            max_receive_count,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_message_is_hidden_until_acked() {
        let q = queue(30, 3);
        let id = q
            .send(OutboundMessage::new("hello").with_attribute("tenant_id", "acme"))
            .await
            .unwrap();

        let batch = q.receive(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message_id, id);
        assert_eq!(batch[0].receive_count, 1);
        assert_eq!(batch[0].attributes.get("tenant_id").map(String::as_str), Some("acme"));

        assert!(q.receive(10).await.unwrap().is_empty());
        assert_eq!(q.depth().unwrap(), QueueDepth { ready: 0, in_flight: 1, dead_lettered: 0 });

        q.ack(&batch[0].receipt).await.unwrap();
        assert_eq!(q.depth().unwrap(), QueueDepth::default());
    }

    #[tokio::test(start_paused = true)]
    async fn unacked_message_is_redelivered_with_new_receipt() {
        let q = queue(30, 3);
        q.send(OutboundMessage::new("m")).await.unwrap();
        let first = q.receive(1).await.unwrap().remove(0);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(q.receive(1).await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(1)).await;
        let second = q.receive(1).await.unwrap().remove(0);
        assert_eq!(second.message_id, first.message_id);
        assert_eq!(second.receive_count, 2);
        assert_ne!(second.receipt, first.receipt);

        assert!(matches!(
            q.ack(&first.receipt).await,
            Err(QueueError::UnknownReceipt(_))
        ));
        q.ack(&second.receipt).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_message_moves_to_dead_letters() {
        let q = queue(10, 2);
        q.send(OutboundMessage::new("poison")).await.unwrap();

        for expected in 1..=2 {
            let d = q.receive(1).await.unwrap().remove(0);
            assert_eq!(d.receive_count, expected);
            tokio::time::advance(Duration::from_secs(10)).await;
        }

        assert!(q.receive(1).await.unwrap().is_empty());
        let dead = q.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].body, "poison");
        assert_eq!(dead[0].receive_count, 2);
        assert_eq!(q.depth().unwrap(), QueueDepth { ready: 0, in_flight: 0, dead_lettered: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn receive_respects_batch_limit_and_order() {
        let q = queue(30, 3);
        for i in 0..5 {
            q.send(OutboundMessage::new(format!("m{i}"))).await.unwrap();
        }
        let first: Vec<_> = q.receive(3).await.unwrap().into_iter().map(|d| d.body).collect();
        assert_eq!(first, ["m0", "m1", "m2"]);
        let rest: Vec<_> = q.receive(3).await.unwrap().into_iter().map(|d| d.body).collect();
        assert_eq!(rest, ["m3", "m4"]);
    }

    #[tokio::test]
    async fn closed_queue_is_unavailable() {
        let q = InMemoryQueue::default();
        q.close().unwrap();
        assert!(q.is_closed());
        assert!(matches!(
            q.send(OutboundMessage::new("x")).await,
            Err(QueueError::Unavailable(_))
        ));
        q.reopen().unwrap();
        assert!(q.send(OutboundMessage::new("x")).await.is_ok());
    }

    #[tokio::test]
    async fn double_ack_is_rejected() {
        let q = InMemoryQueue::default();
        q.send(OutboundMessage::new("x")).await.unwrap();
        let d = q.receive(1).await.unwrap().remove(0);
        q.ack(&d.receipt).await.unwrap();
        assert!(matches!(q.ack(&d.receipt).await, Err(QueueError::UnknownReceipt(_))));
    }
}
