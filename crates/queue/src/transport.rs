//! The transport contract between the gateway and the workers.
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueueError;

/// Broker-assigned identifier of an enqueued message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token naming one delivery of a message. Each receive of the same
/// message yields a different handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message handed to [`Transport::send`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub body: String,
    /// Routing attributes, e.g. `tenant_id`.
    pub attributes: BTreeMap<String, String>,
}

impl OutboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// One delivery of a message to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: MessageId,
    pub receipt: ReceiptHandle,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
    /// How many times this message has been handed out, this delivery
    /// included. Starts at 1.
    pub receive_count: u32,
}

/// At-least-once message transport.
///
/// A delivered message stays invisible until it is acknowledged or its
/// visibility window lapses; in the latter case it is delivered again.
/// Consumers must therefore tolerate duplicates and acknowledge only after
/// their side effects are durable.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Enqueues a message. Success means the broker has taken ownership.
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, QueueError>;

    /// Returns up to `max_messages` currently visible messages. Returns an
    /// empty batch, without waiting, when nothing is visible.
    async fn receive(&self, max_messages: usize) -> Result<Vec<Delivery>, QueueError>;

    /// Permanently removes the delivery named by `receipt`.
    async fn ack(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;
}
