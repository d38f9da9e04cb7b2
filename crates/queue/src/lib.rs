//! Message transport between the ingestion gateway and the workers.
//!
//! The [`Transport`] trait is the only contract the rest of the pipeline
//! sees: at-least-once delivery, a visibility window per delivery, explicit
//! acknowledgement, and a bounded number of receives before a message is
//! set aside on a dead-letter channel. [`InMemoryQueue`] implements it in
//! process.
//!
//! ```
//! use queue::{InMemoryQueue, OutboundMessage, Transport};
//!
//! let rt = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()
//!     .unwrap();
//! rt.block_on(async {
//!     let q = InMemoryQueue::default();
//!     q.send(OutboundMessage::new("hello").with_attribute("tenant_id", "acme"))
//!         .await
//!         .unwrap();
//!
//!     let batch = q.receive(10).await.unwrap();
//!     assert_eq!(batch[0].body, "hello");
//!     q.ack(&batch[0].receipt).await.unwrap();
//! });
//! ```
mod config;
mod error;
mod memory;
mod transport;

pub use crate::config::{QueueConfig, RedeliveryPolicy};
pub use crate::error::QueueError;
pub use crate::memory::{DeadLetter, InMemoryQueue, QueueDepth};
pub use crate::transport::{Delivery, MessageId, OutboundMessage, ReceiptHandle, Transport};
