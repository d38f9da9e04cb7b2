//! Workspace umbrella crate for the logflow pipeline.
//!
//! Requests enter through the [`IngestionGateway`], which normalizes both
//! ingress shapes into one [`CanonicalMessage`](ingest::CanonicalMessage),
//! validates it and hands it to a [`Transport`](queue::Transport). Workers
//! consume the transport, redact the text and commit each message at most
//! once per `(tenant_id, log_id)` through the store's
//! [`IdempotencyGuard`](store::IdempotencyGuard).
//!
//! ```
//! use std::sync::Arc;
//!
//! use logflow::{IngestionGateway, PipelineConfig};
//! use logflow::ingest::RawRequest;
//! use logflow::queue::InMemoryQueue;
//!
//! let config = PipelineConfig::default();
//! let queue = Arc::new(InMemoryQueue::new(config.queue.policy()));
//! let gateway = IngestionGateway::new(queue, config.ingest.clone());
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let acceptance = rt
//!     .block_on(gateway.handle(RawRequest::json(r#"{"tenant_id":"acme_corp","text":"hi"}"#)))
//!     .unwrap();
//! assert_eq!(acceptance.tenant_id, "acme_corp");
//! ```
pub mod config;
pub mod gateway;

pub use config::{ConfigLoadError, PipelineConfig};
pub use gateway::{Acceptance, GatewayError, GatewayResponse, IngestionGateway, TENANT_ATTRIBUTE};

pub use ingest;
pub use queue;
pub use redact;
pub use store;
pub use worker;
