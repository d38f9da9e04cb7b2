//! Queue consumer for the log pipeline.
//!
//! For every delivered [`CanonicalMessage`](ingest::CanonicalMessage) the
//! worker
//!
//! 1. computes a simulated, length-proportional processing cost and waits it
//!    out,
//! 2. redacts the text,
//! 3. builds a [`StoredLogRecord`](store::StoredLogRecord) holding both the
//!    original and the redacted text,
//! 4. commits it through the [`IdempotencyGuard`](store::IdempotencyGuard),
//! 5. acknowledges the delivery once the commit reports either outcome.
//!
//! Any failure leaves the delivery unacknowledged. The worker never retries
//! on its own; redelivery, attempt counting and dead-lettering belong to the
//! transport.
mod config;
mod error;
mod processor;
mod runner;

pub use crate::config::{round_seconds, WorkerConfig};
pub use crate::error::{ProcessingFailure, WorkerConfigError};
pub use crate::processor::{BatchReport, Processor};
pub use crate::runner::{run_worker, spawn_workers};
