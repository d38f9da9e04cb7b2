//! logflow ingest layer
//!
//! This is where log submissions enter the pipeline. Two request shapes come
//! in (a JSON object, or a plain-text body with identifiers in headers) and
//! exactly one shape goes out: [`CanonicalMessage`].
//!
//! ## What we do here
//!
//! - **Dispatch on content-type** - `application/json` or `text/plain`,
//!   nothing else, and never by looking at the body
//! - **Extract fields** - pull `tenant_id`, `log_id`, `text` out of whichever
//!   shape arrived
//! - **Validate** - fixed-order field checks, first failure wins
//! - **Finalize** - generate a `log_id` if the caller didn't send one and
//!   stamp `ingested_at`
//! - **Log everything** - structured `tracing` events for every outcome
//!
//! ## Main entry point
//!
//! Call [`ingest`] with a [`RawRequest`] and an [`IngestConfig`]; get back a
//! [`CanonicalMessage`] or a typed [`IngestError`].
//!
//! ## Example
//!
//! ```
//! use ingest::{ingest, IngestConfig, RawRequest, Source};
//!
//! let config = IngestConfig::default();
//! let raw = RawRequest::json(r#"{"tenant_id":"acme_corp","text":"call 555-0199"}"#);
//!
//! let message = ingest(raw, &config).unwrap();
//! assert_eq!(message.tenant_id, "acme_corp");
//! assert_eq!(message.source, Source::Json);
//! assert!(!message.log_id.is_empty());
//! ```
use std::time::Instant;

use tracing::{info, warn, Level};

mod config;
mod error;
mod normalize;
mod types;
mod validate;

pub use crate::config::{ConfigError, IngestConfig, INGEST_CONFIG_VERSION};
pub use crate::error::{Field, IngestError, ValidationError, ValidationReason};
pub use crate::normalize::{finalize, format_for_content_type, generate_log_id};
pub use crate::types::{
    CandidateFields, CanonicalMessage, FieldValue, InboundRequest, RawRequest, RequestMetadata,
    Source, ValidatedFields,
};
pub use crate::validate::{is_tenant_safe, validate};

/// Ingest a raw request: classify, extract, validate, and finalize into a
/// canonical message.
pub fn ingest(raw: RawRequest, cfg: &IngestConfig) -> Result<CanonicalMessage, IngestError> {
    let start = Instant::now();
    let content_type = raw.content_type().unwrap_or_default().to_string();

    let span = tracing::span!(
        Level::INFO,
        "ingest.ingest",
        content_type = %content_type,
        body_len = raw.body.len()
    );
    let _guard = span.enter();

    match ingest_inner(raw, cfg) {
        Ok(message) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                tenant_id = %message.tenant_id,
                log_id = %message.log_id,
                source = %message.source,
                elapsed_micros,
                "ingest_success"
            );
            Ok(message)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(
                field = ?err.field(),
                error = %err,
                elapsed_micros,
                "ingest_failure"
            );
            Err(err)
        }
    }
}

fn ingest_inner(raw: RawRequest, cfg: &IngestConfig) -> Result<CanonicalMessage, IngestError> {
    let inbound = InboundRequest::classify(raw, cfg)?;
    let validated = validate(inbound.into_candidate(), cfg)?;
    Ok(finalize(validated))
}
