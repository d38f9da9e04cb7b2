//! The ingestion gateway: normalize, validate, enqueue, acknowledge.
use std::sync::Arc;
use std::time::Instant;

use ingest::{IngestConfig, IngestError, RawRequest};
use metrics::counter;
use queue::{MessageId, OutboundMessage, QueueError, Transport};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

/// Message attribute carrying the tenant on every enqueued message.
pub const TENANT_ATTRIBUTE: &str = "tenant_id";

/// Returned when a request has been handed to the transport.
///
/// Acceptance says nothing about processing; the worker picks the message
/// up later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    pub tenant_id: String,
    pub log_id: String,
    #[serde(skip)]
    pub message_id: MessageId,
}

impl Acceptance {
    /// The `202` response body.
    pub fn body(&self) -> Value {
        json!({
            "message": "Accepted",
            "tenant_id": self.tenant_id,
            "log_id": self.log_id,
        })
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request was rejected before anything was enqueued.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The transport refused the message. The caller must resubmit.
    #[error("failed to enqueue message: {0}")]
    TransportSend(#[source] QueueError),

    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl GatewayError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            GatewayError::Ingest(err) => err.http_status_code(),
            GatewayError::TransportSend(_) => 503,
            GatewayError::Encode(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Ingest(IngestError::UnsupportedFormat(_)) => "UNSUPPORTED_FORMAT",
            GatewayError::Ingest(IngestError::MalformedBody(_)) => "INVALID_BODY",
            GatewayError::Ingest(IngestError::Validation(_)) => "VALIDATION_ERROR",
            GatewayError::Ingest(_) => "BAD_REQUEST",
            GatewayError::TransportSend(_) => "QUEUE_UNAVAILABLE",
            GatewayError::Encode(_) => "INTERNAL_ERROR",
        }
    }

    /// Structured detail for validation failures: the field and the reason.
    pub fn details(&self) -> Option<Value> {
        match self {
            GatewayError::Ingest(IngestError::Validation(v)) => Some(json!({
                "field": v.field.as_str(),
                "reason": v.reason.to_string(),
            })),
            _ => None,
        }
    }

    /// `{"error":{"code","message","details"?}}`
    pub fn body(&self) -> Value {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        if let (Some(details), Some(obj)) = (self.details(), error.as_object_mut()) {
            obj.insert("details".into(), details);
        }
        json!({ "error": error })
    }

    fn outcome(&self) -> &'static str {
        match self {
            GatewayError::Ingest(IngestError::UnsupportedFormat(_)) => "unsupported_format",
            GatewayError::Ingest(IngestError::MalformedBody(_)) => "invalid_body",
            GatewayError::Ingest(_) => "invalid",
            GatewayError::TransportSend(_) => "queue_unavailable",
            GatewayError::Encode(_) => "error",
        }
    }
}

/// A status code and JSON body, independent of any HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

/// Front door of the pipeline.
///
/// Holds an explicitly injected transport; nothing here is process-global.
/// Exactly one message is enqueued per accepted request, and the response
/// goes back without waiting for any processing.
#[derive(Clone)]
pub struct IngestionGateway {
    transport: Arc<dyn Transport>,
    config: IngestConfig,
}

impl IngestionGateway {
    pub fn new(transport: Arc<dyn Transport>, config: IngestConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Normalizes and validates `raw`, then enqueues the canonical message.
    pub async fn handle(&self, raw: RawRequest) -> Result<Acceptance, GatewayError> {
        let start = Instant::now();
        let result = self.handle_inner(raw).await;
        let elapsed_micros = start.elapsed().as_micros() as u64;

        match &result {
            Ok(acceptance) => {
                counter!("logflow_ingest_requests_total", "outcome" => "accepted").increment(1);
                info!(
                    tenant_id = %acceptance.tenant_id,
                    log_id = %acceptance.log_id,
                    message_id = %acceptance.message_id,
                    elapsed_micros,
                    "request_accepted"
                );
            }
            Err(err) => {
                counter!("logflow_ingest_requests_total", "outcome" => err.outcome()).increment(1);
                warn!(
                    code = err.error_code(),
                    error = %err,
                    elapsed_micros,
                    "request_rejected"
                );
            }
        }
        result
    }

    /// Like [`handle`](Self::handle), rendered as a status and body.
    pub async fn respond(&self, raw: RawRequest) -> GatewayResponse {
        match self.handle(raw).await {
            Ok(acceptance) => GatewayResponse {
                status: 202,
                body: acceptance.body(),
            },
            Err(err) => GatewayResponse {
                status: err.http_status_code(),
                body: err.body(),
            },
        }
    }

    async fn handle_inner(&self, raw: RawRequest) -> Result<Acceptance, GatewayError> {
        let message = ingest::ingest(raw, &self.config)?;
        let body =
            serde_json::to_string(&message).map_err(|e| GatewayError::Encode(e.to_string()))?;
        let outbound =
            OutboundMessage::new(body).with_attribute(TENANT_ATTRIBUTE, message.tenant_id.as_str());

        let message_id = self
            .transport
            .send(outbound)
            .await
            .map_err(GatewayError::TransportSend)?;

        Ok(Acceptance {
            tenant_id: message.tenant_id,
            log_id: message.log_id,
            message_id,
        })
    }
}

impl std::fmt::Debug for IngestionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
