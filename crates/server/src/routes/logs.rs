use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use ingest::{RawRequest, RequestMetadata};

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

/// `POST /v1/logs`
///
/// Accepts a JSON object or a `text/plain` body with identifiers in
/// headers. Responds 202 once the message is queued; processing happens
/// later on a worker.
pub async fn ingest_log(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ServerResult<impl IntoResponse> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(state.config.max_body_size_mb)
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    })?;

    let raw = RawRequest {
        metadata: metadata_from_headers(&headers),
        body: body.to_vec(),
    };
    let acceptance = state.gateway.handle(raw).await?;

    Ok((StatusCode::ACCEPTED, Json(acceptance.body())))
}

// Values are decoded lossily so a non-ASCII tenant reaches the validator
// and is rejected for its characters rather than reported as missing.
fn metadata_from_headers(headers: &HeaderMap) -> RequestMetadata {
    let mut metadata = RequestMetadata::new();
    for (name, value) in headers {
        metadata.insert(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    metadata
}
