//! Format dispatch and field extraction.
//!
//! This is the single merge point where the two ingress shapes become one
//! schema. Dispatch looks only at the content-type indicator; the body is
//! never sniffed.
//!
//! # Flow
//!
//! ```text
//! RawRequest ──classify──▶ InboundRequest ──into_candidate──▶ CandidateFields
//!                                                                   │
//!                                                   validate (validate.rs)
//!                                                                   ▼
//!                         CanonicalMessage ◀──finalize── ValidatedFields
//! ```
//!
//! The normalizer extracts but does not judge: a JSON body missing `text`
//! still classifies successfully and is rejected later by the validator.
use chrono::Utc;
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{
    CandidateFields, CanonicalMessage, FieldValue, InboundRequest, RawRequest, Source,
    ValidatedFields,
};

/// Resolves the content-type of a request to the format it selects.
///
/// Parameters such as `charset` are ignored, as is ASCII case.
/// `application/*+json` is treated as JSON.
///
/// ```rust
/// use ingest::{format_for_content_type, Source};
///
/// assert_eq!(format_for_content_type("Application/JSON; charset=utf-8"), Some(Source::Json));
/// assert_eq!(format_for_content_type("application/vnd.logs+json"), Some(Source::Json));
/// assert_eq!(format_for_content_type("text/plain"), Some(Source::Text));
/// assert_eq!(format_for_content_type("text/csv"), None);
/// ```
pub fn format_for_content_type(content_type: &str) -> Option<Source> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
    {
        Some(Source::Json)
    } else if essence == "text/plain" {
        Some(Source::Text)
    } else {
        None
    }
}

impl InboundRequest {
    /// Selects the request shape from the content-type and decodes the body
    /// accordingly.
    ///
    /// # Errors
    ///
    /// - [`IngestError::UnsupportedFormat`] when the content-type is absent or
    ///   names neither format
    /// - [`IngestError::MalformedBody`] when a JSON body does not parse into
    ///   an object, or a text body is not UTF-8
    pub fn classify(raw: RawRequest, cfg: &IngestConfig) -> Result<Self, IngestError> {
        let content_type = raw.content_type().unwrap_or_default();
        let Some(format) = format_for_content_type(content_type) else {
            return Err(IngestError::UnsupportedFormat(content_type.to_string()));
        };

        match format {
            Source::Json => {
                let value: serde_json::Value = serde_json::from_slice(&raw.body)
                    .map_err(|err| IngestError::MalformedBody(format!("invalid JSON: {err}")))?;
                match value {
                    serde_json::Value::Object(fields) => Ok(InboundRequest::Json { fields }),
                    _ => Err(IngestError::MalformedBody(
                        "JSON body must be an object".into(),
                    )),
                }
            }
            Source::Text => {
                let tenant_id = raw.metadata.get(&cfg.tenant_header).map(str::to_string);
                let log_id = raw.metadata.get(&cfg.log_id_header).map(str::to_string);
                let text = String::from_utf8(raw.body).map_err(|err| {
                    IngestError::MalformedBody(format!("text body is not UTF-8: {err}"))
                })?;
                Ok(InboundRequest::Text {
                    tenant_id,
                    log_id,
                    text,
                })
            }
        }
    }

    /// The format this request arrived in.
    pub fn source(&self) -> Source {
        match self {
            InboundRequest::Json { .. } => Source::Json,
            InboundRequest::Text { .. } => Source::Text,
        }
    }

    /// Pulls `tenant_id`, `log_id` and `text` out of whichever shape this is.
    pub fn into_candidate(self) -> CandidateFields {
        match self {
            InboundRequest::Json { mut fields } => CandidateFields {
                tenant_id: FieldValue::from_json(fields.remove("tenant_id")),
                log_id: FieldValue::from_json(fields.remove("log_id")),
                text: FieldValue::from_json(fields.remove("text")),
                source: Source::Json,
            },
            InboundRequest::Text {
                tenant_id,
                log_id,
                text,
            } => CandidateFields {
                tenant_id: FieldValue::from_option(tenant_id),
                log_id: FieldValue::from_option(log_id),
                text: FieldValue::Str(text),
                source: Source::Text,
            },
        }
    }
}

/// Builds the canonical message from validated fields.
///
/// This is where a missing `log_id` is generated (UUID v4) and where
/// `ingested_at` is stamped, exactly once per accepted request.
pub fn finalize(fields: ValidatedFields) -> CanonicalMessage {
    let ValidatedFields {
        tenant_id,
        log_id,
        text,
        source,
    } = fields;

    CanonicalMessage {
        tenant_id,
        log_id: log_id.unwrap_or_else(generate_log_id),
        text,
        source,
        ingested_at: Utc::now(),
    }
}

/// Generates a fresh log identifier.
pub fn generate_log_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestMetadata;

    fn cfg() -> IngestConfig {
        IngestConfig::default()
    }

    #[test]
    fn json_request_extracts_fields() {
        let raw = RawRequest::json(r#"{"tenant_id":"acme","log_id":"l-1","text":"hi","extra":1}"#);
        let inbound = InboundRequest::classify(raw, &cfg()).expect("classify");
        assert_eq!(inbound.source(), Source::Json);

        let candidate = inbound.into_candidate();
        assert_eq!(candidate.tenant_id, FieldValue::Str("acme".into()));
        assert_eq!(candidate.log_id, FieldValue::Str("l-1".into()));
        assert_eq!(candidate.text, FieldValue::Str("hi".into()));
    }

    #[test]
    fn json_missing_fields_are_deferred_to_validation() {
        let raw = RawRequest::json(r#"{"tenant_id":"acme"}"#);
        let candidate = InboundRequest::classify(raw, &cfg())
            .expect("classify")
            .into_candidate();
        assert_eq!(candidate.text, FieldValue::Absent);
        assert_eq!(candidate.log_id, FieldValue::Absent);
    }

    #[test]
    fn text_request_reads_headers_case_insensitively() {
        let raw = RawRequest {
            metadata: RequestMetadata::from_pairs([
                ("content-TYPE", "text/plain"),
                ("x-TENANT-id", "test-tenant"),
                ("X-Log-ID", "abc"),
            ]),
            body: b"{\"looks\":\"like json\"}".to_vec(),
        };
        let inbound = InboundRequest::classify(raw, &cfg()).expect("classify");
        match inbound {
            InboundRequest::Text {
                tenant_id,
                log_id,
                text,
            } => {
                assert_eq!(tenant_id.as_deref(), Some("test-tenant"));
                assert_eq!(log_id.as_deref(), Some("abc"));
                // Body is verbatim; no sniffing even when it resembles JSON.
                assert_eq!(text, "{\"looks\":\"like json\"}");
            }
            other => panic!("expected text request, got {other:?}"),
        }
    }

    #[test]
    fn custom_tenant_header_is_honored() {
        let config = IngestConfig {
            tenant_header: "x-customer".into(),
            ..Default::default()
        };
        let raw = RawRequest::text([("X-Customer", "c1")], "body");
        let candidate = InboundRequest::classify(raw, &config)
            .expect("classify")
            .into_candidate();
        assert_eq!(candidate.tenant_id, FieldValue::Str("c1".into()));
    }

    #[test]
    fn unsupported_and_missing_content_types() {
        let raw = RawRequest {
            metadata: RequestMetadata::from_pairs([("content-type", "text/csv")]),
            body: b"a,b".to_vec(),
        };
        assert_eq!(
            InboundRequest::classify(raw, &cfg()),
            Err(IngestError::UnsupportedFormat("text/csv".into()))
        );

        let raw = RawRequest {
            metadata: RequestMetadata::new(),
            body: b"x".to_vec(),
        };
        assert_eq!(
            InboundRequest::classify(raw, &cfg()),
            Err(IngestError::UnsupportedFormat(String::new()))
        );
    }

    #[test]
    fn malformed_json_rejected() {
        let raw = RawRequest::json("{not json");
        assert!(matches!(
            InboundRequest::classify(raw, &cfg()),
            Err(IngestError::MalformedBody(msg)) if msg.contains("invalid JSON")
        ));

        let raw = RawRequest::json("[1,2,3]");
        assert!(matches!(
            InboundRequest::classify(raw, &cfg()),
            Err(IngestError::MalformedBody(msg)) if msg.contains("object")
        ));
    }

    #[test]
    fn non_utf8_text_body_rejected() {
        let raw = RawRequest::text([("x-tenant-id", "t")], vec![0xff, 0xfe]);
        assert!(matches!(
            InboundRequest::classify(raw, &cfg()),
            Err(IngestError::MalformedBody(_))
        ));
    }

    #[test]
    fn finalize_generates_log_id_only_when_absent() {
        let given = finalize(ValidatedFields {
            tenant_id: "t".into(),
            log_id: Some("mine".into()),
            text: "x".into(),
            source: Source::Text,
        });
        assert_eq!(given.log_id, "mine");

        let generated = finalize(ValidatedFields {
            tenant_id: "t".into(),
            log_id: None,
            text: "x".into(),
            source: Source::Text,
        });
        assert_eq!(generated.log_id.len(), 36);
        assert!(Uuid::parse_str(&generated.log_id).is_ok());
    }
}
