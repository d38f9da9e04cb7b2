//! Core data model types for the ingest crate.
//!
//! These types describe the two inbound request shapes and the single
//! canonical message every downstream stage consumes.
//!
//! # Type Hierarchy
//!
//! ```text
//! RawRequest
//! ├── metadata: RequestMetadata (case-insensitive header lookup)
//! └── body: Vec<u8>
//!
//!         ↓ InboundRequest::classify()   (content-type only)
//!
//! InboundRequest
//! ├── Json { fields: Map<String, Value> }
//! └── Text { tenant_id, log_id, text }
//!
//!         ↓ into_candidate()  →  validate()  →  finalize()
//!
//! CanonicalMessage
//! ├── tenant_id: String
//! ├── log_id: String (generated when absent)
//! ├── text: String (verbatim)
//! ├── source: Source
//! └── ingested_at: DateTime<Utc>
//! ```
//!
//! # Examples
//!
//! ```rust
//! use ingest::{RawRequest, RequestMetadata};
//!
//! let raw = RawRequest {
//!     metadata: RequestMetadata::from_pairs([
//!         ("Content-Type", "text/plain"),
//!         ("X-Tenant-Id", "acme_corp"),
//!     ]),
//!     body: b"disk almost full".to_vec(),
//! };
//! assert_eq!(raw.metadata.get("content-type"), Some("text/plain"));
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The wire format a message arrived in.
///
/// Recorded on the canonical message for provenance only; nothing past the
/// normalizer branches on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Structured `application/json` body.
    Json,
    /// Raw `text/plain` body with identifiers in metadata.
    Text,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Json => "json",
            Source::Text => "text",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request metadata (headers) with case-insensitive lookup.
///
/// Insertion order is preserved. When a name appears more than once the
/// first occurrence wins, matching how most HTTP stacks surface a single
/// header value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    entries: Vec<(String, String)>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds metadata from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Looks up a value, comparing names ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A request as it reaches the gateway, before format dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    /// Request metadata; must carry the content-type indicator.
    pub metadata: RequestMetadata,
    /// Raw body bytes, untouched.
    pub body: Vec<u8>,
}

impl RawRequest {
    /// Convenience constructor for a JSON request.
    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata: RequestMetadata::from_pairs([("content-type", "application/json")]),
            body: body.into(),
        }
    }

    /// Convenience constructor for a plain-text request carrying its
    /// identifiers in the given metadata entries.
    pub fn text<I, K, V>(metadata: I, body: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut md = RequestMetadata::from_pairs([("content-type", "text/plain")]);
        for (k, v) in metadata {
            md.insert(k, v);
        }
        Self {
            metadata: md,
            body: body.into(),
        }
    }

    /// The declared content-type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.metadata.get("content-type")
    }
}

/// The two supported ingress shapes, resolved once from the content-type.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRequest {
    /// Structured body; fields are extracted but not yet checked.
    Json {
        fields: serde_json::Map<String, serde_json::Value>,
    },
    /// Plain-text body with identifiers taken from metadata.
    Text {
        tenant_id: Option<String>,
        log_id: Option<String>,
        text: String,
    },
}

/// A field as extracted from a request, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    /// Not supplied, or JSON `null`.
    #[default]
    Absent,
    /// A string value, verbatim.
    Str(String),
    /// Some other JSON type; carries its type name for error messages.
    NonString(&'static str),
}

impl FieldValue {
    pub(crate) fn from_json(value: Option<serde_json::Value>) -> Self {
        use serde_json::Value;
        match value {
            None | Some(Value::Null) => FieldValue::Absent,
            Some(Value::String(s)) => FieldValue::Str(s),
            Some(Value::Bool(_)) => FieldValue::NonString("boolean"),
            Some(Value::Number(_)) => FieldValue::NonString("number"),
            Some(Value::Array(_)) => FieldValue::NonString("array"),
            Some(Value::Object(_)) => FieldValue::NonString("object"),
        }
    }

    pub(crate) fn from_option(value: Option<String>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Str)
    }
}

/// Fields extracted by the normalizer and handed to the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFields {
    pub tenant_id: FieldValue,
    pub log_id: FieldValue,
    pub text: FieldValue,
    pub source: Source,
}

/// Fields that passed validation. `log_id` is still optional here; it is
/// generated at the merge point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFields {
    pub tenant_id: String,
    pub log_id: Option<String>,
    pub text: String,
    pub source: Source,
}

/// The unified internal record, produced once per accepted request.
///
/// Immutable once built. It travels through the queue as a JSON payload and
/// may be delivered to the worker more than once.
///
/// ```rust
/// use ingest::{CanonicalMessage, Source};
///
/// let json = r#"{
///     "tenant_id": "acme_corp",
///     "log_id": "log-1",
///     "text": "boot ok",
///     "source": "text",
///     "ingested_at": "2024-01-15T10:30:00Z"
/// }"#;
/// let msg: CanonicalMessage = serde_json::from_str(json).unwrap();
/// assert_eq!(msg.source, Source::Text);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalMessage {
    /// Tenant namespace; matches `^[A-Za-z0-9_-]+$`.
    pub tenant_id: String,
    /// Caller-supplied or generated identifier, unique within the tenant.
    pub log_id: String,
    /// The log body exactly as received.
    pub text: String,
    /// Ingress format.
    pub source: Source,
    /// UTC instant the message was normalized.
    pub ingested_at: DateTime<Utc>,
}
