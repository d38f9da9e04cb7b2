//! Error types produced by the ingest crate.
//!
//! All errors are typed, cloneable, and comparable so the gateway can map
//! them to responses precisely and tests can assert on exact variants.
//!
//! # Error Categories
//!
//! | Error | Description | Suggested status |
//! |-------|-------------|------------------|
//! | [`UnsupportedFormat`](IngestError::UnsupportedFormat) | Content-type is neither JSON nor plain text | 415 |
//! | [`MalformedBody`](IngestError::MalformedBody) | Body cannot be decoded for its declared format | 400 |
//! | [`Validation`](IngestError::Validation) | A field violates its constraint | 400 |
//!
//! # Examples
//!
//! ```rust
//! use ingest::{Field, IngestError, ValidationError, ValidationReason};
//!
//! fn describe(error: &IngestError) -> String {
//!     match error {
//!         IngestError::Validation(v) => format!("bad field {}", v.field),
//!         IngestError::UnsupportedFormat(ct) => format!("cannot ingest {ct}"),
//!         other => other.to_string(),
//!     }
//! }
//!
//! let err = IngestError::from(ValidationError::new(Field::TenantId, ValidationReason::Missing));
//! assert_eq!(describe(&err), "bad field tenant_id");
//! ```
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fields subject to validation, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The tenant namespace.
    TenantId,
    /// The log body.
    Text,
    /// The caller-supplied log identifier.
    LogId,
}

impl Field {
    /// Wire name of the field, as it appears in JSON bodies and error payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::TenantId => "tenant_id",
            Field::Text => "text",
            Field::LogId => "log_id",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The constraint a field violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationReason {
    /// The field is absent (or JSON `null`).
    #[error("missing")]
    Missing,

    /// The field is present but is not a string; carries the JSON type name
    /// for logs and `Debug` output.
    #[error("not a string")]
    NotAString(&'static str),

    /// The field is an empty string.
    #[error("must not be empty")]
    Empty,

    /// The field contains characters outside `[A-Za-z0-9_-]`.
    #[error("must match ^[A-Za-z0-9_-]+$")]
    InvalidCharacters,

    /// The field exceeds its configured length.
    #[error("exceeds {max} characters")]
    TooLong {
        /// Configured limit.
        max: usize,
        /// Observed length in characters.
        actual: usize,
    },
}

/// A single field that failed validation.
///
/// Validation stops at the first violation, so there is never more than one
/// of these per request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    /// The offending field.
    pub field: Field,
    /// The violated constraint.
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: Field, reason: ValidationReason) -> Self {
        Self { field, reason }
    }
}

/// Errors that can occur while turning a raw request into a canonical message.
///
/// Every variant is a client-side problem: nothing is enqueued when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The content-type indicator is missing or names neither format.
    ///
    /// Carries the content-type as received (empty when absent).
    #[error("unsupported content-type: {0:?}")]
    UnsupportedFormat(String),

    /// The body could not be decoded for its declared format.
    ///
    /// Covers invalid JSON, a JSON document that is not an object, and
    /// plain-text bodies that are not valid UTF-8.
    #[error("malformed body: {0}")]
    MalformedBody(String),

    /// A field violated its constraint.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl IngestError {
    /// Returns the offending field when this is a validation failure.
    pub fn field(&self) -> Option<Field> {
        match self {
            IngestError::Validation(v) => Some(v.field),
            _ => None,
        }
    }

    /// Returns a suggested HTTP status code for this error.
    ///
    /// ```rust
    /// use ingest::IngestError;
    ///
    /// assert_eq!(IngestError::UnsupportedFormat("text/csv".into()).http_status_code(), 415);
    /// assert_eq!(IngestError::MalformedBody("eof".into()).http_status_code(), 400);
    /// ```
    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::UnsupportedFormat(_) => 415,
            IngestError::MalformedBody(_) | IngestError::Validation(_) => 400,
        }
    }
}
