//! The durable record and its composite key.
use std::fmt;

use chrono::{DateTime, Utc};
use ingest::{CanonicalMessage, Source};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const PARTITION_PREFIX: &str = "TENANT#";
pub const SORT_PREFIX: &str = "LOG#";

/// Composite key of a stored record.
///
/// The partition component carries the tenant, so every lookup is scoped to
/// exactly one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    /// `TENANT#{tenant_id}`
    pub partition: String,
    /// `LOG#{log_id}`
    pub sort: String,
}

impl StorageKey {
    pub fn new(tenant_id: &str, log_id: &str) -> Self {
        Self {
            partition: format!("{PARTITION_PREFIX}{tenant_id}"),
            sort: format!("{SORT_PREFIX}{log_id}"),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.partition, self.sort)
    }
}

/// One processed log line. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLogRecord {
    pub tenant_id: String,
    pub log_id: String,
    pub source: Source,
    pub original_text: String,
    pub redacted_text: String,
    pub ingested_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    /// Length of `original_text` in characters.
    pub text_length: usize,
    pub processing_time_seconds: f64,
}

impl StoredLogRecord {
    /// Builds the record for a processed message, keeping the original text
    /// alongside its redacted form.
    pub fn from_message(
        message: CanonicalMessage,
        redacted_text: String,
        processed_at: DateTime<Utc>,
        processing_time_seconds: f64,
    ) -> Self {
        let text_length = message.text.chars().count();
        Self {
            tenant_id: message.tenant_id,
            log_id: message.log_id,
            source: message.source,
            original_text: message.text,
            redacted_text,
            ingested_at: message.ingested_at,
            processed_at,
            text_length,
            processing_time_seconds,
        }
    }

    pub fn key(&self) -> StorageKey {
        StorageKey::new(&self.tenant_id, &self.log_id)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(|e| StoreError::Encode(e.to_string()))
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}
