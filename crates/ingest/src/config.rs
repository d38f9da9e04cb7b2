//! Configuration types for the ingest stage.
//!
//! This module defines [`IngestConfig`], which controls field limits and the
//! metadata names consulted for plain-text requests. The type is cheap to
//! clone and deserializes from external configuration formats such as YAML
//! or TOML.
//!
//! # Quick Start
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("default config is valid");
//! assert_eq!(config.max_text_chars, 17_000);
//! ```
//!
//! # Tightened Limits
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig {
//!     max_text_chars: 4_096,
//!     tenant_header: "x-customer".into(),
//!     ..Default::default()
//! };
//!
//! if let Err(e) = config.validate() {
//!     eprintln!("Configuration error: {e}");
//!     std::process::exit(1);
//! }
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only ingest configuration schema version understood by this crate.
pub const INGEST_CONFIG_VERSION: u32 = 1;

/// Runtime configuration for ingest behavior.
///
/// All length limits are measured in Unicode scalar values, not bytes, so a
/// log line written in a multi-byte script gets the same budget as ASCII.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Version of the ingest configuration schema. Must equal
    /// [`INGEST_CONFIG_VERSION`].
    ///
    /// Default: `1`
    pub version: u32,

    /// Upper bound on `tenant_id` length.
    ///
    /// Tenant identifiers end up inside storage partition keys, so they are
    /// kept short and restricted to `[A-Za-z0-9_-]`.
    ///
    /// Default: `100`
    pub max_tenant_id_chars: usize,

    /// Upper bound on a caller-supplied `log_id`.
    ///
    /// Generated identifiers are 36-character UUIDs and always fit.
    ///
    /// Default: `100`
    pub max_log_id_chars: usize,

    /// Upper bound on the `text` field.
    ///
    /// A text of exactly this many characters is accepted.
    ///
    /// Default: `17000`
    pub max_text_chars: usize,

    /// Metadata entry carrying the tenant for `text/plain` requests.
    ///
    /// Compared case-insensitively.
    ///
    /// Default: `"x-tenant-id"`
    pub tenant_header: String,

    /// Metadata entry carrying the optional log identifier for `text/plain`
    /// requests.
    ///
    /// Default: `"x-log-id"`
    pub log_id_header: String,
}

/// Errors that can occur when validating an [`IngestConfig`].
///
/// These are start-up issues and should be surfaced before the gateway
/// accepts traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The schema version is not one this crate understands.
    #[error("unsupported ingest config version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the configuration.
        found: u32,
        /// Version this crate supports.
        expected: u32,
    },

    /// A length limit was configured as zero, which would reject every request.
    #[error("{field} must be greater than zero")]
    ZeroLimit {
        /// Name of the offending setting.
        field: &'static str,
    },

    /// A metadata name used for plain-text requests is blank.
    #[error("{field} must not be empty")]
    EmptyHeaderName {
        /// Name of the offending setting.
        field: &'static str,
    },
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: INGEST_CONFIG_VERSION,
            max_tenant_id_chars: 100,
            max_log_id_chars: 100,
            max_text_chars: 17_000,
            tenant_header: "x-tenant-id".into(),
            log_id_header: "x-log-id".into(),
        }
    }
}

impl IngestConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// Performs only in-memory checks and is meant to be called once at
    /// process start-up.
    ///
    /// ```rust
    /// use ingest::{ConfigError, IngestConfig};
    ///
    /// let bad = IngestConfig { max_text_chars: 0, ..Default::default() };
    /// assert_eq!(
    ///     bad.validate(),
    ///     Err(ConfigError::ZeroLimit { field: "max_text_chars" })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != INGEST_CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: INGEST_CONFIG_VERSION,
            });
        }

        let limits = [
            ("max_tenant_id_chars", self.max_tenant_id_chars),
            ("max_log_id_chars", self.max_log_id_chars),
            ("max_text_chars", self.max_text_chars),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }

        let headers = [
            ("tenant_header", &self.tenant_header),
            ("log_id_header", &self.log_id_header),
        ];
        for (field, value) in headers {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyHeaderName { field });
            }
        }

        Ok(())
    }
}
