//! YAML pipeline configuration.
//!
//! One file configures every stage. All sections are optional and fall back
//! to their defaults.
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! ingest:
//!   max_text_chars: 17000
//!   tenant_header: "x-tenant-id"
//!   log_id_header: "x-log-id"
//!
//! queue:
//!   visibility_timeout_secs: 900
//!   max_receive_count: 3
//!
//! store:
//!   backend: "redb"
//!   path: "/var/lib/logflow/logs.redb"
//!
//! worker:
//!   cost_per_char_ms: 50
//!   simulate_delay: true
//!   batch_size: 10
//!   poll_interval_ms: 250
//!   concurrency: 2
//! ```
use std::fs;
use std::path::Path;
use std::time::Duration;

use ingest::IngestConfig;
use queue::QueueConfig;
use serde::{Deserialize, Serialize};
use store::StoreConfig;
use thiserror::Error;
use worker::WorkerConfig;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
            queue: QueueConfig::default(),
            store: StoreConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.ingest
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ingest: {e}")))?;
        self.queue
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("queue: {e}")))?;
        self.worker
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("worker: {e}")))?;

        if let StoreConfig::Redb { path } = &self.store
            && path.trim().is_empty()
        {
            return Err(ConfigLoadError::Validation(
                "store: redb path must not be empty".into(),
            ));
        }

        // A delivery must stay invisible for at least as long as the worker
        // can spend on the largest accepted message.
        let worst_case = Duration::from_millis(
            (self.ingest.max_text_chars as u64).saturating_mul(self.worker.cost_per_char_ms),
        );
        if self.worker.simulate_delay && worst_case >= self.queue.policy().visibility_timeout {
            return Err(ConfigLoadError::Validation(format!(
                "queue: visibility_timeout_secs ({}) must exceed the worst-case processing time ({}s)",
                self.queue.visibility_timeout_secs,
                worst_case.as_secs()
            )));
        }

        Ok(())
    }
}
