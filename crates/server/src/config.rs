use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use logflow::{ConfigLoadError, PipelineConfig};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Path to the pipeline YAML; stage defaults apply when unset
    #[serde(default)]
    pub pipeline_config: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            pipeline_config: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.*` file, and
    /// `LOGFLOW_SERVER__*` environment variables, later sources winning.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is normal outside development.
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("LOGFLOW_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// Reads and validates the pipeline configuration this server runs.
    pub fn load_pipeline(&self) -> Result<PipelineConfig, ConfigLoadError> {
        let pipeline = match &self.pipeline_config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        pipeline.validate()?;
        Ok(pipeline)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size(), 1024 * 1024);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert!(cfg.pipeline_config.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);

        let bad = ServerConfig {
            bind_addr: "not an address".into(),
            ..Default::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn pipeline_defaults_when_no_file_given() {
        let pipeline = ServerConfig::default().load_pipeline().unwrap();
        assert_eq!(pipeline, PipelineConfig::default());
    }

    #[test]
    fn pipeline_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "version: \"1.0\"\nname: \"edge\"\nworker:\n  concurrency: 4\n  simulate_delay: false"
        )
        .unwrap();

        let cfg = ServerConfig {
            pipeline_config: Some(file.path().display().to_string()),
            ..Default::default()
        };
        let pipeline = cfg.load_pipeline().unwrap();
        assert_eq!(pipeline.name.as_deref(), Some("edge"));
        assert_eq!(pipeline.worker.concurrency, 4);
    }

    #[test]
    fn invalid_pipeline_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "version: \"9\"").unwrap();

        let cfg = ServerConfig {
            pipeline_config: Some(file.path().display().to_string()),
            ..Default::default()
        };
        assert!(matches!(
            cfg.load_pipeline(),
            Err(ConfigLoadError::UnsupportedVersion(_))
        ));
    }
}
