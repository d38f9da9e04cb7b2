//! logflow server - HTTP front door and worker host
//!
//! Runs the ingestion gateway behind axum and the queue workers in the same
//! process:
//!
//! - **Ingest**: `POST /v1/logs` validates, normalizes and queues a log,
//!   answering 202 before any processing happens
//! - **Workers**: `concurrency` polling loops drain the queue, redact, and
//!   commit each log once
//! - **Health**: liveness, readiness with queue depth, and Prometheus metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check, reports queue depth
//! - `GET /metrics` - Prometheus metrics
//! - `POST /v1/logs` - Submit a log (`application/json` or `text/plain`)
//!
//! Server settings come from `server.{yaml,toml,json}` and
//! `LOGFLOW_SERVER__*` environment variables; stage settings come from the
//! pipeline YAML named by `pipeline_config`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
