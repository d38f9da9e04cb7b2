use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use logflow::{IngestionGateway, PipelineConfig};
use queue::{InMemoryQueue, Transport};
use store::{IdempotencyGuard, LogStore};
use worker::{BatchReport, Processor};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared application state
///
/// The gateway and the workers share one queue: the gateway sends into it
/// and the workers drain it into the store.
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Stage configuration the pipeline was built from
    pub pipeline: Arc<PipelineConfig>,

    pub gateway: IngestionGateway,

    pub queue: Arc<InMemoryQueue>,

    pub store: Arc<dyn LogStore>,

    pub processor: Arc<Processor>,

    /// Present once a Prometheus recorder has been installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state, reading the pipeline file named in `config`
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = config.load_pipeline()?;
        Self::with_pipeline(config, pipeline)
    }

    /// Create server state from an already loaded pipeline configuration
    pub fn with_pipeline(config: ServerConfig, pipeline: PipelineConfig) -> ServerResult<Self> {
        let queue = Arc::new(InMemoryQueue::new(pipeline.queue.policy()));
        let store = pipeline.store.build()?;

        let transport: Arc<dyn Transport> = queue.clone();
        let gateway = IngestionGateway::new(transport, pipeline.ingest.clone());
        let processor = Arc::new(Processor::new(
            IdempotencyGuard::new(Arc::clone(&store)),
            pipeline.worker.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            gateway,
            queue,
            store,
            processor,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Starts the worker loops configured for this pipeline.
    pub fn spawn_workers(&self, cancel: &CancellationToken) -> Vec<JoinHandle<BatchReport>> {
        let transport: Arc<dyn Transport> = self.queue.clone();
        worker::spawn_workers(
            transport,
            Arc::clone(&self.processor),
            &self.pipeline.worker,
            cancel,
        )
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("metrics_installed", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
