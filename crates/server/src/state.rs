use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use metrics_exporter_prometheus::PrometheusHandle;
use sharkid::{Recognizer, SharkIdConfig};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Detection, catalog and classification engine (shared across requests)
    pub recognizer: Arc<Recognizer>,

    /// Prometheus render handle, present when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Load the pipeline configuration and open the catalog.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let mut pipeline = SharkIdConfig::load(config.pipeline_config.as_deref())
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if let Some(workers) = config.frame_workers {
            pipeline.workers.frame_workers = workers;
        }
        tracing::info!(
            name = pipeline.name.as_deref().unwrap_or("sharkid"),
            embedder = ?pipeline.embedder.kind,
            threshold = pipeline.matcher.threshold,
            "pipeline configuration loaded"
        );
        let recognizer = Recognizer::from_config(&pipeline)?;
        Ok(Self::with_recognizer(config, Arc::new(recognizer)))
    }

    /// Wrap an already built recognizer.
    pub fn with_recognizer(config: ServerConfig, recognizer: Arc<Recognizer>) -> Self {
        Self {
            config: Arc::new(config),
            recognizer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
