use std::sync::Arc;

use shortgen_core::catalog::ModelCatalog;
use shortgen_core::provider::ProviderAdapter;
use shortgen_core::types::JobKind;
use shortgen_pipeline::{JobPoller, Pipeline};

use crate::config::ServerConfig;
use crate::registry::JobRegistry;
use crate::sink::OutputSink;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Provider every job is submitted to.
    pub adapter: Arc<dyn ProviderAdapter>,
    pub catalog: Arc<ModelCatalog>,
    /// Background jobs started through `POST /api/v1/jobs`.
    pub jobs: Arc<JobRegistry>,
    /// Present when `OUTPUT_DIR` is configured.
    pub sink: Option<Arc<OutputSink>>,
}

impl AppState {
    /// A poller using the configured defaults for `kind`.
    pub fn poller(&self, kind: JobKind) -> JobPoller {
        JobPoller::new(Arc::clone(&self.adapter), self.config.poll.for_kind(kind))
    }

    /// A pipeline using the configured per-kind poll defaults.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(&self.adapter))
            .with_default(JobKind::ImageGeneration, self.config.poll.image)
            .with_default(JobKind::VideoGeneration, self.config.poll.video)
    }
}
