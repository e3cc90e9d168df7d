use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::PipelineContext;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// LLM backend, portfolio store and page fetcher, built once at startup.
    pub pipeline: Arc<PipelineContext>,
    pub config: Config,
}
