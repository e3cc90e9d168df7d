// Outreach pipeline: fetch → extract → (per job) retrieve → compose.
// All LLM calls go through the CompletionBackend seam; no stage builds its own client.

pub mod composition;
pub mod extraction;
pub mod handlers;
pub mod prompts;
pub mod retrieval;
pub mod runner;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::{CompletionBackend, LimitedBackend};
use crate::page::PageFetcher;
use crate::pipeline::composition::Persona;
use crate::portfolio::DocumentStore;

/// Tunables shared by every pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub max_input_chars: usize,
    pub max_concurrent_jobs: usize,
    pub composition_temperature: f32,
    pub persona: Persona,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: retrieval::DEFAULT_TOP_K,
            max_input_chars: 10_000,
            max_concurrent_jobs: 2,
            composition_temperature: 0.0,
            persona: Persona::default(),
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            top_k: config.retrieval_top_k,
            max_input_chars: config.max_input_chars,
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            composition_temperature: config.composition_temperature,
            persona: config.persona.clone(),
        }
    }
}

/// Everything a pipeline run needs, built once at startup and shared.
pub struct PipelineContext {
    /// Every call through here shares one limit of `max_concurrent_jobs`
    /// in-flight requests across the whole process.
    pub llm: Arc<dyn CompletionBackend>,
    pub store: Arc<dyn DocumentStore>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub settings: PipelineSettings,
}

impl PipelineContext {
    pub fn new(
        llm: Arc<dyn CompletionBackend>,
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn PageFetcher>,
        settings: PipelineSettings,
    ) -> Self {
        let llm: Arc<dyn CompletionBackend> =
            Arc::new(LimitedBackend::new(llm, settings.max_concurrent_jobs));
        Self {
            llm,
            store,
            fetcher,
            settings,
        }
    }
}
