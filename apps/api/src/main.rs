mod config;
mod errors;
mod llm_client;
mod page;
mod pipeline;
mod portfolio;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{CompletionBackend, LlmClient};
use crate::page::{PageFetcher, WebPageFetcher};
use crate::pipeline::{PipelineContext, PipelineSettings};
use crate::portfolio::embedding::{Embedder, SentenceEmbedder};
use crate::portfolio::loader::load_portfolio_csv;
use crate::portfolio::{DocumentStore, InMemoryStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coldmail API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.groq_api_key.clone(),
        config.llm_api_url.clone(),
        config.llm_model.clone(),
        config.llm_timeout_secs,
    )
    .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    // Load the embedding model (local directory first, else the hub cache)
    let embedder: Arc<dyn Embedder> = match &config.embedding_model_dir {
        Some(dir) => Arc::new(
            SentenceEmbedder::from_dir(dir)
                .with_context(|| format!("Failed to load embedding model from {dir}"))?,
        ),
        None => Arc::new(SentenceEmbedder::from_hub(&config.embedding_model).await?),
    };

    // Load the portfolio store once; later loads against a populated store are no-ops
    let records = load_portfolio_csv(&config.portfolio_csv)?;
    let store = InMemoryStore::new(embedder);
    store.load(&records).await?;
    info!("Portfolio store ready with {} entries", store.count().await);

    let fetcher = WebPageFetcher::new().context("Failed to build page fetcher")?;

    let llm: Arc<dyn CompletionBackend> = Arc::new(llm);
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(fetcher);
    let settings = PipelineSettings::from(&config);
    info!(
        "Pipeline settings: top_k={}, max_input_chars={}, max_concurrent_jobs={}",
        settings.top_k, settings.max_input_chars, settings.max_concurrent_jobs
    );

    // Build app state
    let state = AppState {
        pipeline: Arc::new(PipelineContext::new(llm, store, fetcher, settings)),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
