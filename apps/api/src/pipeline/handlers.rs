//! Axum route handlers for the outreach pipeline.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::pipeline::extraction::JobPosting;
use crate::pipeline::retrieval::retrieve;
use crate::pipeline::runner::{extract_jobs, run, run_streaming, PipelineEvent, PipelineReport};
use crate::portfolio::ReferenceLink;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub jobs: Vec<JobPosting>,
}

#[derive(Debug, Deserialize)]
pub struct LinksQuery {
    /// Comma-separated skills.
    #[serde(default)]
    pub skills: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub links: Vec<ReferenceLink>,
}

fn validate_url(url: &str) -> Result<String, AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("url cannot be empty".to_string()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::Validation(
            "url must start with http:// or https://".to_string(),
        ));
    }
    Ok(url.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/emails
///
/// Runs the whole pipeline and returns every job's outcome in one response.
pub async fn handle_generate_emails(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<PipelineReport>, AppError> {
    let url = validate_url(&request.url)?;
    let report = run(&state.pipeline, &url).await?;
    Ok(Json(report))
}

/// POST /api/v1/emails/stream
///
/// Same pipeline as `/emails`, streamed as Server-Sent Events:
/// `extracted`, then one `job` per finished job, then `done` (or a single `error`).
pub async fn handle_stream_emails(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let url = validate_url(&request.url)?;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run_streaming(Arc::clone(&state.pipeline), url, tx));

    let stream = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse_event(event)), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: PipelineEvent) -> Event {
    let (name, data) = match event {
        PipelineEvent::Extracted { request_id, jobs } => (
            "extracted",
            json!({ "request_id": request_id, "count": jobs.len(), "jobs": jobs }),
        ),
        PipelineEvent::Job(report) => (
            "job",
            serde_json::to_value(&report).unwrap_or_else(|e| json!({ "error": e.to_string() })),
        ),
        PipelineEvent::Failed(e) => ("error", json!({ "error": e.to_json() })),
        PipelineEvent::Done { succeeded, failed } => (
            "done",
            json!({ "succeeded": succeeded, "failed": failed }),
        ),
    };
    Event::default().event(name).data(data.to_string())
}

/// POST /api/v1/extract
///
/// Runs only the extraction stage on caller-supplied text.
/// Useful for previewing what the pipeline will compose emails for.
/// Text without postings is `EMPTY_EXTRACTION`, as in a full run.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let jobs = extract_jobs(&state.pipeline, &request.text).await?;

    Ok(Json(ExtractResponse { jobs }))
}

/// GET /api/v1/portfolio/links?skills=Python,SQL&k=2
pub async fn handle_portfolio_links(
    State(state): State<AppState>,
    Query(query): Query<LinksQuery>,
) -> Result<Json<LinksResponse>, AppError> {
    let skills: Vec<String> = query
        .skills
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let k = query.k.unwrap_or(state.pipeline.settings.top_k);

    let links = retrieve(state.pipeline.store.as_ref(), &skills, k).await;
    Ok(Json(LinksResponse { links }))
}
