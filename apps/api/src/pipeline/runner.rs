//! Pipeline runner: drives one URL through every stage.
//!
//! Flow: fetch page → clean + truncate → extract → per job: retrieve → compose.
//!
//! The run is linear and never retries. A failure before the per-job fan-out
//! ends the run; a failure inside one job is recorded on that job's report
//! while its siblings carry on. Jobs run concurrently, bounded by
//! `max_concurrent_jobs`, and reports are emitted as each job finishes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{PipelineError, Stage, StageError};
use crate::page::{clean_text, truncate_chars};
use crate::pipeline::composition::{compose, EmailDraft};
use crate::pipeline::extraction::{extract, JobPosting};
use crate::pipeline::retrieval::retrieve;
use crate::pipeline::PipelineContext;
use crate::portfolio::ReferenceLink;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Why a single job did not get an email.
#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    pub stage: Stage,
    pub code: &'static str,
    pub message: String,
}

impl From<StageError> for JobFailure {
    fn from(e: StageError) -> Self {
        Self {
            stage: e.stage,
            code: e.source.code(),
            message: e.source.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResult {
    Email(EmailDraft),
    Error(JobFailure),
}

/// Outcome for one extracted job. `index` is the job's position in the extraction.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub index: usize,
    pub job: JobPosting,
    pub links: Vec<ReferenceLink>,
    #[serde(flatten)]
    pub result: JobResult,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, JobResult::Email(_))
    }
}

/// Buffered result of a full run, jobs in extraction order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub request_id: Uuid,
    pub url: String,
    pub generated_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub jobs: Vec<JobReport>,
}

impl PipelineReport {
    fn new(request_id: Uuid, url: &str, mut jobs: Vec<JobReport>) -> Self {
        jobs.sort_by_key(|r| r.index);
        let succeeded = jobs.iter().filter(|r| r.is_success()).count();
        Self {
            request_id,
            url: url.to_string(),
            generated_at: Utc::now(),
            succeeded,
            failed: jobs.len() - succeeded,
            jobs,
        }
    }
}

/// Progress of a streamed run.
#[derive(Debug)]
pub enum PipelineEvent {
    Extracted {
        request_id: Uuid,
        jobs: Vec<JobPosting>,
    },
    Job(JobReport),
    Failed(StageError),
    Done {
        succeeded: usize,
        failed: usize,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

/// Fetches the page and returns cleaned text cut to the extraction input limit.
pub async fn fetch_page(ctx: &PipelineContext, url: &str) -> Result<String, StageError> {
    let page = ctx
        .fetcher
        .fetch_text(url)
        .await
        .map_err(|e| e.at(Stage::Fetch))?;

    let cleaned = clean_text(&page);
    if cleaned.is_empty() {
        return Err(
            PipelineError::FetchFailure("Page yielded no text content".to_string())
                .at(Stage::Fetch),
        );
    }

    let limit = ctx.settings.max_input_chars;
    let len = cleaned.chars().count();
    if len > limit {
        warn!(
            "Page text is {} chars, truncating to {} before extraction",
            len, limit
        );
        return Ok(truncate_chars(&cleaned, limit).to_string());
    }
    Ok(cleaned)
}

/// Runs extraction. Zero postings is reported as `EmptyExtraction`.
pub async fn extract_jobs(
    ctx: &PipelineContext,
    text: &str,
) -> Result<Vec<JobPosting>, StageError> {
    let jobs = extract(text, ctx.llm.as_ref(), ctx.settings.max_input_chars)
        .await
        .map_err(|e| e.at(Stage::Extract))?;

    if jobs.is_empty() {
        return Err(PipelineError::EmptyExtraction.at(Stage::Extract));
    }
    Ok(jobs)
}

/// Retrieves links for one job and composes its email. Never fails as a whole:
/// a composition failure is recorded on the report.
pub async fn process_job(ctx: &PipelineContext, index: usize, job: JobPosting) -> JobReport {
    let links = retrieve(ctx.store.as_ref(), &job.skills, ctx.settings.top_k).await;

    let composed = compose(
        &job,
        &links,
        &ctx.settings.persona,
        ctx.llm.as_ref(),
        ctx.settings.composition_temperature,
    )
    .await;

    let result = match composed {
        Ok(email) => JobResult::Email(email),
        Err(e) => {
            warn!("Job {} ('{}') failed to compose: {}", index, job.role, e);
            JobResult::Error(e.at(Stage::Compose).into())
        }
    };

    JobReport {
        index,
        job,
        links,
        result,
    }
}

/// Processes `jobs` concurrently and yields each report as soon as it is ready.
pub fn job_reports(
    ctx: &PipelineContext,
    jobs: Vec<JobPosting>,
) -> impl Stream<Item = JobReport> + '_ {
    let limit = ctx.settings.max_concurrent_jobs.max(1);
    stream::iter(jobs.into_iter().enumerate())
        .map(move |(index, job)| process_job(ctx, index, job))
        .buffer_unordered(limit)
}

// ────────────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────────────

/// Runs the whole pipeline for `url` and returns every job's outcome at once.
pub async fn run(ctx: &PipelineContext, url: &str) -> Result<PipelineReport, StageError> {
    let request_id = Uuid::new_v4();
    info!("Pipeline {} started for {}", request_id, url);

    let text = fetch_page(ctx, url).await?;
    let jobs = extract_jobs(ctx, &text).await?;
    info!("Pipeline {}: {} jobs extracted", request_id, jobs.len());

    let reports: Vec<JobReport> = job_reports(ctx, jobs).collect().await;
    let report = PipelineReport::new(request_id, url, reports);

    info!(
        "Pipeline {} finished: {} succeeded, {} failed",
        request_id, report.succeeded, report.failed
    );
    Ok(report)
}

/// Runs the pipeline for `url`, sending events on `tx` as stages complete.
/// Stops early if the receiver goes away.
pub async fn run_streaming(ctx: Arc<PipelineContext>, url: String, tx: mpsc::Sender<PipelineEvent>) {
    let request_id = Uuid::new_v4();
    info!("Streaming pipeline {} started for {}", request_id, url);

    let jobs = match fetch_page(&ctx, &url).await {
        Ok(text) => extract_jobs(&ctx, &text).await,
        Err(e) => Err(e),
    };
    let jobs = match jobs {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!("Streaming pipeline {} failed: {}", request_id, e);
            let _ = tx.send(PipelineEvent::Failed(e)).await;
            return;
        }
    };

    if tx
        .send(PipelineEvent::Extracted {
            request_id,
            jobs: jobs.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    let reports = job_reports(&ctx, jobs);
    futures::pin_mut!(reports);

    let (mut succeeded, mut failed) = (0, 0);
    while let Some(report) = reports.next().await {
        if report.is_success() {
            succeeded += 1;
        } else {
            failed += 1;
        }
        if tx.send(PipelineEvent::Job(report)).await.is_err() {
            info!("Streaming pipeline {}: client went away", request_id);
            return;
        }
    }

    info!(
        "Streaming pipeline {} finished: {} succeeded, {} failed",
        request_id, succeeded, failed
    );
    let _ = tx.send(PipelineEvent::Done { succeeded, failed }).await;
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
