use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm_client::LlmError;

/// A step of the extract → retrieve → compose pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Extract,
    Compose,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Compose => "compose",
        };
        f.write_str(name)
    }
}

/// Typed failure of a single pipeline stage.
///
/// Every transport-level failure is converted into one of these at the stage
/// boundary; nothing below a stage escapes unconverted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not fetch page: {0}")]
    FetchFailure(String),

    #[error("LLM backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Malformed extraction response: {reason}")]
    MalformedExtraction { reason: String, raw: String },

    #[error("No job postings found in page content")]
    EmptyExtraction,

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Input text is {len} characters, limit is {limit}")]
    InputTooLarge { len: usize, limit: usize },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::FetchFailure(_) => "FETCH_FAILURE",
            PipelineError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            PipelineError::MalformedExtraction { .. } => "MALFORMED_EXTRACTION",
            PipelineError::EmptyExtraction => "EMPTY_EXTRACTION",
            PipelineError::EmptyInput => "EMPTY_INPUT",
            PipelineError::InputTooLarge { .. } => "INPUT_TOO_LARGE",
        }
    }

    /// Raw backend payload, only carried by `MalformedExtraction`.
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            PipelineError::MalformedExtraction { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn at(self, stage: Stage) -> StageError {
        StageError {
            stage,
            source: self,
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(e: LlmError) -> Self {
        PipelineError::BackendUnavailable(e.to_string())
    }
}

/// A `PipelineError` tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageError {
    /// JSON shape shared by HTTP error bodies, per-job failures and SSE error events.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "code": self.source.code(),
            "stage": self.stage,
            "message": self.source.to_string(),
        });
        if let Some(raw) = self.source.raw_payload() {
            body["raw"] = Value::String(raw.to_string());
        }
        body
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] StageError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "code": "VALIDATION_ERROR", "message": msg }),
            ),
            AppError::Pipeline(e) => {
                tracing::warn!("Pipeline error: {e}");
                let status = match &e.source {
                    PipelineError::FetchFailure(_) => StatusCode::BAD_GATEWAY,
                    PipelineError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    PipelineError::MalformedExtraction { .. } => StatusCode::BAD_GATEWAY,
                    PipelineError::EmptyExtraction => StatusCode::UNPROCESSABLE_ENTITY,
                    PipelineError::EmptyInput => StatusCode::BAD_REQUEST,
                    PipelineError::InputTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                };
                (status, e.to_json())
            }
        };

        (status, Json(json!({ "error": error }))).into_response()
    }
}
