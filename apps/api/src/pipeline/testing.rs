//! Substitute collaborators for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::llm_client::{CompletionBackend, CompletionRequest, LlmError};
use crate::page::PageFetcher;
use crate::pipeline::prompts::EXTRACTION_SYSTEM;
use crate::portfolio::embedding::Embedder;
use crate::portfolio::InMemoryStore;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

type Responder = Box<dyn Fn(&CompletionRequest<'_>) -> Result<String, LlmError> + Send + Sync>;

/// A `CompletionBackend` that answers from a script and records every call.
pub struct ScriptedBackend {
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    /// Answers calls in order; calls past the end of the script fail.
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::with_responder(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        })
    }

    /// Answers each call by inspecting the request.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest<'_>) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn timeout() -> LlmError {
        LlmError::Api {
            status: 504,
            message: "upstream request timed out".to_string(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: request.system.to_string(),
            prompt: request.prompt.to_string(),
            temperature: request.temperature,
        });
        (self.responder)(&request)
    }
}

/// A `PageFetcher` serving one fixed page, or failing when there is none.
pub struct StaticFetcher {
    pub page: Option<String>,
}

impl StaticFetcher {
    pub fn page(text: &str) -> Self {
        Self {
            page: Some(text.to_string()),
        }
    }

    pub fn unreachable() -> Self {
        Self { page: None }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, PipelineError> {
        self.page
            .clone()
            .ok_or_else(|| PipelineError::FetchFailure(format!("HTTP error: 404 for {url}")))
    }
}

/// A backend that holds every call for `delay` and tracks how many calls
/// were in flight at once.
pub struct SlowBackend {
    extraction: String,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowBackend {
    pub fn new(extraction: &str, delay: Duration) -> Self {
        Self {
            extraction: extraction.to_string(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for SlowBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if request.system == EXTRACTION_SYSTEM {
            Ok(self.extraction.clone())
        } else {
            Ok("Dear Hiring Manager, we would love to help.".to_string())
        }
    }
}

/// Technology groups the test embedder treats as one meaning.
const CONCEPTS: &[&[&str]] = &[
    &["python"],
    &["django", "flask"],
    &["mysql", "sql"],
    &["postgres", "postgresql"],
    &["react", "reactjs"],
    &["node", "node.js", "nodejs", "express"],
    &["mongodb", "mongo"],
    &["machine", "learning", "ml", "tensorflow", "pytorch"],
    &["java", "spring", "boot"],
    &["devops", "jenkins", "docker", "kubernetes", "k8s"],
    &["oracle"],
];

/// Deterministic `Embedder`: one dimension per concept plus a constant
/// dimension, so related words land close without sharing text and
/// unrelated texts still have a small positive similarity.
#[derive(Debug, Default)]
pub struct ConceptEmbedder;

impl ConceptEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; CONCEPTS.len() + 1];
        vector[CONCEPTS.len()] = 0.1;

        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '.'))
            .map(|t| t.trim_matches('.'))
            .filter(|t| !t.is_empty());
        for token in tokens {
            if let Some(i) = CONCEPTS.iter().position(|aliases| aliases.contains(&token)) {
                vector[i] += 1.0;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        vector.iter_mut().for_each(|v| *v /= norm);
        vector
    }
}

impl Embedder for ConceptEmbedder {
    fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// An empty store backed by `ConceptEmbedder`.
pub fn concept_store() -> InMemoryStore {
    InMemoryStore::new(Arc::new(ConceptEmbedder))
}
