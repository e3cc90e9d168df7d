//! Extraction Stage: turns scraped page text into normalized `JobPosting` records.
//!
//! The LLM may answer with one object, a list of objects, or a list wrapped
//! under a `job_postings` key. All shapes resolve into `ExtractionResult` and
//! then into a plain `Vec<JobPosting>` at this boundary. Every element of a
//! list is kept.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::llm_client::{strip_json_fences, CompletionBackend, CompletionRequest};
use crate::pipeline::prompts::{EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM};

/// Extraction is always greedy.
pub const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Keys that mark a JSON object as a job posting.
const POSTING_KEYS: [&str; 4] = ["role", "experience", "skills", "description"];

/// Keys under which some models nest the posting list.
const WRAPPER_KEYS: [&str; 2] = ["job_postings", "jobs"];

/// A structured job record extracted from page text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience: String,
    #[serde(default, deserialize_with = "lenient_skills")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

/// The two shapes an extraction response can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Single(JobPosting),
    Many(Vec<JobPosting>),
}

impl ExtractionResult {
    /// Interprets a parsed JSON response. `Err` carries the reason it does not fit.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(ExtractionResult::Many(Vec::new())),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    posting_from_value(item).map_err(|e| format!("element {i}: {e}"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ExtractionResult::Many),
            Value::Object(mut map) => {
                if let Some(key) = WRAPPER_KEYS.iter().find(|k| map.contains_key(**k)) {
                    let inner = map.remove(*key).unwrap_or(Value::Null);
                    return match inner {
                        Value::Array(_) | Value::Null => Self::from_value(inner),
                        Value::Object(_) => posting_from_value(inner).map(ExtractionResult::Single),
                        other => Err(format!("'{key}' holds {}", json_kind(&other))),
                    };
                }
                if map.is_empty() {
                    return Ok(ExtractionResult::Many(Vec::new()));
                }
                posting_from_value(Value::Object(map)).map(ExtractionResult::Single)
            }
            other => Err(format!(
                "expected an object or an array, got {}",
                json_kind(&other)
            )),
        }
    }

    pub fn into_postings(self) -> Vec<JobPosting> {
        match self {
            ExtractionResult::Single(posting) => vec![posting],
            ExtractionResult::Many(postings) => postings,
        }
    }
}

fn posting_from_value(value: Value) -> Result<JobPosting, String> {
    let Value::Object(map) = &value else {
        return Err(format!("expected an object, got {}", json_kind(&value)));
    };
    if !POSTING_KEYS.iter().any(|k| map.contains_key(*k)) {
        return Err(format!(
            "object has none of the keys {}",
            POSTING_KEYS.join(", ")
        ));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Accepts strings, numbers and booleans (e.g. `"experience": 2`); null becomes "".
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Accepts an array, a comma-separated string, or null. Blank entries are dropped.
fn lenient_skills<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let skills = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(|s| s.trim().to_string()).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "skills must be an array or a string, got {}",
                json_kind(&other)
            )))
        }
    };
    Ok(skills.into_iter().filter(|s| !s.is_empty()).collect())
}

/// Parses an extraction response into postings.
/// Any deviation from the expected shape yields `MalformedExtraction` with the raw text.
pub fn parse_extraction(raw: &str) -> Result<Vec<JobPosting>, PipelineError> {
    let malformed = |reason: String| PipelineError::MalformedExtraction {
        reason,
        raw: raw.to_string(),
    };

    let value: Value =
        serde_json::from_str(strip_json_fences(raw)).map_err(|e| malformed(e.to_string()))?;

    ExtractionResult::from_value(value)
        .map(ExtractionResult::into_postings)
        .map_err(malformed)
}

/// Asks the LLM to extract job postings from `raw_text`.
///
/// Fails fast, without calling the backend, on blank input or input longer
/// than `max_input_chars`. Returns an empty vec when the page holds no postings.
pub async fn extract(
    raw_text: &str,
    llm: &dyn CompletionBackend,
    max_input_chars: usize,
) -> Result<Vec<JobPosting>, PipelineError> {
    if raw_text.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let len = raw_text.chars().count();
    if len > max_input_chars {
        return Err(PipelineError::InputTooLarge {
            len,
            limit: max_input_chars,
        });
    }

    let prompt = EXTRACTION_PROMPT_TEMPLATE.replace("{page_text}", raw_text);
    let response = llm
        .complete(CompletionRequest {
            system: EXTRACTION_SYSTEM,
            prompt: &prompt,
            temperature: EXTRACTION_TEMPERATURE,
        })
        .await?;

    let postings = parse_extraction(&response).inspect_err(|e| {
        warn!("Extraction response could not be parsed: {e}");
    })?;

    info!("Extracted {} job postings", postings.len());
    Ok(postings)
}
