//! Composition Stage: writes the outreach email for one job and its portfolio links.
//!
//! The backend's text is returned as-is. The only check is that it is not blank.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::PipelineError;
use crate::llm_client::prompts::NO_PREAMBLE_SYSTEM;
use crate::llm_client::{CompletionBackend, CompletionRequest};
use crate::pipeline::extraction::JobPosting;
use crate::pipeline::prompts::{COMPOSITION_PROMPT_TEMPLATE, COMPOSITION_SYSTEM_TEMPLATE};
use crate::portfolio::ReferenceLink;

/// The finished email body, exactly as the backend produced it.
pub type EmailDraft = String;

/// Who the email is written as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub sender_name: String,
    pub sender_title: String,
    pub company_name: String,
    pub company_pitch: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            sender_name: "Mohan".to_string(),
            sender_title: "business development executive".to_string(),
            company_name: "AtliQ".to_string(),
            company_pitch: "AtliQ is an AI & Software Consulting company dedicated to \
                facilitating the seamless integration of business processes through automated tools. \
                Over our experience, we have empowered numerous enterprises with tailored solutions, \
                fostering scalability, process optimization, cost reduction, and heightened overall efficiency."
                .to_string(),
        }
    }
}

impl Persona {
    fn fill(&self, template: &str) -> String {
        template
            .replace("{sender_name}", &self.sender_name)
            .replace("{sender_title}", &self.sender_title)
            .replace("{company_name}", &self.company_name)
            .replace("{company_pitch}", &self.company_pitch)
    }
}

/// Builds the composition prompt. Job and link text go in last so that
/// placeholder-like text in a posting is never substituted.
pub fn build_composition_prompt(
    job: &JobPosting,
    links: &[ReferenceLink],
    persona: &Persona,
) -> String {
    let job_json = serde_json::to_string_pretty(job).unwrap_or_else(|_| format!("{job:?}"));

    let link_list = if links.is_empty() {
        "(no matching portfolio links)".to_string()
    } else {
        links
            .iter()
            .map(|l| format!("- {} ({})", l.url, l.skill_tag))
            .collect::<Vec<_>>()
            .join("\n")
    };

    persona
        .fill(COMPOSITION_PROMPT_TEMPLATE)
        .replace("{link_list}", &link_list)
        .replace("{job_json}", &job_json)
}

/// Asks the LLM for a cold email about `job`, showcasing `links`.
pub async fn compose(
    job: &JobPosting,
    links: &[ReferenceLink],
    persona: &Persona,
    llm: &dyn CompletionBackend,
    temperature: f32,
) -> Result<EmailDraft, PipelineError> {
    let prompt = build_composition_prompt(job, links, persona);
    let system = persona
        .fill(COMPOSITION_SYSTEM_TEMPLATE)
        .replace("{no_preamble}", NO_PREAMBLE_SYSTEM);

    let draft = llm
        .complete(CompletionRequest {
            system: &system,
            prompt: &prompt,
            temperature,
        })
        .await?;

    if draft.trim().is_empty() {
        return Err(PipelineError::BackendUnavailable(
            "LLM returned an empty email".to_string(),
        ));
    }

    info!("Composed email for role '{}' ({} chars)", job.role, draft.len());
    Ok(draft)
}
