use std::str::FromStr;

use anyhow::{Context, Result};

use crate::pipeline::composition::Persona;
use crate::portfolio::embedding::DEFAULT_EMBEDDING_MODEL;

pub const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Application configuration loaded from environment variables.
/// Startup fails if `GROQ_API_KEY` is missing or a numeric variable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Extraction always runs at temperature 0; this only affects composition.
    pub composition_temperature: f32,
    pub portfolio_csv: String,
    /// Hugging Face Hub id of the sentence-transformer used for retrieval.
    pub embedding_model: String,
    /// Local model directory; when set, the hub is not contacted.
    pub embedding_model_dir: Option<String>,
    pub retrieval_top_k: usize,
    pub max_input_chars: usize,
    pub max_concurrent_jobs: usize,
    pub persona: Persona,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Persona::default();

        Ok(Config {
            groq_api_key: require_env("GROQ_API_KEY")?,
            llm_api_url: env_or("LLM_API_URL", DEFAULT_LLM_API_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 60)?,
            composition_temperature: parse_env("COMPOSITION_TEMPERATURE", 0.0)?,
            portfolio_csv: env_or("PORTFOLIO_CSV", "resources/my_portfolio.csv"),
            embedding_model: env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_model_dir: optional_env("EMBEDDING_MODEL_DIR"),
            retrieval_top_k: parse_env("RETRIEVAL_TOP_K", 2)?,
            max_input_chars: parse_env("MAX_INPUT_CHARS", 10_000)?,
            max_concurrent_jobs: parse_env("MAX_CONCURRENT_JOBS", 2)?,
            persona: Persona {
                sender_name: env_or("SENDER_NAME", &defaults.sender_name),
                sender_title: env_or("SENDER_TITLE", &defaults.sender_title),
                company_name: env_or("COMPANY_NAME", &defaults.company_name),
                company_pitch: env_or("COMPANY_PITCH", &defaults.company_pitch),
            },
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: usize = parse_env("COLDMAIL_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("COLDMAIL_TEST_BAD_NUMBER", "two");
        let result: Result<usize> = parse_env("COLDMAIL_TEST_BAD_NUMBER", 2);
        assert!(result.is_err());
        std::env::remove_var("COLDMAIL_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_optional_env_treats_blank_as_unset() {
        std::env::set_var("COLDMAIL_TEST_BLANK_DIR", "  ");
        assert_eq!(optional_env("COLDMAIL_TEST_BLANK_DIR"), None);
        std::env::remove_var("COLDMAIL_TEST_BLANK_DIR");
    }

    #[test]
    fn test_require_env_rejects_blank_values() {
        std::env::set_var("COLDMAIL_TEST_BLANK_KEY", "   ");
        assert!(require_env("COLDMAIL_TEST_BLANK_KEY").is_err());
        std::env::remove_var("COLDMAIL_TEST_BLANK_KEY");
    }
}
