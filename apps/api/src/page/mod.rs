pub mod clean;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::errors::PipelineError;

pub use clean::{clean_text, truncate_chars};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Turns a URL into the visible text of the page behind it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, PipelineError>;
}

pub struct WebPageFetcher {
    client: Client,
}

impl WebPageFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for WebPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, PipelineError> {
        let url = Url::parse(url)
            .map_err(|e| PipelineError::FetchFailure(format!("Invalid URL '{url}': {e}")))?;

        info!("Fetching job page: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PipelineError::FetchFailure(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::FetchFailure(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| PipelineError::FetchFailure(format!("Failed to read body: {e}")))?;

        let text = html_to_text(&html);
        if text.trim().is_empty() {
            warn!("Page {} has no visible text", url);
            return Err(PipelineError::FetchFailure(
                "Page yielded no text content".to_string(),
            ));
        }

        Ok(text)
    }
}

/// Collects the visible text of an HTML document, skipping script-like elements.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut chunks = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if !hidden && !text.trim().is_empty() {
            chunks.push(text.trim().to_string());
        }
    }
    chunks.join(" ")
}
