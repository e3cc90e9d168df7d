//! Portfolio Document Store: a small similarity-searchable index of
//! (tech-stack tag, portfolio link) pairs.
//!
//! `DocumentStore` is the seam; `InMemoryStore` is the default backend.
//! The store is written once at startup and read concurrently afterwards.

pub mod embedding;
pub mod loader;

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::portfolio::embedding::{cosine_similarity, Embedder};
use crate::portfolio::loader::PortfolioRecord;

/// A portfolio link returned to callers. No ranking score is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub skill_tag: String,
    pub url: String,
}

/// A query hit with its similarity score. Internal to retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLink {
    pub link: ReferenceLink,
    pub score: f32,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Number of entries currently held.
    async fn count(&self) -> usize;

    /// Inserts `records` unless the store is already populated.
    /// Returns how many entries were inserted (0 when the load was skipped).
    async fn load(&self, records: &[PortfolioRecord]) -> anyhow::Result<usize>;

    /// Returns the `k` nearest entries to `text`, best first. Fewer only when
    /// the store holds fewer than `k` entries.
    async fn query(&self, text: &str, k: usize) -> anyhow::Result<Vec<ScoredLink>>;
}

#[derive(Debug)]
struct StoredEntry {
    // Storage address only; never leaves the store.
    #[allow(dead_code)]
    id: Uuid,
    skill_tag: String,
    url: String,
    embedding: Vec<f32>,
}

pub struct InMemoryStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Runs the embedder on the blocking pool; model inference is CPU-bound.
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.embed(&texts)
        })
        .await
        .context("Embedding task did not complete")??;

        if vectors.len() != expected {
            bail!(
                "Embedder returned {} vectors for {} texts",
                vectors.len(),
                expected
            );
        }
        Ok(vectors)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn load(&self, records: &[PortfolioRecord]) -> anyhow::Result<usize> {
        // Count probe and insert share one write lock, so concurrent loaders
        // cannot both observe an empty store.
        let mut entries = self.entries.write().await;
        if !entries.is_empty() {
            info!(
                "Portfolio store already holds {} entries, skipping load",
                entries.len()
            );
            return Ok(0);
        }

        let texts = records.iter().map(|r| r.tech_stack.clone()).collect();
        let vectors = self
            .embed(texts)
            .await
            .context("Failed to embed portfolio records")?;

        entries.extend(
            records
                .iter()
                .zip(vectors)
                .map(|(record, embedding)| StoredEntry {
                    id: Uuid::new_v4(),
                    skill_tag: record.tech_stack.clone(),
                    url: record.link.clone(),
                    embedding,
                }),
        );

        info!("Loaded {} entries into portfolio store", entries.len());
        Ok(entries.len())
    }

    async fn query(&self, text: &str, k: usize) -> anyhow::Result<Vec<ScoredLink>> {
        if k == 0 || self.count().await == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed(vec![text.to_string()])
            .await?
            .pop()
            .unwrap_or_default();
        let entries = self.entries.read().await;

        let mut hits: Vec<ScoredLink> = entries
            .iter()
            .map(|entry| ScoredLink {
                link: ReferenceLink {
                    skill_tag: entry.skill_tag.clone(),
                    url: entry.url.clone(),
                },
                score: cosine_similarity(&query_vector, &entry.embedding),
            })
            .collect();

        // Stable sort: equal scores keep load order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        debug!("Portfolio query {:?} returned {} entries", text, hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::concept_store;

    fn records() -> Vec<PortfolioRecord> {
        vec![
            PortfolioRecord::new("React, Node.js, MongoDB", "https://example.com/react"),
            PortfolioRecord::new("Python, Django, MySQL", "https://example.com/python"),
            PortfolioRecord::new("Machine Learning, Python, TensorFlow", "https://example.com/ml"),
            PortfolioRecord::new("Java, Spring Boot, Oracle", "https://example.com/java"),
        ]
    }

    #[tokio::test]
    async fn test_load_populates_store() {
        let store = concept_store();
        let inserted = store.load(&records()).await.unwrap();
        assert_eq!(inserted, 4);
        assert_eq!(store.count().await, 4);
    }

    #[tokio::test]
    async fn test_second_load_is_noop() {
        let store = concept_store();
        store.load(&records()).await.unwrap();
        let inserted = store.load(&records()).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(store.count().await, 4);
    }

    #[tokio::test]
    async fn test_concurrent_loads_insert_once() {
        let store = Arc::new(concept_store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.load(&records()).await.unwrap() })
            })
            .collect();

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 4);
        assert_eq!(store.count().await, 4);
    }

    #[tokio::test]
    async fn test_entries_get_distinct_ids() {
        let store = concept_store();
        store.load(&records()).await.unwrap();
        let entries = store.entries.read().await;
        let mut ids: Vec<_> = entries.iter().map(|e| e.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), entries.len());
    }

    #[tokio::test]
    async fn test_query_ranks_best_match_first() {
        let store = concept_store();
        store.load(&records()).await.unwrap();

        let hits = store.query("TensorFlow", 2).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].link.url, "https://example.com/ml");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_query_respects_k() {
        let store = concept_store();
        store.load(&records()).await.unwrap();

        assert_eq!(store.query("Python", 1).await.unwrap().len(), 1);
        assert!(store.query("Python", 0).await.unwrap().is_empty());
        assert_eq!(store.query("Python", 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_query_without_shared_words_still_returns_k_nearest() {
        let store = concept_store();
        store.load(&records()).await.unwrap();

        let hits = store.query("PyTorch", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].link.url, "https://example.com/ml");

        let unrelated = store.query("Flutter", 3).await.unwrap();
        assert_eq!(unrelated.len(), 3);
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("model not loaded")
        }
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_load() {
        let store = InMemoryStore::new(Arc::new(FailingEmbedder));
        let err = store.load(&records()).await.unwrap_err();
        assert!(format!("{err:#}").contains("model not loaded"));
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_query_empty_store_returns_nothing() {
        let store = concept_store();
        assert!(store.query("Python", 2).await.unwrap().is_empty());
    }
}
