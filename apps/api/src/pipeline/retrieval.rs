//! Retrieval Step: finds the portfolio links that best match a job's skills.

use tracing::{debug, warn};

use crate::portfolio::{DocumentStore, ReferenceLink, ScoredLink};

pub const DEFAULT_TOP_K: usize = 2;

/// Returns at most `top_k` links for `skills`, best first.
///
/// Each skill is queried on its own; hits are merged by URL keeping the best
/// score. An empty skill list returns an empty vec for any store state.
/// A skill whose query fails is skipped with a warning.
pub async fn retrieve(
    store: &dyn DocumentStore,
    skills: &[String],
    top_k: usize,
) -> Vec<ReferenceLink> {
    if top_k == 0 {
        return Vec::new();
    }

    let mut merged: Vec<ScoredLink> = Vec::new();
    for skill in skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let hits = match store.query(skill, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Portfolio query for {:?} failed: {:#}", skill, e);
                continue;
            }
        };
        for hit in hits {
            match merged.iter_mut().find(|m| m.link.url == hit.link.url) {
                Some(existing) if hit.score > existing.score => existing.score = hit.score,
                Some(_) => {}
                None => merged.push(hit),
            }
        }
    }

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(top_k);

    debug!(
        "Retrieved {} links for {} skills",
        merged.len(),
        skills.len()
    );
    merged.into_iter().map(|hit| hit.link).collect()
}
