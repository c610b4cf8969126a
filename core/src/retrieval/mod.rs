//! Query-time ranking over an immutable [`Snapshot`].
//!
//! A query flows through: parse → query vector (optionally reinforced by a
//! reference page) → phrase and term filters → title/body cosine scores →
//! per-column normalization and top-N cut → weighted fusion → link-rank
//! multiplier → final normalization and top-N cut.

mod query;
mod scoring;
mod snapshot;

pub use query::{parse_query, query_vector, whole_token_pattern, ParsedQuery};
pub use scoring::{cosine_similarity, normalize_scores, top_scores};
pub use snapshot::{Document, Snapshot, TermVector};

use crate::config::SearchConfig;
use crate::identity::PageId;
use crate::persist::Store;
use crate::Result;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPage {
    pub page_id: PageId,
    pub score: f64,
}

/// Read-only search service. Queries borrow `&self`, so one engine can be
/// shared across threads without locking.
pub struct SearchEngine {
    snapshot: Snapshot,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(snapshot: Snapshot, config: SearchConfig) -> Self {
        Self { snapshot, config }
    }

    pub fn load(store: &Store, config: SearchConfig) -> Result<Self> {
        Ok(Self::new(Snapshot::load(store)?, config))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Ranked pages for `query`, best first, never more than `max_results`
    /// and never with a zero score.
    ///
    /// A `reference` page that is not in the snapshot yields no results.
    pub fn search(&self, query: &str, reference: Option<PageId>) -> Result<Vec<ScoredPage>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parsed = parse_query(&self.snapshot, query, self.config.max_query_tokens)?;
        let mut query_vec = query_vector(&parsed.terms);

        if let Some(reference) = reference {
            let Some(document) = self.snapshot.document(reference) else {
                tracing::debug!(reference, "reference page not in snapshot");
                return Ok(Vec::new());
            };
            for (keyword, weight) in query_vec.iter_mut() {
                *weight += document.body.get(keyword).copied().unwrap_or(0.0) * self.config.reference_weight;
            }
        }

        if parsed.terms.is_empty() {
            return Ok(Vec::new());
        }

        let scale = self.config.score_scale;
        let mut title_scores = Vec::new();
        let mut body_scores = Vec::new();
        for &page_id in self.snapshot.page_ids() {
            let Some(document) = self.snapshot.document(page_id) else { continue };
            if !phrases_match(document, &parsed.phrases) || !terms_match(document, &parsed) {
                continue;
            }
            title_scores.push((page_id, cosine_similarity(&query_vec, &document.title, scale)));
            body_scores.push((page_id, cosine_similarity(&query_vec, &document.body, scale)));
        }

        let limit = self.config.max_results;
        normalize_scores(&mut title_scores, scale);
        normalize_scores(&mut body_scores, scale);
        top_scores(&mut title_scores, limit);
        top_scores(&mut body_scores, limit);

        let mut combined = self.fuse(&title_scores, &body_scores);
        normalize_scores(&mut combined, scale);
        top_scores(&mut combined, limit);

        let results: Vec<ScoredPage> = combined
            .into_iter()
            .filter(|(_, score)| *score != 0.0)
            .map(|(page_id, score)| ScoredPage { page_id, score })
            .collect();
        tracing::debug!(query, terms = parsed.terms.len(), phrases = parsed.phrases.len(), hits = results.len(), "search finished");
        Ok(results)
    }

    /// Weighted sum over the union of both columns, multiplied by link rank.
    /// Pages without a stored rank score zero.
    fn fuse(&self, title: &[(PageId, f64)], body: &[(PageId, f64)]) -> Vec<(PageId, f64)> {
        let title_by_page: HashMap<PageId, f64> = title.iter().copied().collect();
        let body_by_page: HashMap<PageId, f64> = body.iter().copied().collect();

        let mut order: Vec<PageId> = title.iter().map(|(id, _)| *id).collect();
        order.extend(body.iter().map(|(id, _)| *id).filter(|id| !title_by_page.contains_key(id)));

        order
            .into_iter()
            .map(|page_id| {
                let text_score = self.config.title_weight * title_by_page.get(&page_id).copied().unwrap_or(0.0)
                    + self.config.body_weight * body_by_page.get(&page_id).copied().unwrap_or(0.0);
                (page_id, text_score * self.snapshot.rank(page_id).unwrap_or(0.0))
            })
            .collect()
    }
}

/// Every phrase must appear in the stemmed title or the stemmed body.
fn phrases_match(document: &Document, phrases: &[Regex]) -> bool {
    phrases
        .iter()
        .all(|p| p.is_match(&document.stemmed_title) || p.is_match(&document.stemmed_body))
}

/// At least one query keyword must carry weight in the title or body vector.
fn terms_match(document: &Document, parsed: &ParsedQuery) -> bool {
    parsed.terms.is_empty()
        || parsed
            .terms
            .iter()
            .any(|id| document.title.contains_key(id) || document.body.contains_key(id))
}
