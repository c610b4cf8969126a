use serde::{Deserialize, Serialize};

/// Parameters of the link-rank fixed-point iteration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Floor every page receives per iteration; inbound links add `(1 - damping)` of their score.
    pub damping: f64,
    pub max_iter: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self { damping: 0.85, max_iter: 100 }
    }
}

/// Knobs of the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cap applied to each score column and to the final result list.
    pub max_results: usize,
    /// Only this many whitespace-separated query tokens are considered.
    pub max_query_tokens: usize,
    pub title_weight: f64,
    pub body_weight: f64,
    /// Cosine similarities are scaled to, and every normalization targets, `[0, score_scale]`.
    pub score_scale: f64,
    /// Share of the reference document's body weights added onto the query vector.
    pub reference_weight: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 50,
            max_query_tokens: 10_000,
            title_weight: 0.3,
            body_weight: 0.7,
            score_scale: 50.0,
            reference_weight: 0.5,
        }
    }
}
