//! Link-based page authority by damped fixed-point iteration.
//!
//! The adjacency is raw 0/1 (a parent with many children passes its full
//! score to each), so scores are relative multipliers rather than a
//! probability distribution.

use crate::config::RankConfig;
use crate::identity::PageId;
use crate::persist::Store;
use crate::Result;
use std::collections::{BTreeSet, HashMap};

const RTOL: f64 = 1e-5;
const ATOL: f64 = 1e-8;

/// Scores every page in `pages`. Edges naming unknown pages are ignored and
/// repeated edges count once.
pub fn link_rank(pages: &[PageId], edges: &[(PageId, PageId)], config: &RankConfig) -> HashMap<PageId, f64> {
    let position: HashMap<PageId, usize> = pages.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    // inbound[child] = parents linking to it
    let mut inbound: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); pages.len()];
    for (parent, child) in edges {
        if let (Some(&p), Some(&c)) = (position.get(parent), position.get(child)) {
            inbound[c].insert(p);
        }
    }

    let mut scores = vec![1.0f64; pages.len()];
    for iteration in 0..config.max_iter {
        let next: Vec<f64> = inbound
            .iter()
            .map(|parents| {
                let mass: f64 = parents.iter().map(|&p| scores[p]).sum();
                config.damping + (1.0 - config.damping) * mass
            })
            .collect();
        if all_close(&scores, &next) {
            tracing::debug!(iteration, "link rank converged");
            break;
        }
        scores = next;
    }

    pages.iter().copied().zip(scores).collect()
}

fn all_close(current: &[f64], next: &[f64]) -> bool {
    current.iter().zip(next).all(|(a, b)| (a - b).abs() <= ATOL + RTOL * b.abs())
}

/// Recomputes ranks for every stored page and overwrites the stored scores.
pub fn rank_pages(store: &mut Store, config: &RankConfig) -> Result<HashMap<PageId, f64>> {
    let pages = store.page_ids()?;
    let edges = store.edges()?;
    let ranks = link_rank(&pages, &edges, config);
    store.replace_page_ranks(&ranks)?;
    tracing::info!(pages = pages.len(), edges = edges.len(), damping = config.damping, "page ranks stored");
    Ok(ranks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn pages_without_inbound_links_get_the_floor() {
        let ranks = link_rank(&[1, 2, 3], &[], &RankConfig::default());
        assert!(ranks.values().all(|&s| close(s, 0.85)));
    }

    #[test]
    fn linked_child_gains_parent_share() {
        let ranks = link_rank(&[1, 2], &[(1, 2), (1, 2)], &RankConfig::default());
        assert!(close(ranks[&1], 0.85));
        assert!(close(ranks[&2], 0.85 + 0.15 * 0.85));
    }

    #[test]
    fn iteration_cap_is_respected() {
        let config = RankConfig { max_iter: 1, ..RankConfig::default() };
        let ranks = link_rank(&[1, 2], &[(1, 2)], &config);
        assert!(close(ranks[&1], 0.85));
        assert!(close(ranks[&2], 1.0));

        let untouched = link_rank(&[1, 2], &[(1, 2)], &RankConfig { max_iter: 0, ..RankConfig::default() });
        assert!(untouched.values().all(|&s| close(s, 1.0)));
    }

    #[test]
    fn cycles_stay_non_negative_and_ignore_unknown_pages() {
        let edges = [(1, 2), (2, 3), (3, 1), (3, 99)];
        let ranks = link_rank(&[1, 2, 3], &edges, &RankConfig::default());
        assert_eq!(ranks.len(), 3);
        assert!(ranks.values().all(|&s| s >= 0.85));
        assert!(ranks.values().all(|&s| close(s, 1.0)));
    }

    #[test]
    fn empty_graph() {
        assert!(link_rank(&[], &[], &RankConfig::default()).is_empty());
    }
}
