use super::snapshot::TermVector;
use crate::identity::PageId;
use std::cmp::Ordering;

/// Cosine similarity of two sparse vectors, scaled by `scale`.
///
/// Zero when the vectors share no keyword. A zero-magnitude vector is used
/// unnormalized instead of dividing by zero.
pub fn cosine_similarity(a: &TermVector, b: &TermVector, scale: f64) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut shared = false;
    let mut dot = 0.0;
    for (keyword, x) in small {
        if let Some(y) = large.get(keyword) {
            shared = true;
            dot += x * y;
        }
    }
    if !shared {
        return 0.0;
    }
    dot / (magnitude(a) * magnitude(b)) * scale
}

fn magnitude(v: &TermVector) -> f64 {
    let m = v.values().map(|w| w * w).sum::<f64>().sqrt();
    if m == 0.0 {
        1.0
    } else {
        m
    }
}

/// Rescales scores so the largest becomes `ceiling`. Left untouched when the maximum is exactly zero.
pub fn normalize_scores(scores: &mut [(PageId, f64)], ceiling: f64) {
    let Some(max) = scores.iter().map(|(_, s)| *s).reduce(f64::max) else {
        return;
    };
    if max == 0.0 {
        return;
    }
    for (_, score) in scores.iter_mut() {
        *score = *score / max * ceiling;
    }
}

/// Stable descending sort truncated to `limit`; equal scores keep their input order.
pub fn top_scores(scores: &mut Vec<(PageId, f64)>, limit: usize) {
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scores.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(u32, f64)]) -> TermVector {
        entries.iter().copied().collect()
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let a = vector(&[(1, 1.0), (2, 2.0)]);
        let b = vector(&[(2, 0.5), (3, 4.0)]);
        let ab = cosine_similarity(&a, &b, 50.0);
        assert!((ab - cosine_similarity(&b, &a, 50.0)).abs() < 1e-12);
        assert!(ab > 0.0 && ab <= 50.0);
    }

    #[test]
    fn self_similarity_is_maximal() {
        let q = vector(&[(1, 1.0), (2, 1.0)]);
        let own = cosine_similarity(&q, &q, 50.0);
        assert!((own - 50.0).abs() < 1e-9);
        for other in [vector(&[(1, 1.0)]), vector(&[(1, 3.0), (2, 1.0)]), vector(&[(2, 1.0), (9, 1.0)])] {
            assert!(cosine_similarity(&q, &other, 50.0) <= own + 1e-9);
        }
    }

    #[test]
    fn disjoint_and_zero_vectors_are_defined() {
        let q = vector(&[(1, 1.0)]);
        assert_eq!(cosine_similarity(&q, &vector(&[(2, 1.0)]), 50.0), 0.0);
        assert_eq!(cosine_similarity(&q, &TermVector::new(), 50.0), 0.0);
        assert_eq!(cosine_similarity(&q, &vector(&[(1, 0.0)]), 50.0), 0.0);
    }

    #[test]
    fn normalization_targets_ceiling_and_guards_zero() {
        let mut scores = vec![(1, 2.0), (2, 4.0)];
        normalize_scores(&mut scores, 50.0);
        assert_eq!(scores, vec![(1, 25.0), (2, 50.0)]);

        let mut zeros = vec![(1, 0.0), (2, 0.0)];
        normalize_scores(&mut zeros, 50.0);
        assert_eq!(zeros, vec![(1, 0.0), (2, 0.0)]);
    }

    #[test]
    fn top_scores_is_stable() {
        let mut scores = vec![(1, 1.0), (2, 3.0), (3, 1.0), (4, 2.0)];
        top_scores(&mut scores, 3);
        assert_eq!(scores, vec![(2, 3.0), (4, 2.0), (1, 1.0)]);
    }
}
