//! Shared math utilities for classifier post-processing.

use std::cmp::Ordering;

/// Convert raw logits to probabilities.
///
/// Subtracts the max logit first for numerical stability.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exp.iter().sum();
    if sum <= f32::EPSILON {
        return vec![0.0; logits.len()];
    }
    exp.into_iter().map(|x| x / sum).collect()
}

/// Indices and scores of the `k` highest values, highest first.
///
/// Ties keep their original index order. NaN scores sort last.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
    });
    indexed.truncate(k);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let p = softmax(&[1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert!((p[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_empty() {
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_top_k_orders_descending() {
        let top = top_k(&[0.1, 0.7, 0.05, 0.15], 3);
        assert_eq!(top, vec![(1, 0.7), (3, 0.15), (0, 0.1)]);
    }

    #[test]
    fn test_top_k_shorter_than_k() {
        let top = top_k(&[0.4, 0.6], 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, 1);
    }

    #[test]
    fn test_top_k_nan_sorts_last() {
        let top = top_k(&[f32::NAN, 0.2, 0.9], 3);
        assert_eq!(top[0].0, 2);
        assert_eq!(top[1].0, 1);
        assert_eq!(top[2].0, 0);
    }
}
