//! Ranking metrics over a best-first list of item ids.

use std::collections::HashSet;

pub fn precision_at(ranked: &[usize], relevant: &HashSet<usize>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    hits_at(ranked, relevant, k) as f64 / k as f64
}

pub fn recall_at(ranked: &[usize], relevant: &HashSet<usize>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hits_at(ranked, relevant, k) as f64 / relevant.len() as f64
}

fn hits_at(ranked: &[usize], relevant: &HashSet<usize>, k: usize) -> usize {
    ranked
        .iter()
        .take(k)
        .filter(|item| relevant.contains(*item))
        .count()
}

pub fn average_precision(ranked: &[usize], relevant: &HashSet<usize>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let mut relevant_found = 0;
    let mut precision_sum = 0.0;

    for (i, item) in ranked.iter().enumerate() {
        if relevant.contains(item) {
            relevant_found += 1;
            precision_sum += relevant_found as f64 / (i + 1) as f64;
        }
    }

    precision_sum / relevant.len() as f64
}

/// Binary-relevance NDCG over the whole list.
pub fn ndcg(ranked: &[usize], relevant: &HashSet<usize>) -> f64 {
    let dcg: f64 = ranked
        .iter()
        .enumerate()
        .filter(|(_, item)| relevant.contains(*item))
        .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
        .sum();

    let idcg: f64 = (0..relevant.len())
        .map(|i| 1.0 / ((i + 2) as f64).log2())
        .sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

pub fn reciprocal_rank(ranked: &[usize], relevant: &HashSet<usize>) -> f64 {
    ranked
        .iter()
        .position(|item| relevant.contains(item))
        .map_or(0.0, |pos| 1.0 / (pos + 1) as f64)
}

/// Area under the ROC curve of one ranking.
///
/// `num_dropped_items` counts candidates cut from the list (for example by a
/// top-N limit); they rank below every listed item.
pub fn auc(ranked: &[usize], relevant: &HashSet<usize>, num_dropped_items: usize) -> f64 {
    let num_relevant = ranked.iter().filter(|item| relevant.contains(*item)).count();
    let num_eval_items = ranked.len() + num_dropped_items;
    let num_eval_pairs = (num_eval_items - num_relevant) * num_relevant;

    if num_eval_pairs == 0 {
        return 0.5;
    }

    let mut num_correct_pairs = 0usize;
    let mut hit_count = 0usize;
    for item in ranked {
        if relevant.contains(item) {
            hit_count += 1;
        } else {
            num_correct_pairs += hit_count;
        }
    }
    // every dropped item ranks below every listed hit
    num_correct_pairs += hit_count * num_dropped_items;

    num_correct_pairs as f64 / num_eval_pairs as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[usize]) -> HashSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_precision_and_recall() {
        let ranked = vec![3, 1, 4, 5, 9];
        let relevant = set(&[1, 9, 7]);
        assert_eq!(precision_at(&ranked, &relevant, 1), 0.0);
        assert_eq!(precision_at(&ranked, &relevant, 5), 0.4);
        assert!((recall_at(&ranked, &relevant, 5) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_auc() {
        let relevant = set(&[1]);
        assert_eq!(auc(&[1, 2, 3], &relevant, 0), 1.0);
        assert_eq!(auc(&[2, 3, 1], &relevant, 0), 0.0);
        assert_eq!(auc(&[2, 1, 3], &relevant, 0), 0.5);
        // hit on top, two more candidates cut off
        assert_eq!(auc(&[1], &relevant, 2), 1.0);
        assert_eq!(auc(&[1, 2], &set(&[1, 2]), 0), 0.5);
    }

    #[test]
    fn test_map_ndcg_mrr() {
        let ranked = vec![5, 1, 7];
        let relevant = set(&[1, 7]);
        assert!((average_precision(&ranked, &relevant) - (0.5 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&ranked, &relevant), 0.5);
        assert_eq!(ndcg(&[1, 7, 5], &relevant), 1.0);
        assert!(ndcg(&ranked, &relevant) < 1.0);
        assert_eq!(ndcg(&ranked, &HashSet::new()), 0.0);
    }
}
