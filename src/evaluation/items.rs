use super::{EvaluationContext, FoldEvaluator};
use crate::algorithms::ItemRecommender;
use crate::config::EvaluationConfig;
use crate::error::{RecError, Result};
use crate::models::{CandidateItems, EvaluationResults, PosOnlyFeedback};
use crate::utils::metrics;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Items ranked for every evaluated user, as a list and as a lookup set.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<usize>,
    lookup: HashSet<usize>,
}

impl CandidateSet {
    pub fn new(items: BTreeSet<usize>) -> Self {
        Self {
            lookup: items.iter().copied().collect(),
            items: items.into_iter().collect(),
        }
    }

    /// Candidates for `context.mode`; explicit mode requires a non-empty list.
    pub fn from_context(
        train: &PosOnlyFeedback,
        test: &PosOnlyFeedback,
        context: &EvaluationContext<'_>,
    ) -> Result<Self> {
        if context.mode == CandidateItems::Explicit && context.candidate_items.is_empty() {
            return Err(RecError::invalid(
                "candidate_items",
                "[]",
                "explicit mode needs a candidate item list",
            ));
        }

        let train_items: BTreeSet<usize> = train.all_items().into_iter().collect();
        let test_items: BTreeSet<usize> = test.all_items().into_iter().collect();

        let items = match context.mode {
            CandidateItems::Training => train_items,
            CandidateItems::Test => test_items,
            CandidateItems::Overlap => train_items.intersection(&test_items).copied().collect(),
            CandidateItems::Union => train_items.union(&test_items).copied().collect(),
            CandidateItems::Explicit => context.candidate_items.iter().copied().collect(),
        };
        Ok(Self::new(items))
    }

    pub fn items(&self) -> &[usize] {
        &self.items
    }

    pub fn contains(&self, item_id: usize) -> bool {
        self.lookup.contains(&item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ranking-quality evaluation of item recommendations.
#[derive(Debug, Clone, Default)]
pub struct ItemsEvaluator {
    /// Keep items the user already has in training among the candidates.
    pub repeated_items: bool,
    /// Length of the ranked list per user; `None` ranks every candidate.
    pub predict_items_number: Option<usize>,
}

impl ItemsEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            repeated_items: config.repeated_items,
            predict_items_number: config.predict_items_number,
        }
    }

    /// Metrics for one user, or `None` if the user cannot be evaluated: no
    /// relevant candidate, or no irrelevant one left to rank against.
    ///
    /// Relevant items are the user's test items among the candidates, even
    /// those excluded from ranking as training items.
    pub fn evaluate_user<M: ItemRecommender>(
        &self,
        model: &M,
        user_id: usize,
        test_items: &HashSet<usize>,
        train_items: &HashSet<usize>,
        candidates: &CandidateSet,
    ) -> Option<EvaluationResults> {
        let empty = HashSet::new();
        let ignore_items = if self.repeated_items { &empty } else { train_items };

        let relevant: HashSet<usize> = test_items
            .iter()
            .copied()
            .filter(|&item_id| candidates.contains(item_id))
            .collect();
        if relevant.is_empty() {
            return None;
        }

        let num_eval_items = candidates
            .items()
            .iter()
            .filter(|item_id| !ignore_items.contains(item_id))
            .count();
        if num_eval_items == relevant.len() {
            return None;
        }

        let ranked: Vec<usize> = model
            .recommend(
                user_id,
                self.predict_items_number,
                ignore_items,
                candidates.items(),
            )
            .into_iter()
            .map(|candidate| candidate.item_id)
            .collect();
        let num_dropped = num_eval_items.saturating_sub(ranked.len());

        let mut results = EvaluationResults::new();
        results.insert("AUC", metrics::auc(&ranked, &relevant, num_dropped));
        for k in [1, 5, 10] {
            results.insert(format!("prec@{}", k), metrics::precision_at(&ranked, &relevant, k));
            results.insert(format!("recall@{}", k), metrics::recall_at(&ranked, &relevant, k));
        }
        results.insert("MAP", metrics::average_precision(&ranked, &relevant));
        results.insert("NDCG", metrics::ndcg(&ranked, &relevant));
        results.insert("MRR", metrics::reciprocal_rank(&ranked, &relevant));
        Some(results)
    }

    /// Averages per-user metrics and appends the counts.
    pub fn summarize(per_user: &[EvaluationResults], num_items: usize) -> Result<EvaluationResults> {
        let mut results = if per_user.is_empty() {
            EvaluationResults::MEASURES
                .iter()
                .map(|measure| (measure.to_string(), 0.0))
                .collect()
        } else {
            EvaluationResults::average(per_user)?
        };
        results.insert("num_users", per_user.len() as f64);
        results.insert("num_items", num_items as f64);
        results.insert("num_lists", per_user.len() as f64);
        Ok(results)
    }
}

impl FoldEvaluator for ItemsEvaluator {
    fn evaluate<M: ItemRecommender>(
        &self,
        model: &M,
        train: &PosOnlyFeedback,
        test: &PosOnlyFeedback,
        context: &EvaluationContext<'_>,
    ) -> Result<EvaluationResults> {
        let candidates = CandidateSet::from_context(train, test, context)?;
        let test_users = if context.test_users.is_empty() {
            test.all_users()
        } else {
            context.test_users.to_vec()
        };

        let test_by_user = test.user_items();
        let train_by_user = train.user_items();
        let no_items = HashSet::new();

        let per_user: Vec<EvaluationResults> = test_users
            .par_iter()
            .filter_map(|user_id| {
                let test_items = test_by_user.get(user_id)?;
                let train_items = train_by_user.get(user_id).unwrap_or(&no_items);
                self.evaluate_user(model, *user_id, test_items, train_items, &candidates)
            })
            .collect();

        Self::summarize(&per_user, candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoredCandidate;

    /// Ranks items by ascending id, whatever the user.
    struct ById;

    impl ItemRecommender for ById {
        fn predict(&self, _user_id: usize, item_id: usize) -> f32 {
            item_id as f32
        }

        fn recommend(
            &self,
            _user_id: usize,
            n: Option<usize>,
            ignore_items: &HashSet<usize>,
            candidate_items: &[usize],
        ) -> Vec<ScoredCandidate> {
            crate::algorithms::ranker::rank(|item| item as f32, n, ignore_items, candidate_items)
        }
    }

    fn set(items: &[usize]) -> HashSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_candidate_modes() {
        let train = PosOnlyFeedback::from_pairs(vec![(0, 1), (0, 2)]);
        let test = PosOnlyFeedback::from_pairs(vec![(0, 2), (0, 3)]);
        let explicit = [9, 4, 4];
        let items = |mode| {
            let context = EvaluationContext::new(mode).with_candidate_items(&explicit);
            CandidateSet::from_context(&train, &test, &context)
                .unwrap()
                .items()
                .to_vec()
        };
        assert_eq!(items(CandidateItems::Training), vec![1, 2]);
        assert_eq!(items(CandidateItems::Test), vec![2, 3]);
        assert_eq!(items(CandidateItems::Overlap), vec![2]);
        assert_eq!(items(CandidateItems::Union), vec![1, 2, 3]);
        assert_eq!(items(CandidateItems::Explicit), vec![4, 9]);
    }

    #[test]
    fn test_evaluate_user_ignores_training_items() {
        let candidates = CandidateSet::new((0..5).collect());
        let evaluator = ItemsEvaluator::new();
        // item 0 ranks first but is a training item, so item 1 is top
        let results = evaluator
            .evaluate_user(&ById, 0, &set(&[1]), &set(&[0]), &candidates)
            .unwrap();
        assert_eq!(results.get("AUC"), Some(1.0));
        assert_eq!(results.get("prec@1"), Some(1.0));
        assert_eq!(results.get("MRR"), Some(1.0));

        let repeated = ItemsEvaluator {
            repeated_items: true,
            ..ItemsEvaluator::new()
        };
        let results = repeated
            .evaluate_user(&ById, 0, &set(&[1]), &set(&[0]), &candidates)
            .unwrap();
        assert_eq!(results.get("prec@1"), Some(0.0));
        assert_eq!(results.get("MRR"), Some(0.5));
    }

    #[test]
    fn test_test_item_seen_in_training_stays_relevant() {
        let candidates = CandidateSet::new((0..5).collect());
        // item 1 is relevant but excluded from the ranking as a training item
        let results = ItemsEvaluator::new()
            .evaluate_user(&ById, 0, &set(&[1, 2]), &set(&[0, 1]), &candidates)
            .unwrap();
        assert_eq!(results.get("recall@10"), Some(0.5));
        assert_eq!(results.get("prec@1"), Some(1.0));
        assert_eq!(results.get("MAP"), Some(0.5));
    }

    #[test]
    fn test_explicit_mode_without_candidates_is_rejected() {
        let train = PosOnlyFeedback::from_pairs(vec![(0, 0), (0, 1)]);
        let test = PosOnlyFeedback::from_pairs(vec![(0, 2)]);
        let context = EvaluationContext::new(CandidateItems::Explicit);
        let result = ItemsEvaluator::new().evaluate(&ById, &train, &test, &context);
        assert!(matches!(
            result,
            Err(RecError::InvalidConfig { param: "candidate_items", .. })
        ));

        let explicit = [1, 2, 3];
        let context = context.with_candidate_items(&explicit);
        let results = ItemsEvaluator::new()
            .evaluate(&ById, &train, &test, &context)
            .unwrap();
        assert_eq!(results.get("num_items"), Some(3.0));
        assert_eq!(results.get("num_users"), Some(1.0));
    }

    #[test]
    fn test_evaluate_user_skips_degenerate_users() {
        let candidates = CandidateSet::new([1, 2].into_iter().collect());
        let evaluator = ItemsEvaluator::new();
        assert!(evaluator
            .evaluate_user(&ById, 0, &set(&[7]), &HashSet::new(), &candidates)
            .is_none());
        assert!(evaluator
            .evaluate_user(&ById, 0, &set(&[1, 2]), &HashSet::new(), &candidates)
            .is_none());
    }

    #[test]
    fn test_evaluate_fold_counts() {
        let train = PosOnlyFeedback::from_pairs(vec![(0, 0), (1, 0), (1, 3)]);
        let test = PosOnlyFeedback::from_pairs(vec![(0, 1), (1, 2), (2, 3)]);
        let context = EvaluationContext::new(CandidateItems::Union);
        let results = ItemsEvaluator::new()
            .evaluate(&ById, &train, &test, &context)
            .unwrap();

        // user 0: candidates 1..=3, hit at the top; user 1: 1, 2 left, hit second;
        // user 2: item 3 after 0, 1, 2
        assert_eq!(results.get("num_users"), Some(3.0));
        assert_eq!(results.get("num_items"), Some(4.0));
        assert_eq!(results.get("num_lists"), Some(3.0));
        assert!((results.get("MRR").unwrap() - (1.0 + 0.5 + 0.25) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_without_users() {
        let results = ItemsEvaluator::summarize(&[], 12).unwrap();
        assert_eq!(results.get("AUC"), Some(0.0));
        assert_eq!(results.get("num_users"), Some(0.0));
        assert_eq!(results.get("num_items"), Some(12.0));
    }
}
