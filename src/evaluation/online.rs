use super::items::{CandidateSet, ItemsEvaluator};
use super::EvaluationContext;
use crate::algorithms::IncrementalItemRecommender;
use crate::error::Result;
use crate::models::{EvaluationResults, PosOnlyFeedback};
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

/// Online evaluation: users are evaluated one at a time, and each user's test
/// feedback is fed to the model right after their evaluation.
///
/// `model` must already be trained on `train`.
pub fn evaluate_online<M: IncrementalItemRecommender>(
    model: &mut M,
    evaluator: &ItemsEvaluator,
    train: &PosOnlyFeedback,
    test: &PosOnlyFeedback,
    context: &EvaluationContext<'_>,
) -> Result<EvaluationResults> {
    let start_time = Instant::now();
    let candidates = CandidateSet::from_context(train, test, context)?;
    let test_users = if context.test_users.is_empty() {
        test.all_users()
    } else {
        context.test_users.to_vec()
    };

    let test_by_user = test.user_items();
    let train_by_user = train.user_items();
    let no_items = HashSet::new();

    let mut per_user = Vec::with_capacity(test_users.len());
    let mut fed_pairs = 0;
    for user_id in test_users {
        let test_items = match test_by_user.get(&user_id) {
            Some(items) => items,
            None => continue,
        };
        let train_items = train_by_user.get(&user_id).unwrap_or(&no_items);

        if let Some(results) =
            evaluator.evaluate_user(&*model, user_id, test_items, train_items, &candidates)
        {
            per_user.push(results);
        }

        let mut items: Vec<usize> = test_items.iter().copied().collect();
        items.sort_unstable();
        let pairs: Vec<(usize, usize)> = items.into_iter().map(|item_id| (user_id, item_id)).collect();
        model.add_feedback(&pairs)?;
        fed_pairs += pairs.len();
    }

    info!(
        users = per_user.len(),
        fed_pairs,
        elapsed = ?start_time.elapsed(),
        "Online evaluation completed"
    );
    ItemsEvaluator::summarize(&per_user, candidates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{IncrementalMf, TrainableRecommender};
    use crate::config::MfConfig;
    use crate::models::CandidateItems;

    fn config() -> MfConfig {
        MfConfig {
            num_factors: 4,
            num_iter: 5,
            random_seed: Some(3),
            ..MfConfig::default()
        }
    }

    #[test]
    fn test_online_feeds_test_pairs_back() {
        let train: PosOnlyFeedback = (0..20).map(|k| (k % 4, k % 5)).collect();
        let test = PosOnlyFeedback::from_pairs(vec![(0, 6), (1, 7), (2, 6)]);

        let mut model = IncrementalMf::new(config()).unwrap();
        model.set_feedback(train.clone());
        model.train().unwrap();

        let context = EvaluationContext::new(CandidateItems::Union);
        let results =
            evaluate_online(&mut model, &ItemsEvaluator::new(), &train, &test, &context).unwrap();

        assert_eq!(results.get("num_users"), Some(3.0));
        assert_eq!(model.feedback().len(), train.len() + test.len());
        for (user_id, item_id) in test.iter() {
            assert!(model.feedback().iter().any(|pair| pair == (user_id, item_id)));
        }
    }

    #[test]
    fn test_online_restricted_users() {
        let train: PosOnlyFeedback = (0..12).map(|k| (k % 3, k % 4)).collect();
        let test = PosOnlyFeedback::from_pairs(vec![(0, 5), (1, 5)]);

        let mut model = IncrementalMf::new(config()).unwrap();
        model.set_feedback(train.clone());
        model.train().unwrap();

        let users = [1];
        let context = EvaluationContext::new(CandidateItems::Union).with_test_users(&users);
        let results =
            evaluate_online(&mut model, &ItemsEvaluator::new(), &train, &test, &context).unwrap();

        assert_eq!(results.get("num_users"), Some(1.0));
        assert_eq!(model.feedback().len(), train.len() + 1);
    }
}
