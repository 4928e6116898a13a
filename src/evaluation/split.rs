use crate::error::Result;
use crate::models::PosOnlyFeedback;
use crate::utils::validation::{validate_num_folds, validate_test_ratio};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Train/test partitions of a feedback set, one pair per fold.
pub trait Split: Sync {
    fn num_folds(&self) -> usize;

    fn train(&self, fold: usize) -> &PosOnlyFeedback;

    fn test(&self, fold: usize) -> &PosOnlyFeedback;
}

/// k-fold split: every user's items are shuffled and dealt round-robin into
/// the k test sets, so each pair is tested exactly once.
#[derive(Debug, Clone)]
pub struct CrossValidationSplit {
    train: Vec<PosOnlyFeedback>,
    test: Vec<PosOnlyFeedback>,
}

impl CrossValidationSplit {
    pub fn new<R: Rng + ?Sized>(
        feedback: &PosOnlyFeedback,
        num_folds: usize,
        rng: &mut R,
    ) -> Result<Self> {
        validate_num_folds(num_folds)?;

        let mut by_user: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (user_id, item_id) in feedback.iter() {
            by_user.entry(user_id).or_default().push(item_id);
        }

        let mut test_pairs: Vec<Vec<(usize, usize)>> = vec![Vec::new(); num_folds];
        let mut fold = 0;
        for (user_id, mut items) in by_user {
            items.shuffle(rng);
            for item_id in items {
                test_pairs[fold].push((user_id, item_id));
                fold = (fold + 1) % num_folds;
            }
        }

        let mut train = Vec::with_capacity(num_folds);
        let mut test = Vec::with_capacity(num_folds);
        for held_out in 0..num_folds {
            let train_pairs = test_pairs
                .iter()
                .enumerate()
                .filter(|(f, _)| *f != held_out)
                .flat_map(|(_, pairs)| pairs.iter().copied());
            train.push(PosOnlyFeedback::from_pairs(train_pairs));
            test.push(PosOnlyFeedback::from_pairs(test_pairs[held_out].iter().copied()));
        }

        Ok(Self { train, test })
    }
}

impl Split for CrossValidationSplit {
    fn num_folds(&self) -> usize {
        self.train.len()
    }

    fn train(&self, fold: usize) -> &PosOnlyFeedback {
        &self.train[fold]
    }

    fn test(&self, fold: usize) -> &PosOnlyFeedback {
        &self.test[fold]
    }
}

/// Single-fold split holding out a random share of the pairs.
#[derive(Debug, Clone)]
pub struct SimpleSplit {
    train: PosOnlyFeedback,
    test: PosOnlyFeedback,
}

impl SimpleSplit {
    pub fn new<R: Rng + ?Sized>(
        feedback: &PosOnlyFeedback,
        test_ratio: f64,
        rng: &mut R,
    ) -> Result<Self> {
        validate_test_ratio(test_ratio, false)?;

        let indices = feedback.random_index(rng);
        let num_test = (feedback.len() as f64 * test_ratio).round() as usize;

        let mut train = PosOnlyFeedback::new();
        let mut test = PosOnlyFeedback::new();
        for (position, index) in indices.into_iter().enumerate() {
            if let Some((user_id, item_id)) = feedback.pair(index) {
                if position < num_test {
                    test.add(user_id, item_id);
                } else {
                    train.add(user_id, item_id);
                }
            }
        }

        Ok(Self { train, test })
    }

    /// Uses a separately supplied test set.
    pub fn from_parts(train: PosOnlyFeedback, test: PosOnlyFeedback) -> Self {
        Self { train, test }
    }
}

impl Split for SimpleSplit {
    fn num_folds(&self) -> usize {
        1
    }

    fn train(&self, _fold: usize) -> &PosOnlyFeedback {
        &self.train
    }

    fn test(&self, _fold: usize) -> &PosOnlyFeedback {
        &self.test
    }
}

/// Draws `num_users` distinct users at random, returned in ascending order.
/// Asking for as many users as there are, or more, returns all of them.
pub fn sample_users<R: Rng + ?Sized>(users: &[usize], num_users: usize, rng: &mut R) -> Vec<usize> {
    let mut sampled: Vec<usize> = if num_users < users.len() {
        users.choose_multiple(rng, num_users).copied().collect()
    } else {
        users.to_vec()
    };
    sampled.sort_unstable();
    sampled
}
