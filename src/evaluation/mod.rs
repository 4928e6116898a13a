pub mod cross_validation;
pub mod items;
pub mod online;
pub mod split;

pub use cross_validation::{evaluate, evaluate_iterative, FindIterSchedule, IterationResults};
pub use items::ItemsEvaluator;
pub use online::evaluate_online;
pub use split::{sample_users, CrossValidationSplit, SimpleSplit, Split};

use crate::algorithms::ItemRecommender;
use crate::error::Result;
use crate::models::{CandidateItems, EvaluationResults, PosOnlyFeedback};

/// Users and items an evaluation run is restricted to.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Users to evaluate; empty means every user of the test set.
    pub test_users: &'a [usize],
    /// Candidates for `CandidateItems::Explicit`.
    pub candidate_items: &'a [usize],
    pub mode: CandidateItems,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(mode: CandidateItems) -> Self {
        Self {
            test_users: &[],
            candidate_items: &[],
            mode,
        }
    }

    pub fn with_test_users(mut self, test_users: &'a [usize]) -> Self {
        self.test_users = test_users;
        self
    }

    pub fn with_candidate_items(mut self, candidate_items: &'a [usize]) -> Self {
        self.candidate_items = candidate_items;
        self
    }
}

/// Evaluates one trained model on one train/test partition.
pub trait FoldEvaluator: Sync {
    fn evaluate<M: ItemRecommender>(
        &self,
        model: &M,
        train: &PosOnlyFeedback,
        test: &PosOnlyFeedback,
        context: &EvaluationContext<'_>,
    ) -> Result<EvaluationResults>;
}
