pub mod factors;
pub mod incremental_mf;
pub mod initializer;
pub mod optimizer;
pub mod ranker;

pub use factors::{FactorMatrix, FactorStore};
pub use incremental_mf::IncrementalMf;
pub use initializer::InitializationMethod;
pub use optimizer::{PointwiseSgd, UpdateRule};

use crate::error::Result;
use crate::models::{PosOnlyFeedback, ScoredCandidate};
use std::collections::HashSet;

/// A model that can score and rank items for a user.
pub trait ItemRecommender: Send + Sync {
    /// Raw prediction for a pair; unknown ids yield `f32::MIN`.
    fn predict(&self, user_id: usize, item_id: usize) -> f32;

    /// Ranks `candidate_items` for the user, best first. `n = None` ranks all.
    fn recommend(
        &self,
        user_id: usize,
        n: Option<usize>,
        ignore_items: &HashSet<usize>,
        candidate_items: &[usize],
    ) -> Vec<ScoredCandidate>;
}

/// A recommender that can be cloned into a fresh instance and trained.
pub trait TrainableRecommender: ItemRecommender + Sized {
    /// Same configuration, no learned state and no feedback.
    fn fresh_clone(&self) -> Self;

    fn set_feedback(&mut self, feedback: PosOnlyFeedback);

    fn train(&mut self) -> Result<()>;
}

/// A recommender trained by repeated passes over its feedback.
pub trait IterativeModel: TrainableRecommender {
    /// One more pass over the feedback.
    fn iterate(&mut self) -> Result<()>;

    /// Number of passes `train` performs.
    fn num_iter(&self) -> usize;

    fn compute_objective(&self) -> f32;
}

/// A recommender that keeps itself current as feedback arrives or leaves.
pub trait IncrementalItemRecommender: ItemRecommender {
    fn add_feedback(&mut self, pairs: &[(usize, usize)]) -> Result<()>;

    fn remove_feedback(&mut self, pairs: &[(usize, usize)]) -> Result<()>;

    fn add_user(&mut self, user_id: usize) -> Result<()>;

    fn add_item(&mut self, item_id: usize) -> Result<()>;

    fn remove_user(&mut self, user_id: usize) -> Result<()>;

    fn remove_item(&mut self, item_id: usize) -> Result<()>;
}
