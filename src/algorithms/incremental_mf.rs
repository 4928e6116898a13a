use super::factors::FactorStore;
use super::initializer::InitializationMethod;
use super::optimizer::{PointwiseSgd, UpdateRule};
use super::ranker;
use super::{IncrementalItemRecommender, ItemRecommender, IterativeModel, TrainableRecommender};
use crate::config::MfConfig;
use crate::error::Result;
use crate::models::{PosOnlyFeedback, ScoredCandidate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Matrix factorization for positive-only feedback, trained by SGD and kept
/// current through per-pair updates as users, items and feedback change.
///
/// Every observed pair is regressed towards 1; items are ranked by how far
/// their prediction is from that target.
#[derive(Debug)]
pub struct IncrementalMf<U: UpdateRule = PointwiseSgd> {
    config: MfConfig,
    rule: U,
    initializer: InitializationMethod,
    factors: FactorStore,
    feedback: PosOnlyFeedback,
    current_learnrate: f32,
    epochs: usize,
    rng: StdRng,
}

impl IncrementalMf<PointwiseSgd> {
    pub fn new(config: MfConfig) -> Result<Self> {
        Self::with_rule(config, PointwiseSgd)
    }
}

impl<U: UpdateRule> IncrementalMf<U> {
    pub fn with_rule(config: MfConfig, rule: U) -> Result<Self> {
        config.validate()?;
        let initializer = InitializationMethod::normal(config.init_mean, config.init_std_dev);
        Ok(Self {
            factors: FactorStore::new(config.num_factors),
            feedback: PosOnlyFeedback::new(),
            current_learnrate: config.learn_rate,
            epochs: 0,
            rng: seeded_rng(config.random_seed),
            initializer,
            rule,
            config,
        })
    }

    /// Replaces the Normal prior used for new factor rows.
    pub fn with_initializer(mut self, initializer: InitializationMethod) -> Result<Self> {
        initializer.validate()?;
        self.initializer = initializer;
        Ok(self)
    }

    pub fn config(&self) -> &MfConfig {
        &self.config
    }

    pub fn factors(&self) -> &FactorStore {
        &self.factors
    }

    pub fn feedback(&self) -> &PosOnlyFeedback {
        &self.feedback
    }

    /// Learn rate used for the next epoch.
    pub fn current_learnrate(&self) -> f32 {
        self.current_learnrate
    }

    /// Epochs run since the last `init_model`.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Discards learned factors, sizes them to the known users and items and
    /// draws every row from the prior.
    pub fn init_model(&mut self) -> Result<()> {
        self.factors = FactorStore::new(self.config.num_factors);
        self.ensure_rows_for_feedback()?;
        self.current_learnrate = self.config.learn_rate;
        self.epochs = 0;
        Ok(())
    }

    /// Prediction for a pair, `f32::MIN` if either id has no factor row yet.
    pub fn predict_bounded(&self, user_id: usize, item_id: usize, bound: bool) -> f32 {
        match self.factors.dot_product(user_id, item_id) {
            Ok(result) if bound => result.clamp(0.0, 1.0),
            Ok(result) => result,
            Err(_) => f32::MIN,
        }
    }

    /// Distance of the prediction from the target 1. NaN and overflow map to `f32::MAX`.
    pub fn ranking_error(&self, user_id: usize, item_id: usize) -> f32 {
        (1.0 - self.predict_bounded(user_id, item_id, false))
            .abs()
            .min(f32::MAX)
    }

    /// One SGD pass over a fresh permutation of the feedback, then learn rate decay.
    pub fn train_epoch(&mut self) -> Result<()> {
        self.ensure_rows_for_feedback()?;

        let (update_users, update_items) = (self.config.update_users, self.config.update_items);
        let indices = self.feedback.random_index(&mut self.rng);
        for index in indices {
            if let Some((user_id, item_id)) = self.feedback.pair(index) {
                self.update_pair(user_id, item_id, update_users, update_items)?;
            }
        }

        self.current_learnrate *= self.config.decay;
        self.epochs += 1;
        debug!(
            epoch = self.epochs,
            learn_rate = self.current_learnrate,
            pairs = self.feedback.len(),
            "Finished epoch"
        );
        Ok(())
    }

    pub fn update_pair(
        &mut self,
        user_id: usize,
        item_id: usize,
        update_user: bool,
        update_item: bool,
    ) -> Result<()> {
        self.rule.update_pair(
            &mut self.factors,
            user_id,
            item_id,
            self.current_learnrate,
            self.config.regularization,
            update_user,
            update_item,
        )
    }

    /// Ranks every item the model has a factor row for.
    pub fn recommend_all_items(
        &self,
        user_id: usize,
        n: Option<usize>,
        ignore_items: &HashSet<usize>,
    ) -> Vec<ScoredCandidate> {
        let candidates: Vec<usize> = (0..self.factors.item_factors.num_rows()).collect();
        self.recommend(user_id, n, ignore_items, &candidates)
    }

    fn ensure_rows_for_feedback(&mut self) -> Result<()> {
        if let Some(max_user_id) = self.feedback.max_user_id() {
            self.grow_users(max_user_id + 1)?;
        }
        if let Some(max_item_id) = self.feedback.max_item_id() {
            self.grow_items(max_item_id + 1)?;
        }
        Ok(())
    }

    fn grow_users(&mut self, rows: usize) -> Result<()> {
        for row in self.factors.user_factors.add_rows(rows)? {
            self.factors
                .user_factors
                .init_row(row, &self.initializer, &mut self.rng)?;
        }
        Ok(())
    }

    fn grow_items(&mut self, rows: usize) -> Result<()> {
        for row in self.factors.item_factors.add_rows(rows)? {
            self.factors
                .item_factors
                .init_row(row, &self.initializer, &mut self.rng)?;
        }
        Ok(())
    }

    fn retrain(&mut self, pairs: &[(usize, usize)]) -> Result<()> {
        let (update_users, update_items) = (self.config.update_users, self.config.update_items);
        for &(user_id, item_id) in pairs {
            self.update_pair(user_id, item_id, update_users, update_items)?;
        }
        Ok(())
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl<U: UpdateRule> ItemRecommender for IncrementalMf<U> {
    fn predict(&self, user_id: usize, item_id: usize) -> f32 {
        self.predict_bounded(user_id, item_id, false)
    }

    fn recommend(
        &self,
        user_id: usize,
        n: Option<usize>,
        ignore_items: &HashSet<usize>,
        candidate_items: &[usize],
    ) -> Vec<ScoredCandidate> {
        ranker::rank(
            |item_id| self.ranking_error(user_id, item_id),
            n,
            ignore_items,
            candidate_items,
        )
    }
}

impl<U: UpdateRule> TrainableRecommender for IncrementalMf<U> {
    fn fresh_clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            rule: self.rule.clone(),
            initializer: self.initializer,
            factors: FactorStore::new(self.config.num_factors),
            feedback: PosOnlyFeedback::new(),
            current_learnrate: self.config.learn_rate,
            epochs: 0,
            rng: seeded_rng(self.config.random_seed),
        }
    }

    fn set_feedback(&mut self, feedback: PosOnlyFeedback) {
        self.feedback = feedback;
    }

    fn train(&mut self) -> Result<()> {
        let started = Instant::now();
        self.init_model()?;
        for _ in 0..self.config.num_iter {
            self.train_epoch()?;
        }
        info!(
            model = %self,
            users = self.factors.user_factors.num_rows(),
            items = self.factors.item_factors.num_rows(),
            pairs = self.feedback.len(),
            elapsed = ?started.elapsed(),
            "Training completed"
        );
        Ok(())
    }
}

impl<U: UpdateRule> IterativeModel for IncrementalMf<U> {
    fn iterate(&mut self) -> Result<()> {
        self.train_epoch()
    }

    fn num_iter(&self) -> usize {
        self.config.num_iter
    }

    /// No objective is tracked for this model.
    fn compute_objective(&self) -> f32 {
        -1.0
    }
}

impl<U: UpdateRule> IncrementalItemRecommender for IncrementalMf<U> {
    fn add_feedback(&mut self, pairs: &[(usize, usize)]) -> Result<()> {
        for &(user_id, item_id) in pairs {
            self.add_user(user_id)?;
            self.add_item(item_id)?;
            self.feedback.add(user_id, item_id);
        }
        self.retrain(pairs)
    }

    fn remove_feedback(&mut self, pairs: &[(usize, usize)]) -> Result<()> {
        for &(user_id, item_id) in pairs {
            self.feedback.remove(user_id, item_id);
        }
        self.retrain(pairs)
    }

    /// Creates the factor row of a new user; existing rows are left untouched.
    fn add_user(&mut self, user_id: usize) -> Result<()> {
        self.grow_users(user_id + 1)
    }

    fn add_item(&mut self, item_id: usize) -> Result<()> {
        self.grow_items(item_id + 1)
    }

    /// Zeroes the user's factors and drops its feedback; the id stays allocated.
    fn remove_user(&mut self, user_id: usize) -> Result<()> {
        self.factors.user_factors.zero_row(user_id)?;
        let removed = self.feedback.remove_user(user_id);
        debug!(user_id, removed, "Removed user");
        Ok(())
    }

    fn remove_item(&mut self, item_id: usize) -> Result<()> {
        self.factors.item_factors.zero_row(item_id)?;
        let removed = self.feedback.remove_item(item_id);
        debug!(item_id, removed, "Removed item");
        Ok(())
    }
}

impl<U: UpdateRule> fmt::Display for IncrementalMf<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IncrementalMf num_factors={} regularization={} learn_rate={} num_iter={} decay={}",
            self.config.num_factors,
            self.config.regularization,
            self.config.learn_rate,
            self.config.num_iter,
            self.config.decay
        )
    }
}
