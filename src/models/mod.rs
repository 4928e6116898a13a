use crate::error::{RecError, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub mod feedback;

pub use feedback::PosOnlyFeedback;

/// An item together with its ranking score. Lower scores rank first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub item_id: usize,
    pub score: f32,
}

impl ScoredCandidate {
    pub fn new(item_id: usize, score: f32) -> Self {
        Self { item_id, score }
    }

    fn key(&self) -> (OrderedFloat<f32>, usize) {
        (OrderedFloat(self.score), self.item_id)
    }
}

impl PartialEq for ScoredCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScoredCandidate {}

impl PartialOrd for ScoredCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Which items are ranked when evaluating a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateItems {
    Training,
    Test,
    Overlap,
    #[default]
    Union,
    Explicit,
}

/// Metric name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationResults(BTreeMap<String, f64>);

impl EvaluationResults {
    pub const MEASURES: [&'static str; 10] = [
        "AUC", "prec@1", "prec@5", "prec@10", "MAP", "recall@1", "recall@5", "recall@10", "NDCG",
        "MRR",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: impl Into<String>, value: f64) {
        self.0.insert(metric.into(), value);
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Averages per-fold results over the keys of the first fold.
    ///
    /// Every key is divided by the number of folds, counts such as
    /// `num_users` and `num_items` included. Folds are summed in order so the
    /// result does not depend on which fold finished first.
    pub fn average(folds: &[EvaluationResults]) -> Result<Self> {
        let first = folds.first().ok_or(RecError::NoResults)?;
        let mut averaged = EvaluationResults::new();

        for metric in first.0.keys() {
            let mut sum = 0.0;
            for (fold, results) in folds.iter().enumerate() {
                sum += results.get(metric).ok_or_else(|| RecError::MissingMetric {
                    metric: metric.clone(),
                    fold,
                })?;
            }
            averaged.insert(metric.clone(), sum / folds.len() as f64);
        }

        Ok(averaged)
    }
}

impl FromIterator<(String, f64)> for EvaluationResults {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for EvaluationResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut order: Vec<&str> = Self::MEASURES.to_vec();
        order.extend(["num_users", "num_items", "num_lists"]);
        order.extend(
            self.0
                .keys()
                .map(String::as_str)
                .filter(|k| !Self::MEASURES.contains(k) && !k.starts_with("num_")),
        );

        let mut first = true;
        for metric in order {
            if let Some(value) = self.get(metric) {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                if metric.starts_with("num_") {
                    write!(f, "{} {}", metric, value)?;
                } else {
                    write!(f, "{} {:.5}", metric, value)?;
                }
            }
        }
        Ok(())
    }
}
