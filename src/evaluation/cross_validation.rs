use super::{EvaluationContext, FoldEvaluator, Split};
use crate::algorithms::{IterativeModel, TrainableRecommender};
use crate::config::EvaluationConfig;
use crate::error::{RecError, Result};
use crate::models::EvaluationResults;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

fn fold_failed(fold: usize) -> impl Fn(RecError) -> RecError {
    move |source| RecError::FoldFailed {
        fold,
        source: Box::new(source),
    }
}

fn train_fold<M: TrainableRecommender, S: Split>(recommender: &M, split: &S, fold: usize) -> Result<M> {
    let mut model = recommender.fresh_clone();
    model.set_feedback(split.train(fold).clone());
    model.train()?;
    Ok(model)
}

fn log_fold(fold: usize, results: &EvaluationResults, show_fold_results: bool) {
    if show_fold_results {
        info!(fold, results = %results, "Fold results");
    }
}

/// Cross-validates `recommender` on every fold of `split` in parallel.
///
/// Each fold trains its own fresh clone; the prototype is never trained.
/// The first failing fold aborts the run.
pub fn evaluate<M, S, E>(
    recommender: &M,
    split: &S,
    evaluator: &E,
    context: &EvaluationContext<'_>,
    show_fold_results: bool,
) -> Result<EvaluationResults>
where
    M: TrainableRecommender,
    S: Split,
    E: FoldEvaluator,
{
    let start_time = Instant::now();
    let num_folds = split.num_folds();

    let fold_results = (0..num_folds)
        .into_par_iter()
        .map(|fold| {
            let results = train_fold(recommender, split, fold)
                .and_then(|model| {
                    evaluator.evaluate(&model, split.train(fold), split.test(fold), context)
                })
                .map_err(fold_failed(fold))?;
            log_fold(fold, &results, show_fold_results);
            Ok(results)
        })
        .collect::<Result<Vec<_>>>()?;

    let results = EvaluationResults::average(&fold_results)?;
    info!(
        folds = num_folds,
        elapsed = ?start_time.elapsed(),
        "Cross-validation completed"
    );
    Ok(results)
}

/// When and how long to search for the best number of epochs.
#[derive(Debug, Clone, PartialEq)]
pub struct FindIterSchedule {
    /// Evaluate every `find_iter` epochs.
    pub find_iter: usize,
    pub max_iter: usize,
    /// Stop once the measure falls this far below its best; 0 disables.
    pub epsilon: f64,
    /// Stop once the measure falls below this value.
    pub cutoff: f64,
    pub measure: String,
}

impl FindIterSchedule {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            find_iter: config.find_iter,
            max_iter: config.max_iter,
            epsilon: config.epsilon,
            cutoff: config.cutoff,
            measure: config.measure.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationResults {
    pub iteration: usize,
    pub results: EvaluationResults,
}

fn evaluate_models<M, S, E>(
    models: &[M],
    split: &S,
    evaluator: &E,
    context: &EvaluationContext<'_>,
    show_fold_results: bool,
) -> Result<EvaluationResults>
where
    M: TrainableRecommender,
    S: Split,
    E: FoldEvaluator,
{
    let fold_results = models
        .par_iter()
        .enumerate()
        .map(|(fold, model)| {
            let results = evaluator
                .evaluate(model, split.train(fold), split.test(fold), context)
                .map_err(fold_failed(fold))?;
            log_fold(fold, &results, show_fold_results);
            Ok(results)
        })
        .collect::<Result<Vec<_>>>()?;
    EvaluationResults::average(&fold_results)
}

/// Trains one model per fold and keeps iterating them, evaluating every
/// `find_iter` epochs, until `max_iter` or an early stop.
pub fn evaluate_iterative<M, S, E>(
    recommender: &M,
    split: &S,
    evaluator: &E,
    context: &EvaluationContext<'_>,
    schedule: &FindIterSchedule,
    show_fold_results: bool,
) -> Result<Vec<IterationResults>>
where
    M: IterativeModel,
    S: Split,
    E: FoldEvaluator,
{
    if schedule.find_iter == 0 {
        return Err(RecError::invalid("find_iter", schedule.find_iter, "must be positive"));
    }

    let mut models = (0..split.num_folds())
        .into_par_iter()
        .map(|fold| train_fold(recommender, split, fold).map_err(fold_failed(fold)))
        .collect::<Result<Vec<M>>>()?;

    let measure_of = |results: &EvaluationResults| {
        results.get(&schedule.measure).ok_or_else(|| RecError::MissingMetric {
            metric: schedule.measure.clone(),
            fold: 0,
        })
    };

    let mut iteration = recommender.num_iter();
    let results = evaluate_models(&models, split, evaluator, context, show_fold_results)?;
    measure_of(&results)?;
    info!(iteration, results = %results, "Iteration results");
    let mut history = vec![IterationResults { iteration, results }];
    // best over the scheduled evaluations only; the initial one is not a candidate
    let mut best = f64::NEG_INFINITY;

    while iteration < schedule.max_iter {
        iteration += 1;
        models
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(fold, model)| model.iterate().map_err(fold_failed(fold)))?;

        if iteration % schedule.find_iter != 0 {
            continue;
        }

        let results = evaluate_models(&models, split, evaluator, context, show_fold_results)?;
        let score = measure_of(&results)?;
        info!(iteration, results = %results, "Iteration results");
        history.push(IterationResults { iteration, results });

        best = best.max(score);
        if schedule.epsilon > 0.0 && best - score > schedule.epsilon {
            info!(iteration, best, score, "Measure fell below best by more than epsilon");
            break;
        }
        if score < schedule.cutoff {
            info!(iteration, score, cutoff = schedule.cutoff, "Measure fell below cutoff");
            break;
        }
    }

    Ok(history)
}
