use criterion::{black_box, criterion_group, criterion_main, Criterion};
use onlinerec::config::MfConfig;
use onlinerec::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn synthetic_feedback(num_users: usize, num_items: usize, per_user: usize) -> PosOnlyFeedback {
    let mut rng = StdRng::seed_from_u64(42);
    let mut feedback = PosOnlyFeedback::new();
    for user_id in 0..num_users {
        for _ in 0..per_user {
            feedback.add(user_id, rng.gen_range(0..num_items));
        }
    }
    feedback
}

fn config() -> MfConfig {
    MfConfig {
        num_factors: 32,
        num_iter: 5,
        random_seed: Some(7),
        ..MfConfig::default()
    }
}

fn trained_model(feedback: &PosOnlyFeedback) -> IncrementalMf {
    let mut model = IncrementalMf::new(config()).unwrap();
    model.set_feedback(feedback.clone());
    model.train().unwrap();
    model
}

fn benchmark_training(c: &mut Criterion) {
    let feedback = synthetic_feedback(1000, 2000, 20);
    let mut model = trained_model(&feedback);

    c.bench_function("train_epoch", |b| {
        b.iter(|| {
            black_box(model.train_epoch().unwrap());
        });
    });

    c.bench_function("add_feedback", |b| {
        b.iter(|| {
            black_box(model.add_feedback(&[(3, 17), (1001, 5)]).unwrap());
        });
    });
}

fn benchmark_ranking(c: &mut Criterion) {
    let feedback = synthetic_feedback(1000, 20_000, 20);
    let model = trained_model(&feedback);
    let candidates: Vec<usize> = (0..20_000).collect();
    let ignore: HashSet<usize> = (0..50).collect();

    c.bench_function("recommend_top_10", |b| {
        b.iter(|| {
            black_box(model.recommend(3, Some(10), &ignore, &candidates));
        });
    });

    c.bench_function("recommend_all", |b| {
        b.iter(|| {
            black_box(model.recommend(3, None, &ignore, &candidates));
        });
    });
}

fn benchmark_cross_validation(c: &mut Criterion) {
    use onlinerec::evaluation::*;

    let feedback = synthetic_feedback(300, 500, 10);
    let split = CrossValidationSplit::new(&feedback, 5, &mut StdRng::seed_from_u64(1)).unwrap();
    let prototype = IncrementalMf::new(config()).unwrap();
    let evaluator = ItemsEvaluator::new();
    let context = EvaluationContext::new(CandidateItems::Union);

    let mut group = c.benchmark_group("cross_validation");
    group.sample_size(10);
    group.bench_function("5_folds", |b| {
        b.iter(|| {
            black_box(evaluate(&prototype, &split, &evaluator, &context, false).unwrap());
        });
    });
    group.finish();
}

fn benchmark_metrics(c: &mut Criterion) {
    use onlinerec::utils::metrics::*;

    let ranked: Vec<usize> = (0..1000).collect();
    let relevant: HashSet<usize> = (0..1000).step_by(37).collect();

    c.bench_function("auc", |b| {
        b.iter(|| {
            black_box(auc(&ranked, &relevant, 0));
        });
    });

    c.bench_function("ndcg", |b| {
        b.iter(|| {
            black_box(ndcg(&ranked, &relevant));
        });
    });
}

criterion_group!(
    benches,
    benchmark_training,
    benchmark_ranking,
    benchmark_cross_validation,
    benchmark_metrics
);
criterion_main!(benches);
