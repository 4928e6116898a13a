use anyhow::{bail, Result};
use clap::Parser;
use onlinerec::config::EvaluationConfig;
use onlinerec::data::{read_feedback_file, read_id_list_file, IdMapping, PredictionWriter};
use onlinerec::evaluation::{
    evaluate, evaluate_iterative, evaluate_online, sample_users, CrossValidationSplit,
    EvaluationContext, FindIterSchedule, FoldEvaluator, ItemsEvaluator, IterationResults,
    SimpleSplit, Split,
};
use onlinerec::{
    init_tracing, CandidateItems, Config, EvaluationResults, IncrementalMf, PosOnlyFeedback,
    TrainableRecommender,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Positive-only feedback, one `user item` pair per line
    #[arg(short, long)]
    training_file: PathBuf,

    /// Separate test feedback, used instead of a ratio split
    #[arg(long)]
    test_file: Option<PathBuf>,

    /// Write ranked recommendations per user to this file
    #[arg(long)]
    prediction_file: Option<PathBuf>,

    /// Candidate item ids, one per line; switches to explicit candidates
    #[arg(long)]
    candidate_items: Option<PathBuf>,

    /// User ids to evaluate or predict for, one per line
    #[arg(long)]
    test_users: Option<PathBuf>,

    /// Evaluate a random sample of this many test users
    #[arg(long)]
    num_test_users: Option<usize>,

    /// Also evaluate the trained model on its training data
    #[arg(long)]
    compute_fit: bool,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    num_folds: Option<usize>,

    #[arg(long)]
    test_ratio: Option<f64>,

    #[arg(long)]
    find_iter: Option<usize>,

    #[arg(long)]
    max_iter: Option<usize>,

    #[arg(long)]
    random_seed: Option<u64>,

    /// Feed each user's test pairs to the model after evaluating them
    #[arg(long)]
    online: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        let evaluation = &mut config.evaluation;
        if let Some(num_folds) = self.num_folds {
            evaluation.num_folds = num_folds;
        }
        if let Some(test_ratio) = self.test_ratio {
            evaluation.test_ratio = test_ratio;
        }
        if let Some(find_iter) = self.find_iter {
            evaluation.find_iter = find_iter;
        }
        if let Some(max_iter) = self.max_iter {
            evaluation.max_iter = max_iter;
        }
        if self.candidate_items.is_some() {
            evaluation.candidate_items = CandidateItems::Explicit;
        }
        evaluation.online |= self.online;
        if self.random_seed.is_some() {
            config.model.random_seed = self.random_seed;
        }
    }
}

#[derive(Serialize)]
struct Report {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit: Option<EvaluationResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<EvaluationResults>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    iterations: Vec<IterationResults>,
}

impl Report {
    fn new(model: &IncrementalMf) -> Self {
        Self {
            model: model.to_string(),
            fit: None,
            results: None,
            iterations: Vec::new(),
        }
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("{}", self.model);
        if let Some(fit) = &self.fit {
            println!("fit: {}", fit);
        }
        if let Some(results) = &self.results {
            println!("{}", results);
        }
        for entry in &self.iterations {
            println!("iteration {}: {}", entry.iteration, entry.results);
        }
        Ok(())
    }
}

struct Session<'a> {
    recommender: IncrementalMf,
    evaluation: &'a EvaluationConfig,
    context: EvaluationContext<'a>,
    compute_fit: bool,
}

impl Session<'_> {
    fn evaluator(&self) -> ItemsEvaluator {
        ItemsEvaluator::from_config(self.evaluation)
    }

    fn warn_unsupported(&self, mode: &str) {
        if self.evaluation.online {
            warn!(mode, "Online evaluation is not available in this mode, ignoring it");
        }
        if self.compute_fit {
            warn!(mode, "Fit is only computed for a single trained model, ignoring it");
        }
    }

    /// Evaluation on the training data itself, training items included.
    fn fit(&self, model: &IncrementalMf, train: &PosOnlyFeedback) -> Result<EvaluationResults> {
        let evaluator = ItemsEvaluator {
            repeated_items: true,
            ..self.evaluator()
        };
        Ok(evaluator.evaluate(model, train, train, &self.context)?)
    }

    /// Evaluates on `split`; returns the trained model when there is exactly one.
    fn run<S: Split>(&self, split: &S) -> Result<(Report, Option<IncrementalMf>)> {
        let evaluator = self.evaluator();
        let mut report = Report::new(&self.recommender);

        if self.evaluation.find_iter > 0 {
            self.warn_unsupported("find_iter");
            let schedule = FindIterSchedule::from_config(self.evaluation);
            report.iterations = evaluate_iterative(
                &self.recommender,
                split,
                &evaluator,
                &self.context,
                &schedule,
                self.evaluation.show_fold_results,
            )?;
            return Ok((report, None));
        }

        if split.num_folds() > 1 {
            self.warn_unsupported("cross_validation");
            report.results = Some(evaluate(
                &self.recommender,
                split,
                &evaluator,
                &self.context,
                self.evaluation.show_fold_results,
            )?);
            return Ok((report, None));
        }

        let (train, test) = (split.train(0), split.test(0));
        let mut model = self.recommender.fresh_clone();
        model.set_feedback(train.clone());
        model.train()?;

        if self.compute_fit {
            report.fit = Some(self.fit(&model, train)?);
        }
        let results = if self.evaluation.online {
            evaluate_online(&mut model, &evaluator, train, test, &self.context)?
        } else {
            evaluator.evaluate(&model, train, test, &self.context)?
        };
        report.results = Some(results);
        Ok((report, Some(model)))
    }

    fn train_only(&self, feedback: PosOnlyFeedback) -> Result<(Report, Option<IncrementalMf>)> {
        let mut model = self.recommender.fresh_clone();
        model.set_feedback(feedback);
        model.train()?;

        let mut report = Report::new(&model);
        if self.compute_fit {
            report.fit = Some(self.fit(&model, model.feedback())?);
        }
        Ok((report, Some(model)))
    }
}

fn write_predictions(
    path: &Path,
    model: &IncrementalMf,
    writer: PredictionWriter<'_>,
    users: &[usize],
    candidates: &[usize],
) -> Result<()> {
    let train = model.feedback();
    let users = if users.is_empty() {
        train.all_users()
    } else {
        users.to_vec()
    };
    let all_items: Vec<usize>;
    let candidates = if candidates.is_empty() {
        all_items = (0..model.factors().item_factors.num_rows()).collect();
        &all_items
    } else {
        candidates
    };

    let file = BufWriter::new(File::create(path)?);
    let written = writer.write(model, train, &users, candidates, file)?;
    info!(path = %path.display(), users = written, "Wrote predictions");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("Starting onlinerec trainer");

    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };
    args.apply(&mut config);
    config.validate()?;

    info!("Configuration loaded: {:?}", config);

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.runtime.workers)
        .build_global()?;

    let mut user_mapping = IdMapping::new();
    let mut item_mapping = IdMapping::new();
    let feedback = read_feedback_file(&args.training_file, &mut user_mapping, &mut item_mapping)?;
    let test_data = args
        .test_file
        .as_ref()
        .map(|path| read_feedback_file(path, &mut user_mapping, &mut item_mapping))
        .transpose()?;

    let candidate_items = match &args.candidate_items {
        Some(path) => read_id_list_file(path, &item_mapping)?,
        None => Vec::new(),
    };
    if config.evaluation.candidate_items == CandidateItems::Explicit && candidate_items.is_empty() {
        bail!("explicit candidate items need --candidate-items with at least one known item");
    }

    let mut rng = match config.model.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut test_users = match &args.test_users {
        Some(path) => {
            let users = read_id_list_file(path, &user_mapping)?;
            if users.is_empty() {
                bail!("--test-users names no known user");
            }
            users
        }
        None => Vec::new(),
    };
    if let Some(num_test_users) = args.num_test_users {
        if test_users.is_empty() {
            test_users = test_data.as_ref().unwrap_or(&feedback).all_users();
        }
        test_users = sample_users(&test_users, num_test_users, &mut rng);
        info!(users = test_users.len(), "Sampled test users");
    }

    let evaluation = &config.evaluation;
    let session = Session {
        recommender: IncrementalMf::new(config.model.clone())?,
        evaluation,
        context: EvaluationContext::new(evaluation.candidate_items)
            .with_test_users(&test_users)
            .with_candidate_items(&candidate_items),
        compute_fit: args.compute_fit,
    };

    let (report, model) = if evaluation.num_folds >= 2 {
        if args.test_file.is_some() {
            warn!("Cross-validation uses the training file only, ignoring the test file");
        }
        let split = CrossValidationSplit::new(&feedback, evaluation.num_folds, &mut rng)?;
        session.run(&split)?
    } else if let Some(test) = test_data {
        session.run(&SimpleSplit::from_parts(feedback, test))?
    } else if evaluation.test_ratio > 0.0 {
        let split = SimpleSplit::new(&feedback, evaluation.test_ratio, &mut rng)?;
        session.run(&split)?
    } else {
        session.train_only(feedback)?
    };

    if let Some(path) = &args.prediction_file {
        match &model {
            Some(model) => {
                let writer = PredictionWriter::new(&user_mapping, &item_mapping)
                    .with_num_items(evaluation.predict_items_number)
                    .with_repeated_items(evaluation.repeated_items);
                write_predictions(path, model, writer, &test_users, &candidate_items)?;
            }
            None => warn!("Predictions need a single trained model, skipping the prediction file"),
        }
    }

    report.print(args.json)
}
