use crate::error::Result;
use crate::models::CandidateItems;
use crate::utils::validation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: MfConfig,
    pub evaluation: EvaluationConfig,
    pub runtime: RuntimeConfig,
}

/// Hyperparameters of the incremental matrix factorization model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfConfig {
    pub num_factors: usize,
    pub regularization: f32,
    pub learn_rate: f32,
    /// Multiplicative learn rate decay, applied after every epoch.
    pub decay: f32,
    pub num_iter: usize,
    pub init_mean: f32,
    pub init_std_dev: f32,
    pub update_users: bool,
    pub update_items: bool,
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Folds for cross-validation; values below 2 disable it.
    pub num_folds: usize,
    /// Share of the feedback held out when not cross-validating; 0 disables it.
    pub test_ratio: f64,
    pub candidate_items: CandidateItems,
    pub repeated_items: bool,
    pub predict_items_number: Option<usize>,
    pub show_fold_results: bool,
    pub online: bool,
    /// Evaluate every `find_iter` epochs; 0 disables the iteration search.
    pub find_iter: usize,
    pub max_iter: usize,
    pub epsilon: f64,
    pub cutoff: f64,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub workers: usize,
}

impl Default for MfConfig {
    fn default() -> Self {
        Self {
            num_factors: 10,
            regularization: 0.032,
            learn_rate: 0.31,
            decay: 1.0,
            num_iter: 30,
            init_mean: 0.0,
            init_std_dev: 0.1,
            update_users: true,
            update_items: true,
            random_seed: None,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            num_folds: 0,
            test_ratio: 0.0,
            candidate_items: CandidateItems::Union,
            repeated_items: false,
            predict_items_number: None,
            show_fold_results: false,
            online: false,
            find_iter: 0,
            max_iter: 500,
            epsilon: 0.0,
            cutoff: f64::MIN,
            measure: "AUC".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ONLINEREC").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.evaluation.validate()?;
        validation::validate_workers(self.runtime.workers)
    }
}

impl MfConfig {
    pub fn validate(&self) -> Result<()> {
        validation::validate_mf_config(self)
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        validation::validate_evaluation_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("onlinerec-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[model]\nnum_factors = 4\nlearn_rate = 0.05\n\n[evaluation]\nnum_folds = 3\ncandidate_items = \"overlap\""
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.model.num_factors, 4);
        assert_eq!(config.model.learn_rate, 0.05);
        assert_eq!(config.model.regularization, 0.032);
        assert_eq!(config.evaluation.num_folds, 3);
        assert_eq!(config.evaluation.candidate_items, CandidateItems::Overlap);
    }

    #[test]
    fn test_from_file_rejects_zero_factors() {
        let path = std::env::temp_dir().join(format!("onlinerec-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[model]\nnum_factors = 0\n").unwrap();
        let result = Config::from_file(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
