use crate::config::{EvaluationConfig, MfConfig};
use crate::error::{RecError, Result};

pub fn validate_mf_config(config: &MfConfig) -> Result<()> {
    if config.num_factors == 0 {
        return Err(RecError::invalid("num_factors", config.num_factors, "must be greater than 0"));
    }

    if !config.learn_rate.is_finite() || config.learn_rate <= 0.0 {
        return Err(RecError::invalid(
            "learn_rate",
            config.learn_rate,
            "must be finite and positive",
        ));
    }

    if !config.regularization.is_finite() || config.regularization < 0.0 {
        return Err(RecError::invalid(
            "regularization",
            config.regularization,
            "must be finite and non-negative",
        ));
    }

    if !config.decay.is_finite() || config.decay <= 0.0 {
        return Err(RecError::invalid("decay", config.decay, "must be finite and positive"));
    }

    if !config.init_mean.is_finite() {
        return Err(RecError::invalid("init_mean", config.init_mean, "must be finite"));
    }

    if !config.init_std_dev.is_finite() || config.init_std_dev < 0.0 {
        return Err(RecError::invalid(
            "init_std_dev",
            config.init_std_dev,
            "must be finite and non-negative",
        ));
    }

    Ok(())
}

pub fn validate_evaluation_config(config: &EvaluationConfig) -> Result<()> {
    if config.num_folds == 1 {
        return Err(RecError::invalid("num_folds", 1, "must be 0 (disabled) or at least 2"));
    }

    validate_test_ratio(config.test_ratio, true)?;

    if config.max_iter > 0 && config.find_iter > config.max_iter {
        return Err(RecError::invalid(
            "find_iter",
            config.find_iter,
            "must not exceed max_iter",
        ));
    }

    if !config.epsilon.is_finite() || config.epsilon < 0.0 {
        return Err(RecError::invalid("epsilon", config.epsilon, "must be finite and non-negative"));
    }

    if config.measure.is_empty() {
        return Err(RecError::invalid("measure", "''", "must name a metric"));
    }

    Ok(())
}

pub fn validate_num_folds(num_folds: usize) -> Result<()> {
    if num_folds < 2 {
        return Err(RecError::invalid("num_folds", num_folds, "must be at least 2"));
    }
    Ok(())
}

/// Ratios must lie in (0, 1); `allow_zero` accepts 0 as "disabled".
pub fn validate_test_ratio(ratio: f64, allow_zero: bool) -> Result<()> {
    if allow_zero && ratio == 0.0 {
        return Ok(());
    }
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(RecError::invalid("test_ratio", ratio, "must be in (0, 1)"));
    }
    Ok(())
}

pub fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(RecError::invalid("workers", workers, "must be greater than 0"));
    }
    Ok(())
}
