use crate::error::{RecError, Result};
use ndarray::ArrayViewMut1;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// How freshly created factor rows are filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitializationMethod {
    Normal { mean: f32, std_dev: f32 },
    Constant { value: f32 },
}

impl InitializationMethod {
    pub fn normal(mean: f32, std_dev: f32) -> Self {
        InitializationMethod::Normal { mean, std_dev }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            InitializationMethod::Normal { mean, std_dev } => {
                if !mean.is_finite() {
                    return Err(RecError::invalid("init_mean", mean, "must be finite"));
                }
                if !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(RecError::invalid(
                        "init_std_dev",
                        std_dev,
                        "must be finite and non-negative",
                    ));
                }
            }
            InitializationMethod::Constant { value } => {
                if !value.is_finite() {
                    return Err(RecError::invalid("init_value", value, "must be finite"));
                }
            }
        }
        Ok(())
    }

    /// Fills `row` in place, one independent draw per entry.
    pub fn fill<R: Rng + ?Sized>(&self, mut row: ArrayViewMut1<f32>, rng: &mut R) -> Result<()> {
        match *self {
            InitializationMethod::Normal { mean, std_dev } => {
                let normal = Normal::new(mean, std_dev).map_err(|_| {
                    RecError::invalid("init_std_dev", std_dev, "must be finite and non-negative")
                })?;
                row.iter_mut().for_each(|x| *x = normal.sample(rng));
            }
            InitializationMethod::Constant { value } => row.fill(value),
        }
        Ok(())
    }
}
