pub mod algorithms;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod utils;

pub use algorithms::{
    IncrementalItemRecommender, IncrementalMf, ItemRecommender, IterativeModel,
    TrainableRecommender,
};
pub use config::Config;
pub use error::{RecError, Result};
pub use models::*;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber; `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
