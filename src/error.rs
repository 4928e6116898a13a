use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecError>;

#[derive(Debug, Error)]
pub enum RecError {
    #[error("invalid configuration: {param} = {value} ({constraint})")]
    InvalidConfig {
        param: &'static str,
        value: String,
        constraint: &'static str,
    },

    #[error("{matrix} row {row} out of range (rows: {rows})")]
    RowOutOfRange {
        matrix: &'static str,
        row: usize,
        rows: usize,
    },

    #[error("factor column {col} out of range (num_factors: {num_factors})")]
    ColumnOutOfRange { col: usize, num_factors: usize },

    #[error("factor matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("fold {fold} failed: {source}")]
    FoldFailed {
        fold: usize,
        #[source]
        source: Box<RecError>,
    },

    #[error("metric '{metric}' missing from results of fold {fold}")]
    MissingMetric { metric: String, fold: usize },

    #[error("no results to aggregate")]
    NoResults,

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl RecError {
    pub(crate) fn invalid(
        param: &'static str,
        value: impl ToString,
        constraint: &'static str,
    ) -> Self {
        RecError::InvalidConfig {
            param,
            value: value.to_string(),
            constraint,
        }
    }
}
