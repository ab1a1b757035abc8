//! Error types shared by the loaders, the aggregation engine and the pipeline.

use thiserror::Error;

/// A source could not be read or does not match the expected schema.
///
/// Always fatal: the run aborts before any derived table is produced.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {source_name}")]
    NotFound { source_name: String },

    #[error("failed to read {source_name}: {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to fetch {source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("malformed CSV in {source_name}: {error}")]
    Csv {
        source_name: String,
        #[source]
        error: csv::Error,
    },

    #[error("{source_name} is missing required column `{column}`")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name} line {line}: `{column}` must be a whole number, got {value}")]
    NotWholeNumber {
        source_name: String,
        line: usize,
        column: String,
        value: f64,
    },

    #[error("{source_name} lists neighborhood `{neighborhood}` more than once")]
    DuplicateNeighborhood {
        source_name: String,
        neighborhood: String,
    },
}

/// An aggregation or projection referenced a column the input does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid column `{column}`")]
pub struct InvalidColumnError {
    pub column: String,
}

impl InvalidColumnError {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

/// Anything that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    InvalidColumn(#[from] InvalidColumnError),
}
