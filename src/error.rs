use thiserror::Error;

/// Failures raised by the aggregators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("cohort is empty, nothing to rank against")]
    EmptyCohort,

    #[error("student not found in cohort: {0}")]
    NotFound(String),

    #[error("unknown team: {0}")]
    UnknownTeam(String),
}

/// Failures raised while loading a table from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("duplicate student {name:?} at line {line}")]
    DuplicateStudent { name: String, line: u64 },
}
