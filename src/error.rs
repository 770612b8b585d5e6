use crate::commands::oracle::OracleError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the scoring and aggregation pipeline.
///
/// An unparseable oracle response is not represented here: it is recorded as
/// the sentinel quantity and reported as a warning.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Oracle call failed for file_id={file_id} ({filepath}), metric={metric}: {source}")]
    Oracle {
        file_id: String,
        filepath: String,
        metric: String,
        #[source]
        source: OracleError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
