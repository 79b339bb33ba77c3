use crate::analyzer::AnalyzerError;
use crate::fingerprint::{IndexError, SnapshotError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AnalyzerUnavailable(String),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),
}

impl From<AnalyzerError> for AppError {
    fn from(err: AnalyzerError) -> Self {
        AppError::AnalyzerUnavailable(err.to_string())
    }
}
