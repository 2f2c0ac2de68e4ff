use thiserror::Error;

/// Failures while reading statement or roster exports
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("pattern error: {0}")]
    Regex(#[from] regex::Error),
    #[error("invalid CSV format: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
