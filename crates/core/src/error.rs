//! Error types for ragsync.
//!
//! A single error enum covers every failure class the synchronizer and the
//! query engine can hit. Each variant maps onto the status code reported at
//! the invocation boundary (see [`AppError::status_code`]).

use thiserror::Error;

/// Unified error type for ragsync.
///
/// All library functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid request fields and configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An expected blob or listing is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object store failures other than absence
    #[error("Store error: {0}")]
    Store(String),

    /// Embedding provider failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Generation provider failures
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector index failures (dimension mismatch, corrupt blob)
    #[error("Index error: {0}")]
    Index(String),

    /// Metadata ledger failures
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Status code reported for this error in an invocation response.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Config(_) => 400,
            AppError::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// Whether this error means the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Config("x".into()).status_code(), 400);
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::Index("x".into()).status_code(), 500);
        assert_eq!(AppError::Ledger("x".into()).status_code(), 500);
    }

    #[test]
    fn test_not_found_detection() {
        assert!(AppError::NotFound("index".into()).is_not_found());
        assert!(!AppError::Store("denied".into()).is_not_found());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
