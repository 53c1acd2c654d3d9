//! Error types for the decision engine

use thiserror::Error;

/// Decision engine error
#[derive(Debug, Error)]
pub enum Error {
    /// User history violates a precondition (e.g. non-positive average amount)
    #[error("Invalid history: {0}")]
    InvalidHistory(String),

    /// Transaction violates a precondition (e.g. non-positive amount)
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Record not found in a store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// True for precondition failures on caller-supplied input
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidHistory(_) | Error::InvalidTransaction(_))
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
