//! Error types for the demand_forecast crate

use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No transactions were supplied at all
    #[error("Empty input: no transactions to forecast from")]
    EmptyInput,

    /// Too few clean data points for a specific trainer
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Numerical non-convergence or other training failure
    #[error("Model training error: {0}")]
    ModelTraining(String),

    /// Evaluation is impossible, typically an empty test partition
    #[error("Evaluation unavailable: {0}")]
    EvaluationUnavailable(String),

    /// Error from invalid caller-supplied parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error serializing a forecast result
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
