//! Error types for the mofcap pipeline

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, MofcapError>;

/// Errors that can occur in the mofcap pipeline
#[derive(Error, Debug)]
pub enum MofcapError {
    /// Data loading or validation error
    #[error("Data error: {0}")]
    DataError(String),

    /// Model training error
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Hyperparameter search error
    #[error("Search error: {0}")]
    SearchError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid shape error
    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    /// Column not found in dataframe
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Model is not fitted
    #[error("Model not fitted. Call fit() first")]
    ModelNotFitted,

    /// Invalid parameter error
    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// Numerical computation error
    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<polars::error::PolarsError> for MofcapError {
    fn from(err: polars::error::PolarsError) -> Self {
        MofcapError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for MofcapError {
    fn from(err: serde_json::Error) -> Self {
        MofcapError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MofcapError {
    fn from(err: ndarray::ShapeError) -> Self {
        MofcapError::ShapeError {
            expected: "valid array shape".to_string(),
            actual: err.to_string(),
        }
    }
}
