//! Error types for the farecast pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for farecast operations
pub type Result<T> = std::result::Result<T, FarecastError>;

/// Main error type for the farecast pipeline
#[derive(Error, Debug)]
pub enum FarecastError {
    #[error("Data source missing: {0}")]
    DataSourceMissing(PathBuf),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("No trained models available for selection")]
    NoModelsAvailable,

    #[error("No model artifact loaded")]
    ModelNotLoaded,

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for FarecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        FarecastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FarecastError {
    fn from(err: serde_json::Error) -> Self {
        FarecastError::SerializationError(err.to_string())
    }
}
