//! Error types for the anomaly-lab crate

use thiserror::Error;

/// Result type alias for anomaly-lab operations
pub type Result<T> = std::result::Result<T, AnomalyLabError>;

/// Main error type for the anomaly-lab crate
#[derive(Error, Debug)]
pub enum AnomalyLabError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Scorer not fitted")]
    NotFitted,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Render error: {0}")]
    RenderError(String),
}

impl From<ndarray::ShapeError> for AnomalyLabError {
    fn from(err: ndarray::ShapeError) -> Self {
        AnomalyLabError::ShapeMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
