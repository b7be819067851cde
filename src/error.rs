//! Error types for ml-primer

use thiserror::Error;

/// Result type alias for ml-primer operations
pub type Result<T> = std::result::Result<T, PrimerError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum PrimerError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<csv::Error> for PrimerError {
    fn from(err: csv::Error) -> Self {
        PrimerError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PrimerError {
    fn from(err: serde_json::Error) -> Self {
        PrimerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PrimerError {
    fn from(err: ndarray::ShapeError) -> Self {
        PrimerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrimerError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");

        let err = PrimerError::UnknownLabel("setosa".to_string());
        assert_eq!(err.to_string(), "Unknown label: setosa");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PrimerError = io_err.into();
        assert!(matches!(err, PrimerError::IoError(_)));
    }

    #[test]
    fn test_error_from_shape() {
        let shape_err = ndarray::Array2::<f64>::from_shape_vec((2, 2), vec![1.0]).unwrap_err();
        let err: PrimerError = shape_err.into();
        assert!(matches!(err, PrimerError::ShapeError { .. }));
    }
}
