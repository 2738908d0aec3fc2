//! Error types for firesense

use thiserror::Error;

/// Result type alias for firesense operations
pub type Result<T> = std::result::Result<T, FireError>;

/// Main error type for the wildfire pipeline
#[derive(Error, Debug)]
pub enum FireError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not parse value for {feature}: {input:?}")]
    ParseError { feature: String, input: String },
}

impl From<polars::error::PolarsError> for FireError {
    fn from(err: polars::error::PolarsError) -> Self {
        FireError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FireError {
    fn from(err: serde_json::Error) -> Self {
        FireError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FireError {
    fn from(err: ndarray::ShapeError) -> Self {
        FireError::ShapeError {
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
        let err = FireError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FireError = io_err.into();
        assert!(matches!(err, FireError::IoError(_)));
    }

    #[test]
    fn test_parse_error_names_feature() {
        let err = FireError::ParseError {
            feature: "RH".to_string(),
            input: "abc".to_string(),
        };
        assert!(err.to_string().contains("RH"));
        assert!(err.to_string().contains("abc"));
    }
}
