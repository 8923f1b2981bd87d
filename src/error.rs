//! Error types for property valuation

use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before any model is invoked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Numeric field outside its allowed range (or not finite)
    #[error("{field} must be {bound}, got {value}")]
    OutOfRange {
        field: &'static str,
        bound: &'static str,
        value: f64,
    },

    /// Selection value outside its fixed set
    #[error("{field} must be one of [{expected}], got {value:?}")]
    UnknownCategory {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Bulk upload did not contain exactly one property
    #[error("upload must contain exactly one property, found {0} rows")]
    RowCount(usize),

    /// Bulk upload could not be parsed as CSV
    #[error("could not read uploaded CSV: {0}")]
    MalformedCsv(String),
}

/// Failure to turn a model file into a usable handle.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to load model from {}: {message}", path.display())]
    Runtime { path: PathBuf, message: String },

    /// The artifact does not accept a column of the property record
    #[error("model {} has no input named {column}", path.display())]
    SchemaMismatch { path: PathBuf, column: String },
}

/// Failure while invoking a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// No handle was loaded for this model
    #[error("{0} model unavailable")]
    ModelUnavailable(&'static str),

    #[error("{model} inference failed: {message}")]
    Runtime { model: String, message: String },

    #[error("{model} produced an unusable output: {message}")]
    InvalidOutput { model: String, message: String },
}

/// Any error an evaluation can end in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl ValuationError {
    /// Short machine-readable kind used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ValuationError::Validation(_) => "validation_error",
            ValuationError::Inference(InferenceError::ModelUnavailable(_)) => "model_unavailable",
            ValuationError::Inference(_) => "inference_error",
        }
    }

    /// Message suitable for showing to the person who submitted the form.
    pub fn user_message(&self) -> String {
        match self {
            ValuationError::Validation(e) => format!("Invalid input: {}", e),
            ValuationError::Inference(InferenceError::ModelUnavailable(_)) => {
                "Model not found. Please ensure models are in /models/".to_string()
            }
            ValuationError::Inference(e) => format!("Prediction failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let unavailable: ValuationError = InferenceError::ModelUnavailable("classifier").into();
        assert_eq!(unavailable.kind(), "model_unavailable");
        assert!(unavailable.user_message().contains("Model not found"));

        let invalid: ValuationError = ValidationError::RowCount(2).into();
        assert_eq!(invalid.kind(), "validation_error");
        assert_eq!(
            invalid.user_message(),
            "Invalid input: upload must contain exactly one property, found 2 rows"
        );
    }
}
