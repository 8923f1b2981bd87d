//! Model abstraction shared by the loader and the inference engine

use crate::error::InferenceError;
use crate::types::property::PropertyRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two artifacts a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Favourable-investment probability
    Classifier,
    /// Price estimate
    Regressor,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Classifier => "classifier",
            ModelKind::Regressor => "regressor",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded prediction artifact.
///
/// Implementations are read-only after construction and may be shared
/// between concurrent evaluations.
pub trait Predictor: Send + Sync {
    /// Model name for logs and metrics
    fn name(&self) -> &str;

    /// Probability of the positive class for one record.
    fn predict_proba(&self, record: &PropertyRecord) -> Result<f64, InferenceError>;

    /// Raw scalar prediction for one record.
    fn predict(&self, record: &PropertyRecord) -> Result<f64, InferenceError>;
}
