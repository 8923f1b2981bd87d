//! ONNX model loader

use crate::error::LoadError;
use crate::models::predictor::ModelKind;
use crate::types::property::FEATURE_NAMES;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Loaded ONNX pipeline with metadata
pub struct OnnxModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session (runs need exclusive access)
    pub session: Mutex<Session>,
    /// Declared inputs, one per record column
    pub inputs: Vec<(String, Option<TensorElementType>)>,
    /// Output holding the prediction
    pub output_name: String,
}

/// Loader for the valuation models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        // Later sessions fall back to the default environment if this fails
        if let Err(e) = ort::init().with_name("urbanvaluate").commit() {
            warn!(error = %e, "ONNX Runtime environment setup failed");
        } else {
            info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        }
        Self { onnx_threads }
    }

    /// Load one model file.
    ///
    /// Every failure is returned to the caller; nothing here panics or
    /// aborts the process.
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        kind: ModelKind,
    ) -> Result<OnnxModel, LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        info!(model = %kind, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| runtime_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| runtime_error(path, e))?
            .with_intra_threads(self.onnx_threads)
            .map_err(|e| runtime_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| runtime_error(path, e))?;

        let inputs: Vec<(String, Option<TensorElementType>)> = session
            .inputs
            .iter()
            .map(|i| (i.name.clone(), i.input_type.tensor_type()))
            .collect();

        // Pipelines exported from the training notebook take one input per column
        if let Some(missing) = FEATURE_NAMES
            .iter()
            .find(|column| !inputs.iter().any(|(name, _)| name == *column))
        {
            return Err(LoadError::SchemaMismatch {
                path: path.to_path_buf(),
                column: missing.to_string(),
            });
        }

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let output_name = pick_output(&output_names, kind).ok_or_else(|| LoadError::Runtime {
            path: path.to_path_buf(),
            message: "model declares no outputs".to_string(),
        })?;

        info!(
            model = %kind,
            inputs = inputs.len(),
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(OnnxModel {
            name: kind.as_str().to_string(),
            session: Mutex::new(session),
            inputs,
            output_name,
        })
    }

    /// Load a model, logging and discarding the error on failure.
    pub fn load_optional<P: AsRef<Path>>(&self, path: P, kind: ModelKind) -> Option<OnnxModel> {
        match self.load_model(path, kind) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(model = %kind, error = %e, "Model unavailable, continuing without it");
                None
            }
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

/// Output carrying the prediction: probabilities for the classifier, the
/// estimate for the regressor, never the label output if anything else exists
fn pick_output(names: &[&str], kind: ModelKind) -> Option<String> {
    let preferred = match kind {
        ModelKind::Classifier => names.iter().find(|n| n.contains("prob")),
        ModelKind::Regressor => names
            .iter()
            .find(|n| n.contains("variable") || n.contains("output")),
    };

    preferred
        .or_else(|| names.iter().find(|n| !n.contains("label")))
        .or_else(|| names.last())
        .map(|n| n.to_string())
}

fn runtime_error(path: &Path, err: impl std::fmt::Display) -> LoadError {
    LoadError::Runtime {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let loader = ModelLoader::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rf_classifier_pipeline.onnx");

        match loader.load_model(&path, ModelKind::Classifier) {
            Err(LoadError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_corrupt_file_is_runtime_error() {
        let loader = ModelLoader::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rf_regressor_pipeline.onnx");
        std::fs::write(&path, b"not an onnx model").unwrap();

        assert!(matches!(
            loader.load_model(&path, ModelKind::Regressor),
            Err(LoadError::Runtime { .. })
        ));
        assert!(loader.load_optional(&path, ModelKind::Regressor).is_none());
    }

    #[test]
    fn test_pick_output_for_classifier() {
        let names = ["output_label", "output_probability"];
        assert_eq!(
            pick_output(&names, ModelKind::Classifier).as_deref(),
            Some("output_probability")
        );

        // No probability output: anything but the label
        let names = ["label", "scores"];
        assert_eq!(
            pick_output(&names, ModelKind::Classifier).as_deref(),
            Some("scores")
        );
    }

    #[test]
    fn test_pick_output_for_regressor() {
        assert_eq!(
            pick_output(&["variable"], ModelKind::Regressor).as_deref(),
            Some("variable")
        );
        assert_eq!(
            pick_output(&["predictions"], ModelKind::Regressor).as_deref(),
            Some("predictions")
        );
        assert_eq!(pick_output(&[], ModelKind::Regressor), None);
    }
}
