//! Classifier and regressor inference for property records

use crate::config::ModelsConfig;
use crate::error::InferenceError;
use crate::models::loader::{ModelLoader, OnnxModel};
use crate::models::predictor::{ModelKind, Predictor};
use crate::types::property::{FeatureValue, PropertyRecord};
use ort::memory::Allocator;
use ort::session::SessionOutputs;
use ort::tensor::TensorElementType;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to a loaded model; `None` when it could not be loaded
pub type ModelHandle = Option<Arc<dyn Predictor>>;

/// Inference engine holding the two valuation models.
///
/// Either model may be missing. Callers get
/// [`InferenceError::ModelUnavailable`] for a missing model and can keep
/// going with whatever does not depend on it.
pub struct InferenceEngine {
    classifier: ModelHandle,
    regressor: ModelHandle,
}

impl InferenceEngine {
    /// Load both models from the configured directory
    pub fn new(config: &ModelsConfig) -> Self {
        let loader = ModelLoader::with_threads(config.onnx_threads);
        let dir = Path::new(&config.models_dir);

        let classifier = loader
            .load_optional(dir.join(&config.classifier_file), ModelKind::Classifier)
            .map(|m| Arc::new(m) as Arc<dyn Predictor>);
        let regressor = loader
            .load_optional(dir.join(&config.regressor_file), ModelKind::Regressor)
            .map(|m| Arc::new(m) as Arc<dyn Predictor>);

        let engine = Self::with_models(classifier, regressor);
        info!(
            classifier = engine.has_classifier(),
            regressor = engine.has_regressor(),
            models_dir = %config.models_dir,
            "Inference engine initialized"
        );
        engine
    }

    /// Create an engine from already loaded handles
    pub fn with_models(classifier: ModelHandle, regressor: ModelHandle) -> Self {
        Self {
            classifier,
            regressor,
        }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn has_regressor(&self) -> bool {
        self.regressor.is_some()
    }

    /// Get loaded model names
    pub fn model_names(&self) -> Vec<String> {
        [&self.classifier, &self.regressor]
            .into_iter()
            .flatten()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Probability that the property is a favourable investment.
    pub fn classify(&self, record: &PropertyRecord) -> Result<f64, InferenceError> {
        let model = self
            .classifier
            .as_ref()
            .ok_or(InferenceError::ModelUnavailable(ModelKind::Classifier.as_str()))?;

        let probability = model.predict_proba(record)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidOutput {
                model: model.name().to_string(),
                message: format!("probability {} outside [0, 1]", probability),
            });
        }

        debug!(model = %model.name(), probability = probability, "Classification complete");
        Ok(probability)
    }

    /// Model-driven price estimate, in the units the regressor was trained on.
    pub fn regress(&self, record: &PropertyRecord) -> Result<f64, InferenceError> {
        let model = self
            .regressor
            .as_ref()
            .ok_or(InferenceError::ModelUnavailable(ModelKind::Regressor.as_str()))?;

        let estimate = model.predict(record)?;
        if !estimate.is_finite() {
            return Err(InferenceError::InvalidOutput {
                model: model.name().to_string(),
                message: format!("estimate {} is not finite", estimate),
            });
        }

        debug!(model = %model.name(), estimate = estimate, "Regression complete");
        Ok(estimate)
    }
}

impl Predictor for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, record: &PropertyRecord) -> Result<f64, InferenceError> {
        let inputs = self.build_inputs(record)?;
        let mut session = self.session.lock().map_err(|e| self.runtime(e))?;
        let outputs = session.run(inputs).map_err(|e| self.runtime(e))?;

        self.extract_probability(&outputs)
    }

    fn predict(&self, record: &PropertyRecord) -> Result<f64, InferenceError> {
        let inputs = self.build_inputs(record)?;
        let mut session = self.session.lock().map_err(|e| self.runtime(e))?;
        let outputs = session.run(inputs).map_err(|e| self.runtime(e))?;

        self.extract_estimate(&outputs)
    }
}

impl OnnxModel {
    /// One `[1, 1]` tensor per record column, typed as the model declares it
    fn build_inputs(
        &self,
        record: &PropertyRecord,
    ) -> Result<Vec<(String, DynValue)>, InferenceError> {
        record
            .columns()
            .into_iter()
            .map(|(column, value)| {
                let declared = self
                    .inputs
                    .iter()
                    .find(|(name, _)| name == column)
                    .and_then(|(_, ty)| *ty)
                    .ok_or_else(|| self.runtime(format!("no tensor input named {}", column)))?;

                let tensor = column_tensor(value, declared)
                    .map_err(|e| self.runtime(format!("column {}: {}", column, e)))?;
                Ok((column.to_string(), tensor))
            })
            .collect()
    }

    /// Extract positive-class probability from model output.
    /// Handles both tensor outputs and seq(map) outputs from ZipMap.
    fn extract_probability(&self, outputs: &SessionOutputs) -> Result<f64, InferenceError> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            let dtype = output.dtype();

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                return positive_class_from_tensor(&dims, data).ok_or_else(|| {
                    self.invalid_output(&format!("unexpected probability shape {:?}", dims))
                });
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                return self.extract_from_sequence_map(output);
            }
        }

        // Fallback: first non-label output that yields a probability
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }

            let dtype = output.dtype();

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                if let Some(prob) = positive_class_from_tensor(&dims, data) {
                    debug!(model = %self.name, output = %name, "Extracted probability from fallback output");
                    return Ok(prob);
                }
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(prob) = self.extract_from_sequence_map(&output) {
                    return Ok(prob);
                }
            }
        }

        Err(self.invalid_output("no probability output found"))
    }

    /// Extract probability from seq(map(int64, float)) or seq(map(string, float))
    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<f64, InferenceError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| self.runtime(e))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| self.runtime(e))?;

        // Batch size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| self.invalid_output("empty probability sequence"))?;

        let probability = match map_value.try_extract_key_values::<i64, f32>() {
            Ok(kv_pairs) => positive_class_from_ids(&kv_pairs),
            // String class labels
            Err(_) => {
                let kv_pairs = map_value
                    .try_extract_key_values::<String, f32>()
                    .map_err(|e| self.runtime(e))?;
                positive_class_from_labels(kv_pairs)
            }
        };

        probability.ok_or_else(|| self.invalid_output("no class probability in map"))
    }

    /// Regressors emit a `[1, 1]` float tensor
    fn extract_estimate(&self, outputs: &SessionOutputs) -> Result<f64, InferenceError> {
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| self.invalid_output("prediction output missing"))?;

        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            if let Some(v) = data.first() {
                return Ok(*v as f64);
            }
        }

        if let Ok((_, data)) = output.try_extract_tensor::<f64>() {
            if let Some(v) = data.first() {
                return Ok(*v);
            }
        }

        warn!(model = %self.name, output = %self.output_name, "Regressor output is not a float tensor");
        Err(self.invalid_output("prediction is not a float tensor"))
    }

    fn runtime(&self, err: impl std::fmt::Display) -> InferenceError {
        InferenceError::Runtime {
            model: self.name.clone(),
            message: err.to_string(),
        }
    }

    fn invalid_output(&self, message: &str) -> InferenceError {
        InferenceError::InvalidOutput {
            model: self.name.clone(),
            message: message.to_string(),
        }
    }
}

/// `[1, 1]` tensor holding one column value in the model's declared type
fn column_tensor(value: FeatureValue<'_>, declared: TensorElementType) -> Result<DynValue, String> {
    let shape = vec![1_i64, 1];

    let tensor = match (value, declared) {
        (FeatureValue::Text(text), TensorElementType::String) => {
            Tensor::from_string_array((shape, &[text.to_string()][..])).map(|t| t.into_dyn())
        }
        (FeatureValue::Float(v), TensorElementType::Float32) => {
            Tensor::from_array((shape, vec![v as f32])).map(|t| t.into_dyn())
        }
        (FeatureValue::Float(v), TensorElementType::Float64) => {
            Tensor::from_array((shape, vec![v])).map(|t| t.into_dyn())
        }
        (FeatureValue::Integer(v), TensorElementType::Int64) => {
            Tensor::from_array((shape, vec![v])).map(|t| t.into_dyn())
        }
        (FeatureValue::Integer(v), TensorElementType::Float32) => {
            Tensor::from_array((shape, vec![v as f32])).map(|t| t.into_dyn())
        }
        (FeatureValue::Integer(v), TensorElementType::Float64) => {
            Tensor::from_array((shape, vec![v as f64])).map(|t| t.into_dyn())
        }
        (value, declared) => {
            return Err(format!("holds {:?} but the model expects {:?}", value, declared))
        }
    };

    tensor.map_err(|e| e.to_string())
}

/// Positive-class probability from a `[batch, n_classes]` (or `[n_classes]`) tensor
fn positive_class_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let num_classes = dims.last().copied().unwrap_or(0);

    match (num_classes, data) {
        // [batch, 2] or [2] - positive class at index 1
        (n, [_, positive, ..]) if n >= 2 => Some(*positive as f64),
        // [batch, 1] - single probability
        (1, [prob, ..]) => Some(*prob as f64),
        _ => None,
    }
}

/// Class 1 from an integer-keyed ZipMap, or the complement of class 0
fn positive_class_from_ids(kv_pairs: &[(i64, f32)]) -> Option<f64> {
    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Some(*prob as f64);
    }

    kv_pairs
        .iter()
        .find(|(class_id, _)| *class_id == 0)
        .map(|(_, prob)| 1.0 - *prob as f64)
}

/// Second class in sorted label order, matching the training column order
fn positive_class_from_labels(mut kv_pairs: Vec<(String, f32)>) -> Option<f64> {
    kv_pairs.sort_by(|a, b| a.0.cmp(&b.0));
    kv_pairs.get(1).map(|(_, prob)| *prob as f64)
}
