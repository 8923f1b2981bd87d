//! ML model loading and inference components

pub mod inference;
pub mod loader;
pub mod predictor;

pub use inference::{InferenceEngine, ModelHandle};
pub use loader::{ModelLoader, OnnxModel};
pub use predictor::{ModelKind, Predictor};
