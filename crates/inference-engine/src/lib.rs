//! Frame Classification Engine
//!
//! Preprocesses camera frames, runs them through an opaque classification
//! model (ONNX via tract, or a mock) and reduces the probabilities to a
//! label + confidence pair.

mod classifier;
mod engine;
mod metadata;
mod model;
mod preprocess;

pub use classifier::ClassifierAdapter;
pub use engine::{argmax, ClassificationResult, FrameClassifier};
pub use metadata::{ModelMetadata, DEFAULT_LABELS};
pub use model::{ClassificationModel, MockModel, TractModel};
pub use preprocess::{
    preprocess, ChannelMode, InputTensor, Normalization, PreprocessConfig, DEFAULT_INPUT_SIZE,
};

use thiserror::Error;

/// Configuration errors raised while building the model input
#[derive(Debug, Clone, Error)]
pub enum PreprocessError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Unsupported channel mode: {0}")]
    UnsupportedChannelMode(String),
}

/// Errors raised by the classifier adapter
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
}

/// Errors during one classification tick
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}
