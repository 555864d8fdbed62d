//! Classification model backends

use std::path::Path;

use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::{ClassifierError, InputTensor};

/// An opaque trained model: tensor in, per-class scores out
pub trait ClassificationModel: Send {
    /// Input shape the model was loaded for
    fn input_shape(&self) -> [usize; 4];

    /// Run one forward pass
    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError>;
}

impl<M: ClassificationModel + ?Sized> ClassificationModel for Box<M> {
    fn input_shape(&self) -> [usize; 4] {
        (**self).input_shape()
    }

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        (**self).infer(input)
    }
}

/// ONNX model executed with tract
pub struct TractModel {
    plan: TypedRunnableModel<TypedModel>,
    input_shape: [usize; 4],
}

impl TractModel {
    /// Load and optimize an ONNX graph for a fixed input shape
    pub fn load(path: &Path, input_shape: [usize; 4]) -> Result<Self, ClassifierError> {
        info!(
            "Loading ONNX model from {} with input {:?}",
            path.display(),
            input_shape
        );

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(input_shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ClassifierError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        info!("Model loaded successfully");
        Ok(Self { plan, input_shape })
    }
}

impl ClassificationModel for TractModel {
    fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        let values = input.as_slice().ok_or_else(|| {
            ClassifierError::InferenceFailed("input tensor is not contiguous".to_string())
        })?;
        let tensor = Tensor::from_shape(&self.input_shape, values)
            .map_err(|e| ClassifierError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ClassifierError::InferenceFailed(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| ClassifierError::InferenceFailed("model produced no outputs".to_string()))?;
        let scores = first
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(e.to_string()))?;

        debug!("Model produced {} scores", scores.len());
        Ok(scores.iter().copied().collect())
    }
}

/// Fixed-output model for running without a trained network
pub struct MockModel {
    scores: Vec<f32>,
    input_shape: [usize; 4],
}

impl MockModel {
    pub fn new(scores: Vec<f32>, input_shape: [usize; 4]) -> Self {
        info!("Creating mock classification model");
        Self {
            scores,
            input_shape,
        }
    }

    /// Replace the scores returned by later calls
    pub fn set_scores(&mut self, scores: Vec<f32>) {
        self.scores = scores;
    }
}

impl ClassificationModel for MockModel {
    fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    fn infer(&self, _input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.scores.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_mock_returns_scores() {
        let mut model = MockModel::new(vec![0.1, 0.9], [1, 2, 2, 1]);
        let input = InputTensor::from_array(Array4::zeros((1, 2, 2, 1)));

        assert_eq!(model.infer(&input).unwrap(), vec![0.1, 0.9]);
        model.set_scores(vec![1.0]);
        assert_eq!(model.infer(&input).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_boxed_model_delegates() {
        let model: Box<dyn ClassificationModel> = Box::new(MockModel::new(vec![0.3], [1, 4, 4, 3]));
        let input = InputTensor::from_array(Array4::zeros((1, 4, 4, 3)));

        assert_eq!(model.input_shape(), [1, 4, 4, 3]);
        assert_eq!(model.infer(&input).unwrap(), vec![0.3]);
    }

    #[test]
    fn test_missing_onnx_file_fails_to_load() {
        let result = TractModel::load(Path::new("/nonexistent/model.onnx"), [1, 96, 96, 1]);
        assert!(matches!(result, Err(ClassifierError::ModelLoad(_))));
    }
}
