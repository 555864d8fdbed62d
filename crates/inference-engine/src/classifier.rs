//! Classifier adapter

use tracing::debug;

use crate::{ClassificationModel, ClassifierError, InputTensor};

/// Wraps a model and its label list, guarding the model's contract
pub struct ClassifierAdapter<M> {
    model: M,
    labels: Vec<String>,
}

impl<M: ClassificationModel> ClassifierAdapter<M> {
    pub fn new(model: M, labels: Vec<String>) -> Self {
        debug!("Classifier adapter with {} labels", labels.len());
        Self { model, labels }
    }

    /// Per-class probabilities for one input tensor.
    ///
    /// Fails with `InvalidOutput` when any probability is NaN so that the
    /// result never reaches the caller as a usable classification.
    pub fn probabilities(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        let expected = self.model.input_shape();
        if input.shape() != expected {
            return Err(ClassifierError::InferenceFailed(format!(
                "input shape {:?} does not match model input {:?}",
                input.shape(),
                expected
            )));
        }

        let probabilities = self.model.infer(input)?;

        if probabilities.is_empty() {
            return Err(ClassifierError::InferenceFailed(
                "model returned no probabilities".to_string(),
            ));
        }
        if let Some(idx) = probabilities.iter().position(|p| p.is_nan()) {
            return Err(ClassifierError::InvalidOutput(format!(
                "probability {} is NaN",
                idx
            )));
        }

        Ok(probabilities)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label for a class index; unnamed indices become `Class <i>`
    pub fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Class {}", index))
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockModel;
    use ndarray::Array4;

    fn input() -> InputTensor {
        InputTensor::from_array(Array4::zeros((1, 4, 4, 1)))
    }

    fn adapter(scores: Vec<f32>) -> ClassifierAdapter<MockModel> {
        ClassifierAdapter::new(
            MockModel::new(scores, [1, 4, 4, 1]),
            vec!["A".into(), "B".into()],
        )
    }

    #[test]
    fn test_nan_is_invalid_output() {
        let err = adapter(vec![0.2, f32::NAN]).probabilities(&input()).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidOutput(_)));
    }

    #[test]
    fn test_shape_disagreement_fails() {
        let wrong = InputTensor::from_array(Array4::zeros((1, 8, 8, 1)));
        let err = adapter(vec![1.0, 0.0]).probabilities(&wrong).unwrap_err();
        assert!(matches!(err, ClassifierError::InferenceFailed(_)));
    }

    #[test]
    fn test_empty_output_fails() {
        let err = adapter(vec![]).probabilities(&input()).unwrap_err();
        assert!(matches!(err, ClassifierError::InferenceFailed(_)));
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let adapter = adapter(vec![0.3, 0.7]);
        for _ in 0..3 {
            assert_eq!(adapter.probabilities(&input()).unwrap(), vec![0.3, 0.7]);
        }
    }

    #[test]
    fn test_label_fallback() {
        let adapter = adapter(vec![1.0]);
        assert_eq!(adapter.label_for(1), "B");
        assert_eq!(adapter.label_for(5), "Class 5");
    }
}
