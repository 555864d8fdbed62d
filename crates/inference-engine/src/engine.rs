//! Frame classifier

use std::time::Instant;

use camera_capture::ImageFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    preprocess, ClassificationModel, ClassifierAdapter, InferenceError, PreprocessConfig,
    PreprocessError,
};

/// Label + confidence derived from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning class label
    pub label: String,
    /// Confidence in percent, rounded to two decimals
    pub confidence: f64,
    /// Sequence number of the source frame
    pub frame_sequence: u64,
    /// When the classification was made (milliseconds since epoch)
    pub timestamp_ms: u64,
}

/// Index and value of the largest probability; ties go to the lowest index
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, current)) if p <= current => {}
            _ => best = Some((idx, p)),
        }
    }
    best
}

/// `p * 100` rounded to two decimal places and kept within `[0, 100]`
fn to_percent(probability: f32) -> f64 {
    let percent = (probability as f64 * 100.0 * 100.0).round() / 100.0;
    percent.clamp(0.0, 100.0)
}

/// Preprocessor + classifier adapter + arg-max
pub struct FrameClassifier<M> {
    config: PreprocessConfig,
    adapter: ClassifierAdapter<M>,
}

impl<M: ClassificationModel> FrameClassifier<M> {
    /// Validate the preprocessing configuration against the model input
    pub fn new(config: PreprocessConfig, adapter: ClassifierAdapter<M>) -> Result<Self, PreprocessError> {
        config.validate()?;

        let produced = config.input_shape();
        let expected = adapter.model().input_shape();
        if produced != expected {
            return Err(PreprocessError::ShapeMismatch(format!(
                "preprocessing produces {:?}, model expects {:?}",
                produced, expected
            )));
        }

        info!(
            "Frame classifier ready: {}x{} {:?}, normalization {}",
            config.target_size, config.target_size, config.channel_mode, config.normalization
        );
        Ok(Self { config, adapter })
    }

    /// Classify one frame, consuming it
    pub fn classify(&self, frame: ImageFrame) -> Result<ClassificationResult, InferenceError> {
        let start = Instant::now();
        let frame_sequence = frame.sequence;

        let tensor = preprocess(frame, &self.config)?;
        let probabilities = self.adapter.probabilities(&tensor)?;
        drop(tensor);

        // probabilities is non-empty once the adapter accepted it
        let (index, probability) = argmax(&probabilities).unwrap_or((0, 0.0));

        let result = ClassificationResult {
            label: self.adapter.label_for(index),
            confidence: to_percent(probability),
            frame_sequence,
            timestamp_ms: now_ms(),
        };

        debug!(
            "Frame {} classified as {} ({:.2}%) in {}ms",
            frame_sequence,
            result.label,
            result.confidence,
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn adapter(&self) -> &ClassifierAdapter<M> {
        &self.adapter
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassifierError, MockModel};

    fn classifier(scores: Vec<f32>) -> FrameClassifier<MockModel> {
        let config = PreprocessConfig {
            target_size: 8,
            ..Default::default()
        };
        let model = MockModel::new(scores, config.input_shape());
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        FrameClassifier::new(config, ClassifierAdapter::new(model, labels)).unwrap()
    }

    #[test]
    fn test_argmax_tie_breaks_low() {
        assert_eq!(argmax(&[0.5, 0.5, 0.0]), Some((0, 0.5)));
        assert_eq!(argmax(&[0.1, 0.2, 0.2]), Some((1, 0.2)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_tied_probabilities_select_first_label() {
        let result = classifier(vec![0.5, 0.5, 0.0])
            .classify(ImageFrame::filled(16, 16, 3, 0, 4))
            .unwrap();

        assert_eq!(result.label, "A");
        assert_eq!(result.confidence, 50.0);
        assert_eq!(result.frame_sequence, 4);
    }

    #[test]
    fn test_confidence_rounded_to_two_decimals() {
        let result = classifier(vec![0.1, 0.901_234, 0.0])
            .classify(ImageFrame::filled(16, 16, 3, 0, 0))
            .unwrap();

        assert_eq!(result.label, "B");
        assert_eq!(result.confidence, 90.12);
    }

    #[test]
    fn test_point_nine_is_ninety_percent() {
        let result = classifier(vec![0.9, 0.1, 0.0])
            .classify(ImageFrame::filled(16, 16, 3, 0, 0))
            .unwrap();
        assert_eq!(result.confidence, 90.0);
    }

    #[test]
    fn test_nan_output_is_rejected() {
        let err = classifier(vec![0.9, f32::NAN, 0.0])
            .classify(ImageFrame::filled(16, 16, 3, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Classifier(ClassifierError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_model_shape_disagreement_is_config_error() {
        let config = PreprocessConfig::default();
        let model = MockModel::new(vec![1.0], [1, 32, 32, 3]);
        let result = FrameClassifier::new(config, ClassifierAdapter::new(model, vec![]));
        assert!(matches!(result, Err(PreprocessError::ShapeMismatch(_))));
    }
}
