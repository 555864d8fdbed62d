//! Model metadata and label list

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ChannelMode, ClassifierError, PreprocessConfig};

/// Labels used when the model ships without a metadata file
pub const DEFAULT_LABELS: [&str; 3] = ["Pedestre", "Sem Pedestre", "Carro"];

/// Optional `metadata.json` stored next to an exported model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    /// Ordered class labels
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    /// Whether the model was trained on grayscale input
    #[serde(default)]
    pub grayscale: Option<bool>,
    /// Square input size the model was trained on
    #[serde(default)]
    pub image_size: Option<u32>,
}

impl ModelMetadata {
    /// Read metadata from `path`; a missing or unreadable file yields defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(meta) => {
                info!("Loaded model metadata from {}", path.display());
                meta
            }
            Err(e) => {
                warn!("Model metadata not found, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Read and parse metadata from `path`
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClassifierError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ClassifierError> {
        serde_json::from_str(text).map_err(|e| ClassifierError::ModelLoad(e.to_string()))
    }

    /// Label list, falling back to [`DEFAULT_LABELS`]
    pub fn labels(&self) -> Vec<String> {
        match &self.labels {
            Some(labels) if !labels.is_empty() => labels.clone(),
            _ => DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Let the metadata override input size and channel mode
    pub fn apply_to(&self, config: &mut PreprocessConfig) {
        if let Some(size) = self.image_size {
            config.target_size = size;
        }
        if let Some(grayscale) = self.grayscale {
            config.channel_mode = if grayscale {
                ChannelMode::Grayscale
            } else {
                ChannelMode::Rgb
            };
        }
    }
}
