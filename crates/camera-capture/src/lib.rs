//! Camera Capture Library
//!
//! Frame types and the capture-side interface consumed by the
//! classification loop. The live device driver is an external collaborator;
//! this crate ships a still-image source and a synthetic source so the
//! pipeline can run without one.

pub mod frame;
pub mod source;

pub use frame::ImageFrame;
pub use source::{open_source, DynFrameSource, FrameSource, StillImageSource, SyntheticSource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture device unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid frame format: {0}")]
    Format(String),

    #[error("Capture stream closed")]
    Closed,
}

impl CaptureError {
    /// Whether the source can still deliver frames after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CaptureError::Format(_))
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Still image replayed as the video feed; synthetic frames when unset
    pub image_path: Option<PathBuf>,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Channels per pixel
    pub channels: u8,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            width: 640,
            height: 480,
            channels: 3,
            fps: 15,
        }
    }
}
