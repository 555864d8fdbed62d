//! Event Fusion
//!
//! Combines the camera classification stream with the latest serial
//! distance reading and drives the debounced hazard alert.
//!
//! The serial reader and the classification loop each own one
//! latest-value slot; they never wait on each other.

use camera_capture::CaptureError;
use thiserror::Error;

mod runner;
mod slot;
mod status;

pub use runner::{stop_channel, ClassificationLoop, LoopStats, StopHandle, StopSignal};
pub use slot::{DistanceFeed, Slot, SlotReader};
pub use status::{StatusFeed, StatusUpdate};

/// Fusion error types
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Frame capture failed: {0}")]
    Capture(#[from] CaptureError),
}
