//! Distance readings and link state

use serde::{Deserialize, Serialize};

/// One decoded distance announcement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceReading {
    /// Distance in centimetres (non-negative)
    pub distance_cm: f64,
    /// Decode time (milliseconds since epoch)
    pub timestamp_ms: u64,
}

impl DistanceReading {
    pub fn new(distance_cm: f64, timestamp_ms: u64) -> Self {
        Self {
            distance_cm,
            timestamp_ms,
        }
    }

    /// Reading stamped with the current wall-clock time
    pub fn now(distance_cm: f64) -> Self {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::new(distance_cm, timestamp_ms)
    }
}

/// State of the serial transport as seen by the reader
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
    Closed,
    Failed(String),
}

/// Where the reader delivers what it decodes
pub trait ReadingSink {
    /// Publish a freshly decoded reading
    fn publish(&self, reading: DistanceReading);

    /// Observe transport state changes
    fn link_changed(&self, _state: LinkState) {}
}
