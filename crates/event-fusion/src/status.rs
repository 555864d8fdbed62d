//! Per-tick status for presentation

use std::fmt;

use alerting::AlertPhase;
use serde::{Deserialize, Serialize};

use crate::SlotReader;

/// Snapshot published once per classification tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Tick counter since the loop started
    pub tick: u64,
    /// Latest classification label
    pub label: Option<String>,
    /// Its confidence in percent
    pub confidence: Option<f64>,
    /// Latest distance in centimetres
    pub distance_cm: Option<f64>,
    /// Alert state after this tick
    pub alert_phase: AlertPhase,
    /// Milliseconds since epoch
    pub timestamp_ms: u64,
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}", label)?,
            None => write!(f, "--")?,
        }
        match self.distance_cm {
            Some(d) => write!(f, " - {:.1}cm", d)?,
            None => write!(f, " - --cm")?,
        }
        match self.confidence {
            Some(c) => write!(f, " - Confidence: {:.2}%", c)?,
            None => write!(f, " - Confidence: --")?,
        }
        if self.alert_phase == AlertPhase::Active {
            write!(f, " [ALERT]")?;
        }
        Ok(())
    }
}

/// Restartable subscription to status updates.
///
/// Presentation samples the latest update; updates it does not get to are
/// dropped.
pub type StatusFeed = SlotReader<StatusUpdate>;

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> StatusUpdate {
        StatusUpdate {
            tick: 3,
            label: Some("Pedestre".to_string()),
            confidence: Some(93.456),
            distance_cm: Some(12.34),
            alert_phase: AlertPhase::Active,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_display_line() {
        assert_eq!(
            update().to_string(),
            "Pedestre - 12.3cm - Confidence: 93.46% [ALERT]"
        );
    }

    #[test]
    fn test_display_before_readings() {
        let status = StatusUpdate {
            label: None,
            confidence: None,
            distance_cm: None,
            alert_phase: AlertPhase::Idle,
            ..update()
        };
        assert_eq!(status.to_string(), "-- - --cm - Confidence: --");
    }

    #[test]
    fn test_serializes_phase_in_snake_case() {
        let json = serde_json::to_value(update()).unwrap();
        assert_eq!(json["alert_phase"], "active");
        assert_eq!(json["label"], "Pedestre");
    }
}
