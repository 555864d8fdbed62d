//! Alert actuators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Plays/stops the alert signal. Called on state machine edges only.
pub trait AlertActuator: Send {
    fn start_alert(&mut self);
    fn stop_alert(&mut self);
}

impl<A: AlertActuator + ?Sized> AlertActuator for Box<A> {
    fn start_alert(&mut self) {
        (**self).start_alert();
    }

    fn stop_alert(&mut self) {
        (**self).stop_alert();
    }
}

/// Announces alerts through the log
#[derive(Debug)]
pub struct LogActuator {
    message: String,
    active: bool,
}

impl LogActuator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for LogActuator {
    fn default() -> Self {
        Self::new("Pedestrian close by!")
    }
}

impl AlertActuator for LogActuator {
    fn start_alert(&mut self) {
        if !self.active {
            warn!("ALERT: {}", self.message);
            self.active = true;
        }
    }

    fn stop_alert(&mut self) {
        if self.active {
            info!("Alert cleared");
            self.active = false;
        }
    }
}

/// Counts actuator calls; clones share the counters
#[derive(Debug, Clone, Default)]
pub struct CountingActuator {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl CountingActuator {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AlertActuator for CountingActuator {
    fn start_alert(&mut self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_alert(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
