//! Classification loop
//!
//! Pulls frames, classifies them, publishes the latest classification and
//! evaluates the alert state machine against the latest distance. Frame
//! acquisition is the only suspension point, and the only place the stop
//! signal can interrupt.

use std::sync::Arc;

use alerting::{AlertActuator, AlertStateMachine, HazardInput};
use camera_capture::{FrameSource, ImageFrame};
use inference_engine::{ClassificationModel, ClassificationResult, FrameClassifier};
use serde::Serialize;
use serial_distance::DistanceReading;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{FusionError, Slot, SlotReader, StatusFeed, StatusUpdate};

/// Requests the loop to stop; clones share the signal
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observed by the loop
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once stop is requested. Never resolves if every handle is
    /// dropped without stopping.
    pub async fn stopped(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected stop handle / signal pair
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

/// Loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// Frames processed
    pub ticks: u64,
    /// Frames that produced a classification
    pub classified: u64,
    /// Frames whose preprocessing or inference failed
    pub inference_failures: u64,
    /// Recoverable capture errors
    pub capture_errors: u64,
}

/// The classification loop and the state it owns
pub struct ClassificationLoop<S, M, A> {
    source: S,
    classifier: FrameClassifier<M>,
    machine: AlertStateMachine,
    actuator: A,
    distance: SlotReader<DistanceReading>,
    classification: Slot<ClassificationResult>,
    status: Slot<StatusUpdate>,
    stats: LoopStats,
}

impl<S, M, A> ClassificationLoop<S, M, A>
where
    S: FrameSource,
    M: ClassificationModel,
    A: AlertActuator,
{
    pub fn new(
        source: S,
        classifier: FrameClassifier<M>,
        machine: AlertStateMachine,
        actuator: A,
        distance: SlotReader<DistanceReading>,
    ) -> Self {
        Self {
            source,
            classifier,
            machine,
            actuator,
            distance,
            classification: Slot::new(),
            status: Slot::new(),
            stats: LoopStats::default(),
        }
    }

    /// Reader of the latest-classification slot
    pub fn classification(&self) -> SlotReader<ClassificationResult> {
        self.classification.reader()
    }

    /// Subscribe to per-tick status updates
    pub fn status(&self) -> StatusFeed {
        self.status.reader()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run until stopped or the capture source fails.
    ///
    /// On every exit path the alert is forced off.
    pub async fn run(&mut self, mut stop: StopSignal) -> Result<LoopStats, FusionError> {
        info!("Starting classification loop");

        let outcome = loop {
            if stop.is_stopped() {
                break Ok(());
            }

            let next = tokio::select! {
                biased;
                _ = stop.stopped() => None,
                frame = self.source.next_frame() => Some(frame),
            };
            let Some(frame) = next else {
                break Ok(());
            };

            match frame {
                Ok(frame) => self.tick(frame),
                Err(e) if e.is_fatal() => {
                    error!("Capture failed, stopping classification: {}", e);
                    break Err(FusionError::Capture(e));
                }
                Err(e) => {
                    self.stats.capture_errors += 1;
                    warn!("Skipping frame: {}", e);
                }
            }
        };

        self.halt();
        info!(
            "Classification loop stopped after {} ticks ({} failed)",
            self.stats.ticks, self.stats.inference_failures
        );
        outcome.map(|()| self.stats)
    }

    fn tick(&mut self, frame: ImageFrame) {
        self.stats.ticks += 1;

        match self.classifier.classify(frame) {
            Ok(result) => {
                self.stats.classified += 1;
                self.classification.publish(result);
            }
            Err(e) => {
                self.stats.inference_failures += 1;
                warn!("Classification failed: {}", e);
            }
        }

        self.evaluate();
    }

    fn evaluate(&mut self) {
        let classification = self.classification.latest();
        let distance = self.distance.latest();
        let input = HazardInput {
            label: classification.as_ref().map(|c| c.label.as_str()),
            confidence: classification.as_ref().map_or(0.0, |c| c.confidence),
            distance_cm: distance.map(|d| d.distance_cm),
        };

        let now = tokio::time::Instant::now().into_std();
        self.machine.step(&input, now, &mut self.actuator);

        let update = self.snapshot(classification, distance);
        debug!("{}", update);
        self.status.publish(update);
    }

    /// Force the alert off and publish the final state
    fn halt(&mut self) {
        self.machine.force_idle(&mut self.actuator);
        let update = self.snapshot(self.classification.latest(), self.distance.latest());
        self.status.publish(update);
    }

    fn snapshot(
        &self,
        classification: Option<ClassificationResult>,
        distance: Option<DistanceReading>,
    ) -> StatusUpdate {
        StatusUpdate {
            tick: self.stats.ticks,
            confidence: classification.as_ref().map(|c| c.confidence),
            label: classification.map(|c| c.label),
            distance_cm: distance.map(|d| d.distance_cm),
            alert_phase: self.machine.phase(),
            timestamp_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
