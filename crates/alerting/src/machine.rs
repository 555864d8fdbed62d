//! Alert State Machine

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::AlertActuator;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Classifier label that counts as a hazard
    pub hazard_label: String,
    /// Minimum confidence in percent (inclusive, default: 90)
    pub confidence_threshold: f64,
    /// Distance below which the hazard is close (cm, exclusive, default: 20)
    pub distance_threshold_cm: f64,
    /// How long the hazard must hold before alerting (ms, 0 = immediately)
    pub confirm_delay_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            hazard_label: "Pedestre".to_string(),
            confidence_threshold: 90.0,
            distance_threshold_cm: 20.0,
            confirm_delay_ms: 2000,
        }
    }
}

impl AlertConfig {
    /// Fire on the first tick the hazard holds
    pub fn immediate() -> Self {
        Self {
            confirm_delay_ms: 0,
            ..Default::default()
        }
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}

/// Latest readings the criterion is evaluated against
#[derive(Debug, Clone, Copy, Default)]
pub struct HazardInput<'a> {
    /// Latest classification label, if any
    pub label: Option<&'a str>,
    /// Its confidence in percent
    pub confidence: f64,
    /// Latest distance; `None` until the first reading arrives
    pub distance_cm: Option<f64>,
}

impl<'a> HazardInput<'a> {
    pub fn new(label: &'a str, confidence: f64, distance_cm: f64) -> Self {
        Self {
            label: Some(label),
            confidence,
            distance_cm: Some(distance_cm),
        }
    }
}

/// `label == hazard AND confidence >= threshold AND distance < threshold`.
///
/// An unknown distance counts as infinitely far.
pub fn hazard_criterion(config: &AlertConfig, input: &HazardInput<'_>) -> bool {
    let Some(label) = input.label else {
        return false;
    };
    let distance = input.distance_cm.unwrap_or(f64::INFINITY);

    label == config.hazard_label
        && input.confidence >= config.confidence_threshold
        && distance < config.distance_threshold_cm
}

/// Alert state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    /// No hazard
    #[default]
    Idle,
    /// Hazard seen, waiting for it to hold until `deadline`
    PendingConfirm { armed_at: Instant, deadline: Instant },
    /// Alert signalled
    Active { since: Instant },
}

impl AlertState {
    pub fn phase(&self) -> AlertPhase {
        match self {
            AlertState::Idle => AlertPhase::Idle,
            AlertState::PendingConfirm { .. } => AlertPhase::PendingConfirm,
            AlertState::Active { .. } => AlertPhase::Active,
        }
    }
}

/// Serializable view of [`AlertState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPhase {
    #[default]
    Idle,
    PendingConfirm,
    Active,
}

/// Actuator call implied by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEdge {
    Start,
    Stop,
}

/// Pure transition function
pub fn transition(
    state: AlertState,
    criterion: bool,
    now: Instant,
    confirm_delay: Duration,
) -> (AlertState, Option<AlertEdge>) {
    match (state, criterion) {
        (AlertState::Idle, false) => (AlertState::Idle, None),
        (AlertState::Idle, true) if confirm_delay.is_zero() => {
            (AlertState::Active { since: now }, Some(AlertEdge::Start))
        }
        (AlertState::Idle, true) => (
            AlertState::PendingConfirm {
                armed_at: now,
                deadline: now + confirm_delay,
            },
            None,
        ),
        (AlertState::PendingConfirm { .. }, false) => (AlertState::Idle, None),
        (AlertState::PendingConfirm { deadline, .. }, true) if now >= deadline => {
            (AlertState::Active { since: now }, Some(AlertEdge::Start))
        }
        (pending @ AlertState::PendingConfirm { .. }, true) => (pending, None),
        (active @ AlertState::Active { .. }, true) => (active, None),
        (AlertState::Active { .. }, false) => (AlertState::Idle, Some(AlertEdge::Stop)),
    }
}

/// Debounced, edge-triggered hazard alert
#[derive(Debug)]
pub struct AlertStateMachine {
    config: AlertConfig,
    state: AlertState,
    /// Whether the actuator has been started and not yet stopped
    actuator_running: bool,
}

impl AlertStateMachine {
    pub fn new(config: AlertConfig) -> Self {
        info!(
            "Alert machine: label={:?} confidence>={} distance<{}cm confirm={}ms",
            config.hazard_label,
            config.confidence_threshold,
            config.distance_threshold_cm,
            config.confirm_delay_ms
        );
        Self {
            config,
            state: AlertState::Idle,
            actuator_running: false,
        }
    }

    /// Advance the state without touching any actuator
    pub fn evaluate(&mut self, input: &HazardInput<'_>, now: Instant) -> Option<AlertEdge> {
        let criterion = hazard_criterion(&self.config, input);
        let previous = self.state;
        let (next, edge) = transition(previous, criterion, now, self.config.confirm_delay());

        if previous.phase() != next.phase() {
            debug!("Alert state {:?} -> {:?}", previous.phase(), next.phase());
        }
        self.state = next;
        edge
    }

    /// Advance the state and drive the actuator on edges
    pub fn step<A: AlertActuator + ?Sized>(
        &mut self,
        input: &HazardInput<'_>,
        now: Instant,
        actuator: &mut A,
    ) -> Option<AlertEdge> {
        let edge = self.evaluate(input, now);
        if let Some(edge) = edge {
            self.apply(edge, actuator);
        }
        edge
    }

    /// Return to `Idle` regardless of the criterion, stopping an active alert
    pub fn force_idle<A: AlertActuator + ?Sized>(&mut self, actuator: &mut A) -> Option<AlertEdge> {
        let edge = match self.state {
            AlertState::Active { .. } => Some(AlertEdge::Stop),
            _ => None,
        };
        self.state = AlertState::Idle;
        if let Some(edge) = edge {
            self.apply(edge, actuator);
        }
        edge
    }

    fn apply<A: AlertActuator + ?Sized>(&mut self, edge: AlertEdge, actuator: &mut A) {
        match edge {
            AlertEdge::Start if !self.actuator_running => {
                info!("Hazard confirmed, starting alert");
                actuator.start_alert();
                self.actuator_running = true;
            }
            AlertEdge::Stop if self.actuator_running => {
                info!("Hazard cleared, stopping alert");
                actuator.stop_alert();
                self.actuator_running = false;
            }
            _ => {}
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn phase(&self) -> AlertPhase {
        self.state.phase()
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

impl Default for AlertStateMachine {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CountingActuator;
    use proptest::prelude::*;

    const HAZARD: HazardInput<'static> = HazardInput {
        label: Some("Pedestre"),
        confidence: 95.0,
        distance_cm: Some(10.0),
    };
    const CLEAR: HazardInput<'static> = HazardInput {
        label: Some("Sem Pedestre"),
        confidence: 99.0,
        distance_cm: Some(10.0),
    };

    fn ms(t0: Instant, millis: u64) -> Instant {
        t0 + Duration::from_millis(millis)
    }

    #[test]
    fn test_criterion_boundaries() {
        let config = AlertConfig::default();

        assert!(hazard_criterion(&config, &HazardInput::new("Pedestre", 90.0, 10.0)));
        assert!(!hazard_criterion(&config, &HazardInput::new("Pedestre", 89.99, 10.0)));
        assert!(!hazard_criterion(&config, &HazardInput::new("Pedestre", 95.0, 20.0)));
        assert!(hazard_criterion(&config, &HazardInput::new("Pedestre", 95.0, 19.99)));
        assert!(!hazard_criterion(&config, &HazardInput::new("Carro", 100.0, 1.0)));
    }

    #[test]
    fn test_unknown_inputs_are_not_hazards() {
        let config = AlertConfig::default();
        let no_distance = HazardInput {
            distance_cm: None,
            ..HAZARD
        };
        let no_label = HazardInput {
            label: None,
            ..HAZARD
        };

        assert!(!hazard_criterion(&config, &no_distance));
        assert!(!hazard_criterion(&config, &no_label));
    }

    #[test]
    fn test_short_hazard_never_alerts() {
        let mut machine = AlertStateMachine::default();
        let mut actuator = CountingActuator::default();
        let t0 = Instant::now();

        for t in (0..2000).step_by(100) {
            machine.step(&HAZARD, ms(t0, t), &mut actuator);
        }
        assert_eq!(machine.phase(), AlertPhase::PendingConfirm);

        machine.step(&CLEAR, ms(t0, 1999), &mut actuator);
        assert_eq!(machine.phase(), AlertPhase::Idle);
        assert_eq!(actuator.starts(), 0);
        assert_eq!(actuator.stops(), 0);
    }

    #[test]
    fn test_sustained_hazard_alerts_once_at_deadline() {
        let mut machine = AlertStateMachine::default();
        let mut actuator = CountingActuator::default();
        let t0 = Instant::now();

        machine.step(&HAZARD, t0, &mut actuator);
        assert_eq!(machine.step(&HAZARD, ms(t0, 1999), &mut actuator), None);
        assert_eq!(actuator.starts(), 0);

        assert_eq!(
            machine.step(&HAZARD, ms(t0, 2000), &mut actuator),
            Some(AlertEdge::Start)
        );
        assert_eq!(actuator.starts(), 1);

        for t in 2001..2050 {
            machine.step(&HAZARD, ms(t0, t), &mut actuator);
        }
        assert_eq!(actuator.starts(), 1);
        assert_eq!(machine.phase(), AlertPhase::Active);

        assert_eq!(
            machine.step(&CLEAR, ms(t0, 3000), &mut actuator),
            Some(AlertEdge::Stop)
        );
        machine.step(&CLEAR, ms(t0, 3100), &mut actuator);
        assert_eq!(actuator.stops(), 1);
        assert_eq!(machine.phase(), AlertPhase::Idle);
    }

    #[test]
    fn test_debounce_restarts_after_interruption() {
        let mut machine = AlertStateMachine::default();
        let t0 = Instant::now();

        machine.evaluate(&HAZARD, t0);
        machine.evaluate(&CLEAR, ms(t0, 1500));
        machine.evaluate(&HAZARD, ms(t0, 1600));

        assert_eq!(machine.evaluate(&HAZARD, ms(t0, 2500)), None);
        assert_eq!(machine.evaluate(&HAZARD, ms(t0, 3600)), Some(AlertEdge::Start));
    }

    #[test]
    fn test_immediate_policy() {
        let mut machine = AlertStateMachine::new(AlertConfig::immediate());
        let mut actuator = CountingActuator::default();
        let t0 = Instant::now();

        assert_eq!(machine.step(&HAZARD, t0, &mut actuator), Some(AlertEdge::Start));
        machine.step(&HAZARD, ms(t0, 10), &mut actuator);
        assert_eq!(actuator.starts(), 1);
    }

    #[test]
    fn test_force_idle_stops_active_alert() {
        let mut machine = AlertStateMachine::new(AlertConfig::immediate());
        let mut actuator = CountingActuator::default();
        let t0 = Instant::now();

        machine.step(&HAZARD, t0, &mut actuator);
        assert_eq!(machine.force_idle(&mut actuator), Some(AlertEdge::Stop));
        assert_eq!(machine.phase(), AlertPhase::Idle);
        assert_eq!(actuator.stops(), 1);

        assert_eq!(machine.force_idle(&mut actuator), None);
        assert_eq!(actuator.stops(), 1);
    }

    #[test]
    fn test_force_idle_from_pending_is_silent() {
        let mut machine = AlertStateMachine::default();
        let mut actuator = CountingActuator::default();

        machine.step(&HAZARD, Instant::now(), &mut actuator);
        assert_eq!(machine.force_idle(&mut actuator), None);
        assert_eq!(actuator.stops(), 0);
    }

    #[test]
    fn test_transition_is_deterministic() {
        let t0 = Instant::now();
        let delay = Duration::from_secs(2);
        let pending = AlertState::PendingConfirm {
            armed_at: t0,
            deadline: t0 + delay,
        };

        let a = transition(pending, true, ms(t0, 2000), delay);
        let b = transition(pending, true, ms(t0, 2000), delay);
        assert_eq!(a, b);
        assert_eq!(a.1, Some(AlertEdge::Start));
    }

    proptest! {
        #[test]
        fn prop_criterion_matches_definition(
            confidence in 0.0f64..=100.0,
            distance in 0.0f64..1000.0,
            is_hazard_label in any::<bool>(),
        ) {
            let config = AlertConfig::default();
            let label = if is_hazard_label { "Pedestre" } else { "Carro" };
            let input = HazardInput::new(label, confidence, distance);

            let expected = is_hazard_label && confidence >= 90.0 && distance < 20.0;
            prop_assert_eq!(hazard_criterion(&config, &input), expected);
        }
    }
}
