//! Alerting System
//!
//! Hazard criterion, debounced alert state machine and the actuator
//! interface it drives on edges.

mod actuator;
mod machine;

pub use actuator::{AlertActuator, CountingActuator, LogActuator};
pub use machine::{
    hazard_criterion, transition, AlertConfig, AlertEdge, AlertPhase, AlertState,
    AlertStateMachine, HazardInput,
};
