//! Health Route

use axum::{extract::State, Json};
use serde::Serialize;
use serial_distance::LinkState;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" when both producers are live, "degraded" otherwise
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub serial: LinkState,
    pub classification: ComponentHealth,
}

/// Classification loop health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub last_tick: Option<u64>,
    pub last_activity_ms: Option<u64>,
}

/// Health check handler
pub async fn get_health(State(state): State<Arc<RwLock<AppState>>>) -> Json<HealthResponse> {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let link = state.link.latest().unwrap_or_default();
    let last = state.status.latest();
    let healthy = state.loop_running && link == LinkState::Connected;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            serial: link,
            classification: ComponentHealth {
                status: if state.loop_running { "ok" } else { "stopped" }.to_string(),
                last_tick: last.as_ref().map(|s| s.tick),
                last_activity_ms: last.map(|s| s.timestamp_ms),
            },
        },
    })
}
