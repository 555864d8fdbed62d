//! Status Route

use axum::{extract::State, Json};
use event_fusion::StatusUpdate;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::AppState;

/// Latest per-tick status, `null` before the first tick
pub async fn get_status(
    State(state): State<Arc<RwLock<AppState>>>,
) -> Json<Option<StatusUpdate>> {
    let state = state.read().await;
    Json(state.status.latest())
}
