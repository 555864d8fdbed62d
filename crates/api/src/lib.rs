//! Hazard Monitor
//!
//! Wires the camera classifier, the serial distance reader and the alert
//! state machine together, and serves their live state over HTTP.

use axum::{routing::get, Router};
use event_fusion::{SlotReader, StatusFeed};
use serial_distance::LinkState;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod pipeline;
mod routes;

pub use config::{AppConfig, ConfigError, LoggingConfig, DEFAULT_CONFIG_PATH};

/// Application state shared across handlers
pub struct AppState {
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Per-tick status published by the classification loop
    pub status: StatusFeed,
    /// Serial transport state
    pub link: SlotReader<LinkState>,
    /// Whether the classification loop is running
    pub loop_running: bool,
}

impl AppState {
    pub fn new(status: StatusFeed, link: SlotReader<LinkState>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            status,
            link,
            loop_running: false,
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::get_health))
        .route("/api/v1/status", get(routes::status::get_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(config.max_level()?)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Serve the status API
pub async fn run_server(addr: &str, state: Arc<RwLock<AppState>>) -> std::io::Result<()> {
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::AlertPhase;
    use event_fusion::{Slot, StatusUpdate};
    use serial_distance::ReadingSink;

    async fn spawn_server(state: Arc<RwLock<AppState>>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_status_is_null_before_first_tick() {
        let status = Slot::<StatusUpdate>::new();
        let feed = event_fusion::DistanceFeed::new();
        let state = Arc::new(RwLock::new(AppState::new(status.reader(), feed.link())));
        let base = spawn_server(state).await;

        let body: serde_json::Value = reqwest::get(format!("{}/api/v1/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_status_returns_latest_update() {
        let status = Slot::new();
        let feed = event_fusion::DistanceFeed::new();
        let state = Arc::new(RwLock::new(AppState::new(status.reader(), feed.link())));
        let base = spawn_server(state).await;

        status.publish(StatusUpdate {
            tick: 42,
            label: Some("Pedestre".to_string()),
            confidence: Some(95.5),
            distance_cm: Some(12.0),
            alert_phase: AlertPhase::Active,
            timestamp_ms: 1,
        });

        let body: serde_json::Value = reqwest::get(format!("{}/api/v1/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["tick"], 42);
        assert_eq!(body["label"], "Pedestre");
        assert_eq!(body["alert_phase"], "active");
    }

    #[tokio::test]
    async fn test_health_reports_link_and_loop() {
        let status = Slot::<StatusUpdate>::new();
        let feed = event_fusion::DistanceFeed::new();
        let state = Arc::new(RwLock::new(AppState::new(status.reader(), feed.link())));
        let base = spawn_server(state.clone()).await;

        let body: serde_json::Value = reqwest::get(format!("{}/api/v1/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["components"]["serial"]["state"], "disconnected");
        assert_eq!(body["components"]["classification"]["status"], "stopped");

        feed.link_changed(LinkState::Connected);
        state.write().await.loop_running = true;

        let body: serde_json::Value = reqwest::get(format!("{}/api/v1/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
