//! Hazard Monitor - Main Entry Point

use api::{init_logging, pipeline, AppConfig, DEFAULT_CONFIG_PATH};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&path)?;
    init_logging(&config.logging)?;

    info!("=== Hazard Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", path);

    pipeline::run(config).await
}
