//! Pipeline wiring
//!
//! Builds the classifier and capture source from configuration, spawns the
//! serial reader and presentation tasks, and runs the classification loop
//! on the calling task until Ctrl-C.

use std::sync::Arc;

use alerting::{AlertStateMachine, LogActuator};
use anyhow::Context;
use camera_capture::open_source;
use event_fusion::{stop_channel, ClassificationLoop, DistanceFeed, StatusFeed};
use inference_engine::{
    ClassificationModel, ClassifierAdapter, FrameClassifier, MockModel, ModelMetadata, TractModel,
};
use serial_distance::{open_serial, DistanceReader, LinkState, ReadingSink, SerialConfig};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ModelConfig};
use crate::{run_server, AppState};

/// Classifier over whichever model backend the configuration selects
pub type DynClassifier = FrameClassifier<Box<dyn ClassificationModel>>;

/// Load metadata and model, and check they agree with preprocessing
pub fn build_classifier(config: &ModelConfig) -> anyhow::Result<DynClassifier> {
    let metadata = config
        .metadata_location()
        .map(|path| ModelMetadata::load_or_default(&path))
        .unwrap_or_default();

    let mut preprocess = config.preprocess.clone();
    metadata.apply_to(&mut preprocess);
    preprocess.validate()?;
    let shape = preprocess.input_shape();

    let model: Box<dyn ClassificationModel> = match &config.path {
        Some(path) => Box::new(TractModel::load(path, shape)?),
        None => {
            warn!("No model path configured, classifying with the mock model");
            Box::new(MockModel::new(config.mock_scores.clone(), shape))
        }
    };

    let labels = metadata.labels();
    info!("Labels: {:?}", labels);
    Ok(FrameClassifier::new(
        preprocess,
        ClassifierAdapter::new(model, labels),
    )?)
}

/// Read distances until the link ends; the distance slot keeps its last value
async fn read_distances(config: SerialConfig, feed: Arc<DistanceFeed>) {
    let stream = match open_serial(&config) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Serial link unavailable: {}", e);
            feed.link_changed(LinkState::Failed(e.to_string()));
            return;
        }
    };

    let mut reader = DistanceReader::new(&config);
    let reason = reader.run(stream, feed.as_ref()).await;
    let stats = reader.stats();
    if reason.is_graceful() {
        info!(
            "Serial reader finished: {} lines, {} readings",
            stats.lines, stats.readings
        );
    } else {
        warn!(
            "Serial reader stopped: {} ({} readings, {} dropped)",
            reason, stats.readings, stats.dropped
        );
    }
}

/// Presentation: one line per tick, skipping ticks it falls behind on
async fn report_status(mut feed: StatusFeed) {
    while let Some(update) = feed.changed().await {
        info!(target: "hazard_monitor::status", "{}", update);
    }
}

/// Run the monitor until Ctrl-C or a fatal capture error
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let classifier = build_classifier(&config.model).context("Failed to build classifier")?;
    let source = open_source(&config.camera).context("Failed to open camera source")?;

    let feed = Arc::new(DistanceFeed::new());
    let distance = feed.distance();
    let link = feed.link();
    let serial = tokio::spawn(read_distances(config.serial.clone(), feed));

    let mut runner = ClassificationLoop::new(
        source,
        classifier,
        AlertStateMachine::new(config.alert.clone()),
        LogActuator::default(),
        distance,
    );
    let status = runner.status();
    tokio::spawn(report_status(status.clone()));

    let state = Arc::new(RwLock::new(AppState::new(status, link)));
    if config.server.enabled {
        let addr = config.server.addr.clone();
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_server(&addr, state).await {
                error!("API server failed: {}", e);
            }
        });
    }

    let (handle, signal) = stop_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                handle.stop();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C, running until capture ends: {}", e),
        }
    });

    state.write().await.loop_running = true;
    let result = runner.run(signal).await;
    state.write().await.loop_running = false;
    serial.abort();

    let stats = result.context("Classification loop failed")?;
    info!(
        "Processed {} frames ({} classified, {} failed, {} capture errors)",
        stats.ticks, stats.classified, stats.inference_failures, stats.capture_errors
    );
    Ok(())
}
