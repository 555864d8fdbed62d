//! Frame sources
//!
//! The live camera driver sits outside this workspace; anything that can
//! hand out [`ImageFrame`]s on demand implements [`FrameSource`].

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::{CameraConfig, CaptureError, ImageFrame};

/// Capture collaborator interface
pub trait FrameSource: Send {
    /// Suspend until the next frame is ready
    fn next_frame(&mut self) -> impl Future<Output = Result<ImageFrame, CaptureError>> + Send;
}

fn frame_interval(fps: u32) -> Interval {
    let period = Duration::from_micros(1_000_000 / fps.max(1) as u64);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Replays one decoded still image at the configured frame rate
pub struct StillImageSource {
    frame: ImageFrame,
    ticker: Interval,
    sequence: u64,
}

impl StillImageSource {
    /// Decode the image at `path`
    pub fn open(path: &Path, fps: u32) -> Result<Self, CaptureError> {
        info!("Opening still image source: {}", path.display());
        let img = image::open(path)
            .map_err(|e| CaptureError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let frame = ImageFrame::from_rgb_image(img.to_rgb8(), 0);
        debug!("Still image is {}x{}", frame.width, frame.height);

        Ok(Self {
            frame,
            ticker: frame_interval(fps),
            sequence: 0,
        })
    }
}

impl FrameSource for StillImageSource {
    async fn next_frame(&mut self) -> Result<ImageFrame, CaptureError> {
        self.ticker.tick().await;
        self.sequence += 1;

        let mut frame = self.frame.clone();
        frame.sequence = self.sequence;
        frame.timestamp_ms = crate::frame::now_ms();
        Ok(frame)
    }
}

/// Uniform gray frames, for running without a camera
pub struct SyntheticSource {
    width: u32,
    height: u32,
    channels: u8,
    level: u8,
    ticker: Interval,
    sequence: u64,
}

impl SyntheticSource {
    /// Create a synthetic source with the camera geometry
    pub fn new(config: &CameraConfig) -> Result<Self, CaptureError> {
        if config.width == 0 || config.height == 0 || config.channels == 0 {
            return Err(CaptureError::Unavailable(format!(
                "invalid synthetic geometry {}x{}x{}",
                config.width, config.height, config.channels
            )));
        }
        info!(
            "Using synthetic frames {}x{} @ {}fps",
            config.width, config.height, config.fps
        );

        Ok(Self {
            width: config.width,
            height: config.height,
            channels: config.channels,
            level: 128,
            ticker: frame_interval(config.fps),
            sequence: 0,
        })
    }
}

impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<ImageFrame, CaptureError> {
        self.ticker.tick().await;
        self.sequence += 1;
        Ok(ImageFrame::filled(
            self.width,
            self.height,
            self.channels,
            self.level,
            self.sequence,
        ))
    }
}

/// Open the source described by the camera configuration
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn DynFrameSource>, CaptureError> {
    match &config.image_path {
        Some(path) => Ok(Box::new(StillImageSource::open(path, config.fps)?)),
        None => Ok(Box::new(SyntheticSource::new(config)?)),
    }
}

/// Object-safe companion of [`FrameSource`] so a source can be picked at runtime
pub trait DynFrameSource: Send {
    fn next_frame_boxed(
        &mut self,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<ImageFrame, CaptureError>> + Send + '_>>;
}

impl<S: FrameSource> DynFrameSource for S {
    fn next_frame_boxed(
        &mut self,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<ImageFrame, CaptureError>> + Send + '_>> {
        Box::pin(self.next_frame())
    }
}

impl FrameSource for Box<dyn DynFrameSource> {
    fn next_frame(&mut self) -> impl Future<Output = Result<ImageFrame, CaptureError>> + Send {
        self.as_mut().next_frame_boxed()
    }
}
