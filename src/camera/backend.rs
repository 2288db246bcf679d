use crate::config::{CameraConfig, FacingMode};
use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;
use tokio::sync::watch;

/// Parameters for acquiring a capture handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub index: u32,
    pub resolution: (u32, u32),
    pub fps: u32,
    pub facing: FacingMode,
}

impl From<&CameraConfig> for CaptureRequest {
    fn from(config: &CameraConfig) -> Self {
        Self {
            index: config.index,
            resolution: config.resolution,
            fps: config.fps,
            facing: config.facing,
        }
    }
}

/// Platform capture source. Acquiring may prompt the user for permission.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CameraError>;

    fn name(&self) -> &str;
}

/// A granted capture stream and its tracks
pub trait CaptureHandle: Send + Sync {
    /// True while at least one track still delivers frames
    fn has_live_tracks(&self) -> bool;

    /// Begin (or resume) playback
    fn play(&mut self) -> Result<(), CameraError>;

    fn pause(&mut self);

    /// Stop every track. The handle cannot be revived afterwards.
    fn stop_tracks(&mut self);

    /// Most recent frame, if playback has produced one
    fn latest_frame(&self) -> Option<FrameData>;

    /// Counter bumped once per delivered frame
    fn subscribe_frames(&self) -> watch::Receiver<u64>;
}
