mod backend;
mod mock;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod pipeline;
mod session;
#[cfg(test)]
mod tests;

pub use backend::{CaptureDevice, CaptureHandle, CaptureRequest};
pub use mock::MockCaptureDevice;
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use pipeline::GstCaptureDevice;
pub use session::{CameraSession, Controls, SessionPhase, StartOutcome};

use crate::config::{CameraBackend, CameraConfig};
use crate::error::Result;
use std::sync::Arc;

/// Build the capture device selected in the configuration
pub fn create_capture_device(config: &CameraConfig) -> Result<Arc<dyn CaptureDevice>> {
    match config.backend {
        CameraBackend::Mock => Ok(Arc::new(MockCaptureDevice::new())),
        CameraBackend::Gstreamer => gstreamer_device(),
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn gstreamer_device() -> Result<Arc<dyn CaptureDevice>> {
    Ok(Arc::new(GstCaptureDevice::new()?))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn gstreamer_device() -> Result<Arc<dyn CaptureDevice>> {
    use crate::error::CameraError;

    tracing::warn!("GStreamer camera backend requires Linux and the `camera` feature");
    Err(CameraError::DeviceUnavailable {
        details: "GStreamer backend not compiled in".to_string(),
    }
    .into())
}
