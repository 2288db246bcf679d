use super::backend::{CaptureDevice, CaptureHandle, CaptureRequest};
use crate::error::CameraError;
use crate::events::{EventBus, KioskEvent};
use crate::frame::FrameData;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Camera session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Acquiring,
    Live,
    Stopped,
}

/// Result of a successful `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new handle was requested from the platform
    Acquired,
    /// The previous handle still had live tracks and was reattached
    Reused,
    AlreadyRunning,
    /// Starting is currently not allowed (no valid talk loaded)
    Disabled,
}

/// Start/stop control availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

/// The display element the handle is attached to
#[derive(Debug, Default, Clone, Copy)]
struct DisplaySurface {
    attached: bool,
    playing: bool,
}

/// Sole owner of the capture handle.
///
/// Callers only ever observe a fully released session (no handle attached,
/// tracks stopped) or a fully live one.
pub struct CameraSession {
    device: Arc<dyn CaptureDevice>,
    request: CaptureRequest,
    handle: Option<Box<dyn CaptureHandle>>,
    surface: DisplaySurface,
    phase: SessionPhase,
    start_allowed: bool,
    event_bus: EventBus,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CaptureDevice>, request: CaptureRequest, event_bus: EventBus) -> Self {
        info!("Camera session using {} backend", device.name());
        Self {
            device,
            request,
            handle: None,
            surface: DisplaySurface::default(),
            phase: SessionPhase::Idle,
            start_allowed: true,
            event_bus,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_live(&self) -> bool {
        self.phase == SessionPhase::Live
    }

    /// Whether a capture handle is currently held (live or suspended)
    pub fn holds_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn controls(&self) -> Controls {
        Controls {
            start_enabled: self.start_allowed && self.phase != SessionPhase::Live,
            stop_enabled: self.phase == SessionPhase::Live,
        }
    }

    /// Allow or forbid starting; used when the talk cannot be checked into
    pub fn set_start_allowed(&mut self, allowed: bool) {
        self.start_allowed = allowed;
        self.publish_controls();
    }

    /// Acquire (or reuse) a capture handle and begin playback
    pub async fn start(&mut self) -> Result<StartOutcome, CameraError> {
        if self.phase == SessionPhase::Live {
            debug!("Camera session already live");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if !self.start_allowed {
            debug!("Camera start requested while disabled");
            return Ok(StartOutcome::Disabled);
        }

        let previous = self.phase;
        self.phase = SessionPhase::Acquiring;

        let reuse = self
            .handle
            .as_ref()
            .is_some_and(|handle| handle.has_live_tracks());

        if reuse {
            debug!("Reusing capture handle with live tracks");
        } else {
            if let Some(mut stale) = self.handle.take() {
                debug!("Discarding capture handle without live tracks");
                stale.stop_tracks();
            }

            match self.device.acquire(&self.request).await {
                Ok(handle) => self.handle = Some(handle),
                Err(e) => {
                    warn!("Camera acquisition failed: {}", e);
                    self.phase = previous;
                    self.publish_controls();
                    return Err(e);
                }
            }
        }

        let Some(handle) = self.handle.as_mut() else {
            self.phase = previous;
            return Err(CameraError::DeviceUnavailable {
                details: "capture handle vanished during start".to_string(),
            });
        };

        self.surface.attached = true;
        if let Err(e) = handle.play() {
            // Playback may still begin on its own; the session stays usable
            warn!("Camera playback did not start cleanly: {}", e);
        }
        self.surface.playing = true;
        self.phase = SessionPhase::Live;

        info!("Camera session live ({})", if reuse { "reused" } else { "acquired" });
        self.event_bus.emit(KioskEvent::CameraStatusChanged {
            live: true,
            timestamp: SystemTime::now(),
        });
        self.publish_controls();

        Ok(if reuse {
            StartOutcome::Reused
        } else {
            StartOutcome::Acquired
        })
    }

    /// Detach, pause, stop every track and drop the handle. Idempotent.
    pub fn stop(&mut self) -> bool {
        let was_live = self.phase == SessionPhase::Live;
        self.surface = DisplaySurface::default();

        if let Some(mut handle) = self.handle.take() {
            handle.pause();
            handle.stop_tracks();
            debug!("Capture handle released");
        }

        self.finish_stop(was_live);
        was_live
    }

    /// Detach and pause but keep the handle so the next start can reuse it
    pub fn suspend(&mut self) -> bool {
        let was_live = self.phase == SessionPhase::Live;
        self.surface = DisplaySurface::default();

        if let Some(handle) = self.handle.as_mut() {
            handle.pause();
            debug!("Capture handle suspended");
        }

        self.finish_stop(was_live);
        was_live
    }

    fn finish_stop(&mut self, was_live: bool) {
        if self.phase != SessionPhase::Idle {
            self.phase = SessionPhase::Stopped;
        }
        if was_live {
            info!("Camera session stopped");
            self.event_bus.emit(KioskEvent::CameraStatusChanged {
                live: false,
                timestamp: SystemTime::now(),
            });
        }
        self.publish_controls();
    }

    /// Frame currently shown on the attached surface
    pub fn current_frame(&self) -> Option<FrameData> {
        if self.phase != SessionPhase::Live || !self.surface.attached || !self.surface.playing {
            return None;
        }
        self.handle.as_ref().and_then(|handle| handle.latest_frame())
    }

    /// Frame notifications from the live handle
    pub fn frame_notifications(&self) -> Option<watch::Receiver<u64>> {
        if self.phase != SessionPhase::Live {
            return None;
        }
        self.handle.as_ref().map(|handle| handle.subscribe_frames())
    }

    fn publish_controls(&self) {
        let controls = self.controls();
        self.event_bus.emit(KioskEvent::ControlsChanged {
            start_enabled: controls.start_enabled,
            stop_enabled: controls.stop_enabled,
        });
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop_tracks();
        }
    }
}
