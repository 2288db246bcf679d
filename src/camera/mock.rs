use super::backend::{CaptureDevice, CaptureHandle, CaptureRequest};
use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default)]
struct TrackState {
    live: bool,
    playing: bool,
}

/// Capture device without hardware: every handle shows the same scene.
///
/// Counts permission-bearing acquisitions and can be told to fail the next one.
pub struct MockCaptureDevice {
    acquisitions: AtomicU64,
    next_failure: Mutex<Option<CameraError>>,
    scene: Arc<Mutex<Option<FrameData>>>,
    frame_tx: watch::Sender<u64>,
    tracks: Mutex<Vec<Arc<Mutex<TrackState>>>>,
}

impl MockCaptureDevice {
    pub fn new() -> Self {
        let (frame_tx, _) = watch::channel(0);
        Self {
            acquisitions: AtomicU64::new(0),
            next_failure: Mutex::new(None),
            scene: Arc::new(Mutex::new(None)),
            frame_tx,
            tracks: Mutex::new(Vec::new()),
        }
    }

    /// A device that keeps showing a still image
    pub fn with_still(frame: FrameData) -> Self {
        let device = Self::new();
        device.present(frame);
        device
    }

    /// Load a still image (e.g. a generated `qrcode.png`) as the scene
    pub fn from_image_file<P: AsRef<std::path::Path>>(path: P) -> crate::error::Result<Self> {
        let image = image::open(path)?.to_luma8();
        let frame = FrameData::new(
            0,
            SystemTime::now(),
            image.as_raw().clone(),
            image.width(),
            image.height(),
        );
        Ok(Self::with_still(frame))
    }

    /// Show a new frame and notify frame subscribers
    pub fn present(&self, frame: FrameData) {
        *self.scene.lock() = Some(frame);
        self.frame_tx.send_modify(|count| *count += 1);
    }

    /// Remove the scene, as if the lens were covered
    pub fn clear(&self) {
        *self.scene.lock() = None;
    }

    /// Make the next `acquire` fail with `error`
    pub fn fail_next(&self, error: CameraError) {
        *self.next_failure.lock() = Some(error);
    }

    /// Number of handles granted or refused so far
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Number of issued handles that still have live tracks
    pub fn live_track_count(&self) -> usize {
        self.tracks.lock().iter().filter(|t| t.lock().live).count()
    }

    /// End every track from the hardware side (unplug, OS revocation)
    pub fn end_all_tracks(&self) {
        for track in self.tracks.lock().iter() {
            track.lock().live = false;
        }
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for MockCaptureDevice {
    async fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CameraError> {
        let attempt = self.acquisitions.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Mock camera acquisition #{} ({}x{}, {:?})",
            attempt, request.resolution.0, request.resolution.1, request.facing
        );

        if let Some(error) = self.next_failure.lock().take() {
            return Err(error);
        }

        let track = Arc::new(Mutex::new(TrackState {
            live: true,
            playing: false,
        }));
        self.tracks.lock().push(Arc::clone(&track));

        Ok(Box::new(MockCaptureHandle {
            track,
            scene: Arc::clone(&self.scene),
            frame_rx: self.frame_tx.subscribe(),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockCaptureHandle {
    track: Arc<Mutex<TrackState>>,
    scene: Arc<Mutex<Option<FrameData>>>,
    frame_rx: watch::Receiver<u64>,
}

impl CaptureHandle for MockCaptureHandle {
    fn has_live_tracks(&self) -> bool {
        self.track.lock().live
    }

    fn play(&mut self) -> Result<(), CameraError> {
        let mut track = self.track.lock();
        if !track.live {
            return Err(CameraError::DeviceUnavailable {
                details: "track ended".to_string(),
            });
        }
        track.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.track.lock().playing = false;
    }

    fn stop_tracks(&mut self) {
        let mut track = self.track.lock();
        track.live = false;
        track.playing = false;
    }

    fn latest_frame(&self) -> Option<FrameData> {
        let track = self.track.lock();
        if !(track.live && track.playing) {
            return None;
        }
        self.scene.lock().clone()
    }

    fn subscribe_frames(&self) -> watch::Receiver<u64> {
        self.frame_rx.clone()
    }
}
