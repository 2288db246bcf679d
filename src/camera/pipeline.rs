use super::backend::{CaptureDevice, CaptureHandle, CaptureRequest};
use crate::error::CameraError;
use crate::frame::FrameData;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// V4L2 camera captured through a GStreamer pipeline
pub struct GstCaptureDevice;

impl GstCaptureDevice {
    pub fn new() -> Result<Self, CameraError> {
        gstreamer::init().map_err(|e| CameraError::DeviceUnavailable {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;
        Ok(Self)
    }
}

#[async_trait]
impl CaptureDevice for GstCaptureDevice {
    async fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn CaptureHandle>, CameraError> {
        let request = request.clone();
        let handle = tokio::task::spawn_blocking(move || GstCaptureHandle::open(&request))
            .await
            .map_err(|e| CameraError::DeviceUnavailable {
                details: format!("Camera open task failed: {}", e),
            })??;
        Ok(Box::new(handle))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

struct GstCaptureHandle {
    pipeline: Pipeline,
    latest: Arc<Mutex<Option<FrameData>>>,
    frame_rx: watch::Receiver<u64>,
    stopped: bool,
}

impl GstCaptureHandle {
    fn open(request: &CaptureRequest) -> Result<Self, CameraError> {
        let device_path = format!("/dev/video{}", request.index);
        check_device_access(&device_path)?;

        let (width, height) = request.resolution;
        let pipeline_desc = format!(
            "v4l2src device={} ! videoconvert ! videoscale ! \
             video/x-raw,format=GRAY8,width={},height={},framerate={}/1 ! \
             appsink name=sink sync=false max-buffers=1 drop=true",
            device_path, width, height, request.fps
        );
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::DeviceUnavailable {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::DeviceUnavailable {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| CameraError::DeviceUnavailable {
                details: "Pipeline has no appsink".to_string(),
            })?;

        let latest = Arc::new(Mutex::new(None));
        let (frame_tx, frame_rx) = watch::channel(0u64);
        let frame_counter = AtomicU64::new(0);
        let sink_latest = Arc::clone(&latest);

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
                    if let Some(frame) = frame_from_sample(&sample, frame_id) {
                        trace!("Captured frame {} ({}x{})", frame_id, frame.width, frame.height);
                        *sink_latest.lock() = Some(frame);
                        frame_tx.send_replace(frame_id);
                    }
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        start_pipeline(&pipeline)?;

        Ok(Self {
            pipeline,
            latest,
            frame_rx,
            stopped: false,
        })
    }
}

impl CaptureHandle for GstCaptureHandle {
    fn has_live_tracks(&self) -> bool {
        !self.stopped
            && matches!(
                self.pipeline.current_state(),
                gstreamer::State::Playing | gstreamer::State::Paused
            )
    }

    fn play(&mut self) -> Result<(), CameraError> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map(|_| ())
            .map_err(|e| CameraError::DeviceUnavailable {
                details: format!("Failed to resume pipeline: {}", e),
            })
    }

    fn pause(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Paused) {
            warn!("Failed to pause pipeline: {}", e);
        }
    }

    fn stop_tracks(&mut self) {
        if self.stopped {
            return;
        }
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        *self.latest.lock() = None;
        self.stopped = true;
        debug!("GStreamer pipeline stopped");
    }

    fn latest_frame(&self) -> Option<FrameData> {
        self.latest.lock().clone()
    }

    fn subscribe_frames(&self) -> watch::Receiver<u64> {
        self.frame_rx.clone()
    }
}

impl Drop for GstCaptureHandle {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Move a freshly built pipeline to PLAYING, tearing it down to NULL on failure
fn start_pipeline(pipeline: &Pipeline) -> Result<(), CameraError> {
    if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
        let _ = pipeline.set_state(gstreamer::State::Null);
        return Err(CameraError::DeviceUnavailable {
            details: format!("Failed to start pipeline: {}", e),
        });
    }
    Ok(())
}

/// Map device node access problems onto the camera error taxonomy
fn check_device_access(device_path: &str) -> Result<(), CameraError> {
    match std::fs::OpenOptions::new().read(true).open(device_path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(CameraError::PermissionDenied {
                details: format!("{}: {}", device_path, e),
            })
        }
        Err(e) => Err(CameraError::DeviceUnavailable {
            details: format!("{}: {}", device_path, e),
        }),
    }
}

/// Copy a GRAY8 sample into a tightly packed frame
fn frame_from_sample(sample: &gstreamer::Sample, frame_id: u64) -> Option<FrameData> {
    let buffer = sample.buffer()?;
    let caps = sample.caps()?;
    let video_info = VideoInfo::from_caps(caps).ok()?;
    let map = buffer.map_readable().ok()?;

    let width = video_info.width() as usize;
    let height = video_info.height() as usize;
    let stride = video_info.stride()[0] as usize;
    let data = map.as_slice();

    let packed = if stride == width {
        data.get(..width * height)?.to_vec()
    } else {
        let mut packed = Vec::with_capacity(width * height);
        for row in 0..height {
            let start = row * stride;
            packed.extend_from_slice(data.get(start..start + width)?);
        }
        packed
    };

    Some(FrameData::new(
        frame_id,
        SystemTime::now(),
        packed,
        width as u32,
        height as u32,
    ))
}
