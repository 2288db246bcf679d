use super::*;
use crate::config::{CameraConfig, FacingMode, KioskConfig};
use crate::error::CameraError;
use crate::events::{EventBus, KioskEvent};
use crate::frame::FrameData;
use std::time::SystemTime;

fn create_test_camera_config() -> CameraConfig {
    KioskConfig::default().camera
}

fn gray_frame(id: u64) -> FrameData {
    FrameData::new(id, SystemTime::now(), vec![128; 16], 4, 4)
}

fn session_with(device: Arc<MockCaptureDevice>) -> CameraSession {
    let request = CaptureRequest::from(&create_test_camera_config());
    CameraSession::new(device, request, EventBus::new(32))
}

#[test]
fn test_capture_request_prefers_environment_camera() {
    let request = CaptureRequest::from(&create_test_camera_config());
    assert_eq!(request.facing, FacingMode::Environment);
    assert_eq!(request.resolution, (640, 480));
}

#[tokio::test]
async fn test_start_acquires_and_goes_live() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    assert_eq!(session.phase(), SessionPhase::Idle);
    assert_eq!(session.start().await.unwrap(), StartOutcome::Acquired);
    assert!(session.is_live());
    assert_eq!(device.acquisitions(), 1);
    assert_eq!(
        session.controls(),
        Controls {
            start_enabled: false,
            stop_enabled: true
        }
    );
}

#[tokio::test]
async fn test_start_while_live_is_noop() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    session.start().await.unwrap();
    assert_eq!(session.start().await.unwrap(), StartOutcome::AlreadyRunning);
    assert_eq!(device.acquisitions(), 1);
}

#[tokio::test]
async fn test_stop_releases_and_forces_reacquisition() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    session.start().await.unwrap();
    assert!(session.stop());
    assert_eq!(session.phase(), SessionPhase::Stopped);
    assert!(!session.holds_handle());
    assert_eq!(device.live_track_count(), 0);

    assert_eq!(session.start().await.unwrap(), StartOutcome::Acquired);
    assert_eq!(device.acquisitions(), 2);
}

#[tokio::test]
async fn test_suspend_then_start_reuses_live_handle() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    session.start().await.unwrap();
    assert!(session.suspend());
    assert!(session.holds_handle());
    assert!(session.current_frame().is_none());

    assert_eq!(session.start().await.unwrap(), StartOutcome::Reused);
    assert_eq!(device.acquisitions(), 1);
}

#[tokio::test]
async fn test_dead_handle_is_not_reused() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    session.start().await.unwrap();
    session.suspend();
    device.end_all_tracks();

    assert_eq!(session.start().await.unwrap(), StartOutcome::Acquired);
    assert_eq!(device.acquisitions(), 2);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(device);

    assert!(!session.stop());
    assert_eq!(session.phase(), SessionPhase::Idle);

    session.start().await.unwrap();
    assert!(session.stop());
    assert!(!session.stop());
    assert_eq!(session.phase(), SessionPhase::Stopped);
}

#[tokio::test]
async fn test_acquisition_failure_leaves_session_released() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    device.fail_next(CameraError::PermissionDenied {
        details: "user dismissed prompt".to_string(),
    });
    let err = session.start().await.unwrap_err();
    assert!(matches!(err, CameraError::PermissionDenied { .. }));
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(!session.holds_handle());
    assert!(session.controls().start_enabled);

    // Retryable
    assert_eq!(session.start().await.unwrap(), StartOutcome::Acquired);
}

#[tokio::test]
async fn test_frames_only_visible_while_live() {
    let device = Arc::new(MockCaptureDevice::with_still(gray_frame(1)));
    let mut session = session_with(Arc::clone(&device));

    assert!(session.current_frame().is_none());
    session.start().await.unwrap();
    assert_eq!(session.current_frame().unwrap().id, 1);

    device.present(gray_frame(2));
    assert_eq!(session.current_frame().unwrap().id, 2);

    session.stop();
    assert!(session.current_frame().is_none());
    assert!(session.frame_notifications().is_none());
}

#[tokio::test]
async fn test_disabled_start_does_not_prompt() {
    let device = Arc::new(MockCaptureDevice::new());
    let mut session = session_with(Arc::clone(&device));

    session.set_start_allowed(false);
    assert!(!session.controls().start_enabled);
    assert_eq!(session.start().await.unwrap(), StartOutcome::Disabled);
    assert_eq!(device.acquisitions(), 0);
}

#[tokio::test]
async fn test_session_publishes_camera_and_control_events() {
    let device = Arc::new(MockCaptureDevice::new());
    let bus = EventBus::new(32);
    let mut receiver = bus.subscribe();
    let mut session = CameraSession::new(
        device,
        CaptureRequest::from(&create_test_camera_config()),
        bus,
    );

    session.start().await.unwrap();

    let mut saw_live = false;
    let mut saw_controls = false;
    while let Ok(event) = receiver.try_recv() {
        match event {
            KioskEvent::CameraStatusChanged { live: true, .. } => saw_live = true,
            KioskEvent::ControlsChanged {
                start_enabled: false,
                stop_enabled: true,
            } => saw_controls = true,
            _ => {}
        }
    }
    assert!(saw_live);
    assert!(saw_controls);
}

#[test]
fn test_mock_backend_from_config() {
    let device = create_capture_device(&create_test_camera_config()).unwrap();
    assert_eq!(device.name(), "mock");
}
