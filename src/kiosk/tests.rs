use super::*;
use crate::camera::MockCaptureDevice;
use crate::config::{KioskConfig, ScanStrategy};
use crate::error::CameraError;
use crate::events::ConfirmationOutcome;
use crate::status::{CameraFailure, TalkFailure, Toast};
use crate::testing::{gray_frame, talk_record, FakeApi, ScriptedDecoder};
use std::time::Duration;
use tokio::sync::broadcast;

const COOLDOWN: Duration = Duration::from_millis(350);

struct Harness {
    kiosk: CheckinKiosk,
    device: Arc<MockCaptureDevice>,
    decoder: ScriptedDecoder,
    api: Arc<FakeApi>,
    events: broadcast::Receiver<KioskEvent>,
}

impl Harness {
    fn new(config: KioskConfig, code: Option<&str>, api: Arc<FakeApi>) -> Self {
        let device = Arc::new(MockCaptureDevice::with_still(gray_frame(1)));
        let decoder = ScriptedDecoder::new();
        let bus = EventBus::new(256);
        let events = bus.subscribe();
        let kiosk = CheckinKiosk::new(
            &config,
            device.clone(),
            Box::new(decoder.clone()),
            api.clone(),
            code.map(str::to_string),
            bus,
        )
        .unwrap();

        Self {
            kiosk,
            device,
            decoder,
            api,
            events,
        }
    }

    async fn live(config: KioskConfig) -> Self {
        let mut harness = Self::new(config, Some("TALK1"), FakeApi::with_talk(talk_record("TALK1")));
        assert!(harness.kiosk.load_talk().await);
        assert_eq!(
            harness.kiosk.start_camera().await,
            Some(StartOutcome::Acquired)
        );
        harness
    }

    /// Show `text` to the camera once the cooldown has passed and sample it
    async fn scan(&mut self, text: &str) -> ScanOutcome {
        self.decoder.show(text);
        tokio::time::advance(COOLDOWN).await;
        self.kiosk.scan_tick()
    }

    async fn wakeup(&mut self) -> Wakeup {
        tokio::time::timeout(Duration::from_secs(30), self.kiosk.next_wakeup())
            .await
            .expect("kiosk should wake up")
    }

    fn toasts(&mut self) -> Vec<Toast> {
        let mut toasts = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let KioskEvent::Toast { toast } = event {
                toasts.push(toast);
            }
        }
        toasts
    }

    /// Confirm the open modal and return how long it stays open after the call settles
    async fn confirm_and_time_close(&mut self) -> Duration {
        assert!(self.kiosk.confirm());
        let wakeup = self.wakeup().await;
        assert!(matches!(wakeup, Wakeup::Confirmation(_)));
        self.kiosk.handle_wakeup(wakeup);
        let settled_at = Instant::now();

        let wakeup = self.wakeup().await;
        assert!(matches!(wakeup, Wakeup::AutoClose));
        self.kiosk.handle_wakeup(wakeup);
        assert!(!self.kiosk.modal().is_open());
        Instant::now() - settled_at
    }
}

#[tokio::test(start_paused = true)]
async fn test_matching_code_opens_modal() {
    let mut h = Harness::live(KioskConfig::default()).await;

    assert!(matches!(
        h.scan("alice@x.com|TALK1").await,
        ScanOutcome::Detected(_)
    ));

    assert_eq!(h.kiosk.status(), &KioskStatus::Detected);
    let view = h.kiosk.modal().view().unwrap();
    assert_eq!(view.email, "alice@x.com");
    assert_eq!(view.code, "TALK1");
    assert!(!h.kiosk.scanner().is_armed(), "modal pauses sampling");
    assert!(h.kiosk.session().is_live(), "camera stays live");
}

#[tokio::test(start_paused = true)]
async fn test_other_talk_is_rejected_without_modal() {
    let mut h = Harness::live(KioskConfig::default()).await;

    assert!(matches!(
        h.scan("bob@x.com|OTHER").await,
        ScanOutcome::Mismatch(_)
    ));
    assert_eq!(h.kiosk.status(), &KioskStatus::WrongTalk);
    assert!(!h.kiosk.modal().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_code_is_rejected_without_modal() {
    let mut h = Harness::live(KioskConfig::default()).await;

    assert!(matches!(h.scan("noemail").await, ScanOutcome::Invalid(_)));
    assert_eq!(h.kiosk.status(), &KioskStatus::InvalidFormat);
    assert!(!h.kiosk.modal().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_confirmation_closes_after_failure_delay() {
    let mut h = Harness::live(KioskConfig::default()).await;
    h.scan("alice@x.com|TALK1").await;
    h.api.push_confirmation(Err(ApiError::Rejected {
        message: Some("x".to_string()),
    }));

    assert!(h.kiosk.confirm());
    let wakeup = h.wakeup().await;
    h.kiosk.handle_wakeup(wakeup);
    let settled_at = Instant::now();

    let info = h.kiosk.modal().view().unwrap().info.clone().unwrap();
    assert_eq!(info.text, "x");
    assert!(!info.ok);
    assert!(h.toasts().iter().any(|toast| !toast.ok));

    let wakeup = h.wakeup().await;
    assert!(matches!(wakeup, Wakeup::AutoClose));
    h.kiosk.handle_wakeup(wakeup);
    let open_for = Instant::now() - settled_at;
    assert!(open_for >= Duration::from_millis(1800));
    assert!(open_for <= Duration::from_millis(2010));

    assert!(!h.kiosk.modal().is_open());
    assert!(h.kiosk.scanner().is_armed(), "scanning resumes after close");
    assert_eq!(
        h.api.confirm_calls.lock().as_slice(),
        &[("TALK1".to_string(), "alice@x.com".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_confirmation_stays_open_longer() {
    let mut h = Harness::live(KioskConfig::default()).await;

    h.scan("alice@x.com|TALK1").await;
    h.api.push_confirmation(Ok(ConfirmationStatus::Confirmed));
    let fresh = h.confirm_and_time_close().await;

    h.scan("alice@x.com|TALK1").await;
    h.api.push_confirmation(Ok(ConfirmationStatus::AlreadyConfirmed));
    let duplicate = h.confirm_and_time_close().await;

    assert!(duplicate > fresh);
    assert!(fresh >= Duration::from_millis(1500));
    assert!(duplicate >= Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_clears_dedup_memory() {
    let mut h = Harness::live(KioskConfig::default()).await;

    h.scan("alice@x.com|TALK1").await;
    assert!(h.kiosk.scanner().state().last_payload.is_some());

    h.kiosk.cancel();
    assert!(!h.kiosk.modal().is_open());
    assert!(h.kiosk.scanner().state().last_payload.is_none());

    // Same code still in view: it opens the modal again after the post-close cooldown
    assert_eq!(h.kiosk.scan_tick(), ScanOutcome::CoolingDown);
    assert!(matches!(
        h.scan("alice@x.com|TALK1").await,
        ScanOutcome::Detected(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_loop_detects_code() {
    let mut h = Harness::live(KioskConfig::default()).await;
    h.decoder.show("alice@x.com|TALK1");
    let started = Instant::now();

    for _ in 0..10 {
        let wakeup = h.wakeup().await;
        assert!(matches!(wakeup, Wakeup::ScanTick));
        h.kiosk.handle_wakeup(wakeup);
        if h.kiosk.modal().is_open() {
            break;
        }
    }

    assert!(h.kiosk.modal().is_open());
    assert!(Instant::now() - started >= COOLDOWN);
}

#[tokio::test(start_paused = true)]
async fn test_per_frame_strategy_samples_on_new_frames() {
    let mut config = KioskConfig::default();
    config.scanner.strategy = ScanStrategy::PerFrame;
    let mut h = Harness::live(config).await;
    h.decoder.show("alice@x.com|TALK1");

    tokio::time::advance(COOLDOWN).await;
    h.device.present(gray_frame(2));
    let wakeup = h.wakeup().await;
    assert!(matches!(wakeup, Wakeup::ScanTick));
    h.kiosk.handle_wakeup(wakeup);

    assert!(h.kiosk.modal().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_hidden_kiosk_does_not_sample() {
    let mut h = Harness::live(KioskConfig::default()).await;
    h.decoder.show("alice@x.com|TALK1");

    h.kiosk.handle_command(OperatorCommand::ToggleVisibility).await;
    assert_eq!(h.kiosk.status(), &KioskStatus::PausedHidden);
    assert!(!h.kiosk.scanner().is_armed());
    assert!(
        tokio::time::timeout(Duration::from_secs(5), h.kiosk.next_wakeup())
            .await
            .is_err()
    );
    assert_eq!(h.decoder.calls(), 0);

    h.kiosk.set_visible(true);
    assert_eq!(h.kiosk.status(), &KioskStatus::CameraActive);
    assert_eq!(h.kiosk.scan_tick(), ScanOutcome::CoolingDown);
    assert!(matches!(
        h.scan("alice@x.com|TALK1").await,
        ScanOutcome::Detected(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_soft_stop_reuses_live_handle() {
    let mut config = KioskConfig::default();
    config.camera.release_on_stop = false;
    let mut h = Harness::live(config).await;

    h.kiosk.stop_camera();
    assert_eq!(h.kiosk.status(), &KioskStatus::Stopped);
    assert!(!h.kiosk.scanner().is_armed());

    assert_eq!(h.kiosk.start_camera().await, Some(StartOutcome::Reused));
    assert_eq!(h.device.acquisitions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_stop_forces_reacquisition() {
    let mut config = KioskConfig::default();
    config.camera.release_on_stop = true;
    let mut h = Harness::live(config).await;

    h.kiosk.stop_camera();
    assert_eq!(h.device.live_track_count(), 0);
    assert_eq!(h.kiosk.start_camera().await, Some(StartOutcome::Acquired));
    assert_eq!(h.device.acquisitions(), 2);
    assert!(h.kiosk.scanner().is_armed());
}

#[tokio::test(start_paused = true)]
async fn test_camera_failure_is_retryable() {
    let mut h = Harness::new(
        KioskConfig::default(),
        Some("TALK1"),
        FakeApi::with_talk(talk_record("TALK1")),
    );
    h.kiosk.load_talk().await;
    h.device.fail_next(CameraError::PermissionDenied {
        details: "denied".to_string(),
    });

    assert_eq!(h.kiosk.start_camera().await, None);
    assert_eq!(
        h.kiosk.status(),
        &KioskStatus::CameraFailed {
            kind: CameraFailure::PermissionDenied
        }
    );
    assert!(h.kiosk.session().controls().start_enabled);

    assert_eq!(h.kiosk.start_camera().await, Some(StartOutcome::Acquired));
    assert_eq!(h.kiosk.status(), &KioskStatus::CameraActive);
}

#[tokio::test(start_paused = true)]
async fn test_missing_code_disables_start() {
    let mut h = Harness::new(
        KioskConfig::default(),
        None,
        FakeApi::with_talk(talk_record("TALK1")),
    );

    assert!(!h.kiosk.load_talk().await);
    assert_eq!(h.kiosk.status(), &KioskStatus::MissingCode);
    assert_eq!(h.kiosk.pill(), "Code: no-code");
    assert_eq!(*h.api.talk_calls.lock(), 0);

    assert_eq!(h.kiosk.start_camera().await, None);
    assert_eq!(h.device.acquisitions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_inactive_talk_disables_start() {
    let mut record = talk_record("TALK1");
    record.active = false;
    let mut h = Harness::new(KioskConfig::default(), Some("TALK1"), FakeApi::with_talk(record));

    assert!(!h.kiosk.load_talk().await);
    assert_eq!(
        h.kiosk.status(),
        &KioskStatus::TalkUnavailable {
            reason: TalkFailure::Inactive
        }
    );
    assert!(!h.kiosk.session().controls().start_enabled);
    assert!(h.kiosk.talk().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_late_confirmation_does_not_touch_next_modal() {
    let mut h = Harness::live(KioskConfig::default()).await;
    *h.api.confirm_delay.lock() = Duration::from_secs(1);

    h.scan("alice@x.com|TALK1").await;
    assert!(h.kiosk.confirm());
    h.kiosk.cancel();

    h.scan("bob@x.com|TALK1").await;
    assert_eq!(h.kiosk.modal().payload().unwrap().email, "bob@x.com");

    let wakeup = h.wakeup().await;
    let Wakeup::Confirmation(completion) = &wakeup else {
        panic!("expected the confirmation result, got {:?}", wakeup);
    };
    assert_eq!(completion.request.payload.email, "alice@x.com");
    h.kiosk.handle_wakeup(wakeup);

    assert_eq!(h.kiosk.modal().payload().unwrap().email, "bob@x.com");
    assert_eq!(h.kiosk.modal().view().unwrap().info, None);
    assert_eq!(h.kiosk.modal().auto_close_at(), None);

    let settled: Vec<KioskEvent> = std::iter::from_fn(|| h.events.try_recv().ok()).collect();
    assert!(settled.iter().any(|event| matches!(
        event,
        KioskEvent::ConfirmationSettled {
            outcome: ConfirmationOutcome::Confirmed,
            ..
        }
    )));
    assert!(settled
        .iter()
        .any(|event| matches!(event, KioskEvent::Toast { toast } if toast.ok)));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_camera() {
    let mut h = Harness::live(KioskConfig::default()).await;
    h.scan("alice@x.com|TALK1").await;

    h.kiosk.shutdown();

    assert!(!h.kiosk.modal().is_open());
    assert!(!h.kiosk.session().is_live());
    assert_eq!(h.device.live_track_count(), 0);
}
