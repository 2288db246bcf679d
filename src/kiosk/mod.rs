//! The check-in page: one camera session, one scan loop, one confirmation modal.

#[cfg(test)]
mod tests;

use crate::api::{AttendanceApi, ConfirmationStatus};
use crate::camera::{CameraSession, CaptureDevice, CaptureRequest, StartOutcome};
use crate::config::KioskConfig;
use crate::decoder::QrDecoder;
use crate::error::{ApiError, KioskError, Result};
use crate::events::{CloseReason, EventBus, KioskEvent, OperatorCommand};
use crate::modal::{ConfirmRequest, ConfirmationModal};
use crate::scanner::{ScanLoopController, ScanOutcome, ScanPayload, ScanSchedule};
use crate::status::KioskStatus;
use crate::talk::{self, TalkInfo, NO_CODE};
use chrono_tz::Tz;
use std::future;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// A confirmation call that has finished
#[derive(Debug)]
pub struct Completion {
    pub request: ConfirmRequest,
    pub result: std::result::Result<ConfirmationStatus, ApiError>,
}

/// Something the kiosk must react to on its own
#[derive(Debug)]
pub enum Wakeup {
    ScanTick,
    Confirmation(Completion),
    AutoClose,
}

pub struct CheckinKiosk {
    session: CameraSession,
    scanner: ScanLoopController,
    schedule: ScanSchedule,
    modal: ConfirmationModal,
    api: Arc<dyn AttendanceApi>,
    talk_code: Option<String>,
    talk: Option<TalkInfo>,
    status: KioskStatus,
    visible: bool,
    release_on_stop: bool,
    event_bus: EventBus,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl CheckinKiosk {
    pub fn new(
        config: &KioskConfig,
        device: Arc<dyn CaptureDevice>,
        decoder: Box<dyn QrDecoder>,
        api: Arc<dyn AttendanceApi>,
        talk_code: Option<String>,
        event_bus: EventBus,
    ) -> Result<Self> {
        let timezone: Tz = config.ui.timezone.parse().map_err(|e| {
            KioskError::system(format!("Invalid timezone {:?}: {}", config.ui.timezone, e))
        })?;

        let mut session = CameraSession::new(
            device,
            CaptureRequest::from(&config.camera),
            event_bus.clone(),
        );
        // Nothing to check into until the talk is loaded
        session.set_start_allowed(false);

        let expected_code = talk_code.clone().unwrap_or_else(|| NO_CODE.to_string());
        let scanner = ScanLoopController::new(
            decoder,
            expected_code,
            config.scanner.rescan_cooldown(),
        );
        let schedule = ScanSchedule::new(config.scanner.strategy, config.scanner.scan_interval());
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Ok(Self {
            session,
            scanner,
            schedule,
            modal: ConfirmationModal::new(config.modal.clone(), timezone),
            api,
            talk_code,
            talk: None,
            status: KioskStatus::Idle,
            visible: true,
            release_on_stop: config.camera.release_on_stop,
            event_bus,
            completion_tx,
            completion_rx,
        })
    }

    pub fn status(&self) -> &KioskStatus {
        &self.status
    }

    pub fn talk(&self) -> Option<&TalkInfo> {
        self.talk.as_ref()
    }

    pub fn pill(&self) -> String {
        talk::pill_text(self.talk_code.as_deref())
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    pub fn scanner(&self) -> &ScanLoopController {
        &self.scanner
    }

    pub fn modal(&self) -> &ConfirmationModal {
        &self.modal
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// One-shot talk lookup; enables the start control on success
    pub async fn load_talk(&mut self) -> bool {
        let result = talk::load(self.api.as_ref(), self.talk_code.as_deref()).await;
        match result {
            Ok(info) => {
                self.event_bus.emit(KioskEvent::TalkLoaded {
                    code: info.code().to_string(),
                    title: info.title().to_string(),
                    schedule: info.schedule_line().unwrap_or_default(),
                });
                self.talk = Some(info);
                self.session.set_start_allowed(true);
                true
            }
            Err(e) => {
                warn!("Talk unavailable: {}", e);
                self.talk = None;
                self.session.set_start_allowed(false);
                self.set_status(KioskStatus::from(&e));
                false
            }
        }
    }

    pub async fn start_camera(&mut self) -> Option<StartOutcome> {
        if self.session.is_live() || !self.session.controls().start_enabled {
            debug!("Start ignored: live={}", self.session.is_live());
            return None;
        }

        self.set_status(KioskStatus::OpeningCamera);
        match self.session.start().await {
            Ok(outcome) => {
                if matches!(outcome, StartOutcome::Acquired | StartOutcome::Reused) {
                    self.scanner.set_running(true);
                    self.schedule.attach_frames(self.session.frame_notifications());
                    self.set_status(KioskStatus::CameraActive);
                    self.resume_scanning();
                }
                Some(outcome)
            }
            Err(e) => {
                self.set_status(KioskStatus::from(&e));
                None
            }
        }
    }

    pub fn stop_camera(&mut self) {
        self.scanner.set_running(false);
        self.schedule.attach_frames(None);
        self.schedule.reset();
        if self.release_on_stop {
            self.session.stop();
        } else {
            self.session.suspend();
        }
        self.set_status(KioskStatus::Stopped);
    }

    /// Window focus changed. Hiding pauses sampling; showing resumes after a fresh cooldown.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;

        if visible {
            self.resume_scanning();
            if self.session.is_live() {
                self.set_status(KioskStatus::CameraActive);
            }
        } else {
            self.scanner.pause();
            self.set_status(KioskStatus::PausedHidden);
        }
    }

    /// Submit the open modal's payload. No-op unless the modal is open and idle.
    pub fn confirm(&mut self) -> bool {
        let Some(request) = self.modal.begin_confirm() else {
            return false;
        };
        if let Some(info) = self.modal.view().and_then(|view| view.info.clone()) {
            self.event_bus.emit(KioskEvent::ModalInfo {
                message: info.text,
                ok: info.ok,
            });
        }

        info!(
            "Submitting confirmation {} for {}",
            request.request_id, request.payload
        );
        let api = Arc::clone(&self.api);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = api
                .confirm_attendance(&request.payload.event_code, &request.payload.email)
                .await;
            if tx.send(Completion { request, result }).is_err() {
                debug!("Kiosk gone before confirmation settled");
            }
        });
        true
    }

    /// Escape key or backdrop click
    pub fn cancel(&mut self) {
        self.close_modal(CloseReason::Cancelled);
    }

    pub async fn handle_command(&mut self, command: OperatorCommand) {
        match command {
            OperatorCommand::StartCamera => {
                self.start_camera().await;
            }
            OperatorCommand::StopCamera => self.stop_camera(),
            OperatorCommand::Confirm => {
                self.confirm();
            }
            OperatorCommand::Cancel => self.cancel(),
            OperatorCommand::SetVisible(visible) => self.set_visible(visible),
            OperatorCommand::ToggleVisibility => self.set_visible(!self.visible),
            OperatorCommand::Quit => {}
        }
    }

    /// Wait for the next scan tick, confirmation result or auto-close deadline
    pub async fn next_wakeup(&mut self) -> Wakeup {
        let deadline = self.modal.auto_close_at();
        let sampling = self.visible && self.scanner.is_armed();

        tokio::select! {
            Some(completion) = self.completion_rx.recv() => Wakeup::Confirmation(completion),
            _ = wait_until(deadline) => Wakeup::AutoClose,
            _ = self.schedule.next_tick(), if sampling => Wakeup::ScanTick,
        }
    }

    pub fn handle_wakeup(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::ScanTick => {
                self.scan_tick();
            }
            Wakeup::Confirmation(completion) => self.settle(completion),
            Wakeup::AutoClose => {
                if self
                    .modal
                    .auto_close_at()
                    .is_some_and(|deadline| deadline <= Instant::now())
                {
                    self.close_modal(CloseReason::AutoClose);
                }
            }
        }
    }

    /// Sample the current frame once
    pub fn scan_tick(&mut self) -> ScanOutcome {
        let frame = self.session.current_frame();
        let outcome = self
            .scanner
            .tick(frame.as_ref(), self.modal.is_open(), Instant::now());

        match &outcome {
            ScanOutcome::Invalid(e) | ScanOutcome::Mismatch(e) => {
                debug!("Scan rejected: {}", e);
                self.set_status(KioskStatus::from(e));
            }
            ScanOutcome::Detected(payload) => {
                self.set_status(KioskStatus::Detected);
                self.open_modal(payload.clone());
            }
            ScanOutcome::Unreadable(e) => {
                self.event_bus.emit(KioskEvent::SystemError {
                    component: "scanner".to_string(),
                    error: e.to_string(),
                });
            }
            other => trace!("Scan tick: {:?}", other),
        }
        outcome
    }

    fn open_modal(&mut self, payload: ScanPayload) {
        if !self.modal.open(payload.clone()) {
            return;
        }
        self.scanner.pause();
        let opened_at = self
            .modal
            .view()
            .map(|view| view.opened_at.clone())
            .unwrap_or_default();
        self.event_bus.emit(KioskEvent::ModalOpened { payload, opened_at });
    }

    fn settle(&mut self, completion: Completion) {
        let Completion { request, result } = completion;
        let settlement = self
            .modal
            .settle(request.generation, result, Instant::now());

        self.event_bus.emit(KioskEvent::Toast {
            toast: settlement.toast,
        });
        if settlement.applied {
            self.event_bus.emit(KioskEvent::ModalInfo {
                message: settlement.info.text,
                ok: settlement.info.ok,
            });
        }
        self.event_bus.emit(KioskEvent::ConfirmationSettled {
            payload: request.payload,
            outcome: settlement.outcome,
        });
    }

    fn close_modal(&mut self, reason: CloseReason) {
        let Some(payload) = self.modal.close() else {
            return;
        };
        debug!("Modal for {} closed: {:?}", payload, reason);
        self.scanner.clear_last_payload();
        self.event_bus.emit(KioskEvent::ModalClosed { reason });
        self.resume_scanning();
    }

    /// Re-arm sampling with a fresh cooldown when live, visible and ungated
    fn resume_scanning(&mut self) {
        let now = Instant::now();
        if !self.visible {
            self.scanner.arm_cooldown(now);
            return;
        }
        if self.scanner.resume(self.modal.is_open(), now) {
            self.schedule.reset();
        }
    }

    fn set_status(&mut self, status: KioskStatus) {
        if self.status == status {
            return;
        }
        self.status = status.clone();
        self.event_bus.emit(KioskEvent::StatusChanged {
            status,
            timestamp: SystemTime::now(),
        });
    }

    /// Process exit: close the modal and release every camera track
    pub fn shutdown(&mut self) {
        self.close_modal(CloseReason::CameraStopped);
        self.scanner.set_running(false);
        self.schedule.attach_frames(None);
        self.session.stop();
        info!("Kiosk shut down");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}
