use crate::api::ConfirmationStatus;
use crate::config::ModalConfig;
use crate::error::ApiError;
use crate::events::ConfirmationOutcome;
use crate::scanner::ScanPayload;
use crate::status::{confirmation_failure_message, Toast};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const CONFIRM_LABEL: &str = "Confirm attendance";
pub const CONFIRMING_LABEL: &str = "Confirming…";
const SUBMITTING_INFO: &str = "Registering attendance…";
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    Open,
    Submitting,
}

/// What the operator sees while the modal is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub email: String,
    pub code: String,
    pub opened_at: String,
    pub badge: String,
    pub info: Option<InfoLine>,
    pub confirm_label: &'static str,
    pub confirm_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub text: String,
    pub ok: bool,
}

/// A confirmation call to issue, tagged with the modal instance it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub generation: u64,
    pub request_id: Uuid,
    pub payload: ScanPayload,
}

/// How a finished confirmation call was presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub outcome: ConfirmationOutcome,
    pub toast: Toast,
    pub info: InfoLine,
    /// False when the call belonged to a modal that has since closed
    pub applied: bool,
    pub auto_close_at: Option<Instant>,
}

/// Confirmation modal: `Closed -> Open -> Submitting -> Open -> Closed`
pub struct ConfirmationModal {
    phase: ModalPhase,
    payload: Option<ScanPayload>,
    view: Option<ModalView>,
    generation: u64,
    auto_close_at: Option<Instant>,
    timings: ModalConfig,
    timezone: Tz,
}

impl ConfirmationModal {
    pub fn new(timings: ModalConfig, timezone: Tz) -> Self {
        Self {
            phase: ModalPhase::Closed,
            payload: None,
            view: None,
            generation: 0,
            auto_close_at: None,
            timings,
            timezone,
        }
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    pub fn payload(&self) -> Option<&ScanPayload> {
        self.payload.as_ref()
    }

    pub fn view(&self) -> Option<&ModalView> {
        self.view.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn auto_close_at(&self) -> Option<Instant> {
        self.auto_close_at
    }

    /// Open for `payload`. Refused while another modal is up.
    pub fn open(&mut self, payload: ScanPayload) -> bool {
        self.open_at(payload, Utc::now())
    }

    pub fn open_at(&mut self, payload: ScanPayload, now: DateTime<Utc>) -> bool {
        if self.is_open() {
            warn!("Modal already open for {:?}, ignoring {}", self.payload, payload);
            return false;
        }

        self.generation += 1;
        self.view = Some(ModalView {
            email: payload.email.clone(),
            code: payload.event_code.clone(),
            opened_at: now.with_timezone(&self.timezone).format(TIMESTAMP_FORMAT).to_string(),
            badge: format!("Talk: {}", payload.event_code),
            info: None,
            confirm_label: CONFIRM_LABEL,
            confirm_enabled: true,
        });
        self.payload = Some(payload);
        self.phase = ModalPhase::Open;
        self.auto_close_at = None;
        info!("Modal {} opened", self.generation);
        true
    }

    /// Start a confirmation. `None` unless the modal is open and idle.
    pub fn begin_confirm(&mut self) -> Option<ConfirmRequest> {
        if self.phase != ModalPhase::Open {
            debug!("Confirm ignored in phase {:?}", self.phase);
            return None;
        }
        let payload = self.payload.clone()?;

        self.phase = ModalPhase::Submitting;
        if let Some(view) = self.view.as_mut() {
            view.confirm_label = CONFIRMING_LABEL;
            view.confirm_enabled = false;
            view.info = Some(InfoLine {
                text: SUBMITTING_INFO.to_string(),
                ok: true,
            });
        }

        Some(ConfirmRequest {
            generation: self.generation,
            request_id: Uuid::new_v4(),
            payload,
        })
    }

    /// Apply a finished confirmation call
    pub fn settle(
        &mut self,
        generation: u64,
        result: Result<ConfirmationStatus, ApiError>,
        now: Instant,
    ) -> Settlement {
        let (outcome, info, toast, close_after) = self.present(&result);
        let applied = generation == self.generation && self.phase == ModalPhase::Submitting;

        if applied {
            let deadline = now + close_after;
            self.auto_close_at = Some(match self.auto_close_at {
                Some(existing) => existing.min(deadline),
                None => deadline,
            });
            self.phase = ModalPhase::Open;
            if let Some(view) = self.view.as_mut() {
                view.confirm_label = CONFIRM_LABEL;
                view.confirm_enabled = true;
                view.info = Some(info.clone());
            }
        } else {
            debug!(
                "Confirmation for modal {} settled after it closed (current {})",
                generation, self.generation
            );
        }

        Settlement {
            outcome,
            toast,
            info,
            applied,
            auto_close_at: if applied { self.auto_close_at } else { None },
        }
    }

    fn present(
        &self,
        result: &Result<ConfirmationStatus, ApiError>,
    ) -> (ConfirmationOutcome, InfoLine, Toast, Duration) {
        let ms = Duration::from_millis;
        match result {
            Ok(ConfirmationStatus::Confirmed) => (
                ConfirmationOutcome::Confirmed,
                InfoLine {
                    text: "Attendance confirmed ✓".to_string(),
                    ok: true,
                },
                Toast::success("Attendance confirmed ✓", ms(self.timings.confirmed_toast_ms)),
                ms(self.timings.confirmed_close_ms),
            ),
            Ok(ConfirmationStatus::AlreadyConfirmed) => (
                ConfirmationOutcome::AlreadyConfirmed,
                InfoLine {
                    text: "Attendance was already confirmed ✓".to_string(),
                    ok: true,
                },
                Toast::success(
                    "Attendance already confirmed earlier ✓",
                    ms(self.timings.already_confirmed_toast_ms),
                ),
                ms(self.timings.already_confirmed_close_ms),
            ),
            Err(err) => {
                let message = confirmation_failure_message(err);
                (
                    ConfirmationOutcome::Failed {
                        message: message.clone(),
                    },
                    InfoLine {
                        text: message,
                        ok: false,
                    },
                    Toast::failure(
                        "Error confirming attendance",
                        ms(self.timings.failure_toast_ms),
                    ),
                    ms(self.timings.failure_close_ms),
                )
            }
        }
    }

    /// Close the modal. Returns the payload it was showing, `None` if already closed.
    pub fn close(&mut self) -> Option<ScanPayload> {
        if !self.is_open() {
            return None;
        }
        if self.phase == ModalPhase::Submitting {
            debug!("Modal {} closed with a confirmation in flight", self.generation);
        }
        self.phase = ModalPhase::Closed;
        self.view = None;
        self.auto_close_at = None;
        self.payload.take()
    }
}
