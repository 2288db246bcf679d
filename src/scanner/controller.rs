use super::payload::ScanPayload;
use crate::decoder::QrDecoder;
use crate::error::{FrameError, ScanError};
use crate::frame::{FrameData, LumaBuffer};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// Mutable loop state
#[derive(Debug, Clone)]
pub struct ScanLoopState {
    /// Mirrors whether the camera session is live
    pub running: bool,
    /// Last matched payload; suppresses repeat triggers until the modal closes
    pub last_payload: Option<ScanPayload>,
    pub next_allowed_scan: Instant,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Loop not running, paused, or gated by the modal
    Skipped,
    CoolingDown,
    NoFrame,
    Unreadable(FrameError),
    NoCode,
    Invalid(ScanError),
    Mismatch(ScanError),
    /// Same payload as the one already awaiting confirmation
    Repeated(ScanPayload),
    Detected(ScanPayload),
}

/// Periodic frame sampling with cooldown and deduplication
pub struct ScanLoopController {
    decoder: Box<dyn QrDecoder>,
    buffer: LumaBuffer,
    state: ScanLoopState,
    armed: bool,
    cooldown: Duration,
    expected_code: String,
}

impl ScanLoopController {
    pub fn new(decoder: Box<dyn QrDecoder>, expected_code: String, cooldown: Duration) -> Self {
        Self {
            decoder,
            buffer: LumaBuffer::new(),
            state: ScanLoopState {
                running: false,
                last_payload: None,
                next_allowed_scan: Instant::now(),
            },
            armed: false,
            cooldown,
            expected_code,
        }
    }

    pub fn state(&self) -> &ScanLoopState {
        &self.state
    }

    pub fn expected_code(&self) -> &str {
        &self.expected_code
    }

    /// Whether ticks are currently being scheduled
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn set_running(&mut self, running: bool) {
        self.state.running = running;
        if !running {
            self.pause();
        }
    }

    /// Stop scheduling ticks; the camera is left alone
    pub fn pause(&mut self) {
        if self.armed {
            debug!("Scan loop paused");
        }
        self.armed = false;
    }

    /// Re-arm ticking when running and ungated. The cooldown restarts from `now` either way.
    pub fn resume(&mut self, modal_open: bool, now: Instant) -> bool {
        self.arm_cooldown(now);
        if self.state.running && !modal_open {
            if !self.armed {
                debug!("Scan loop resumed");
            }
            self.armed = true;
        }
        self.armed
    }

    pub fn arm_cooldown(&mut self, now: Instant) {
        self.state.next_allowed_scan = now + self.cooldown;
    }

    /// Forget the last matched payload so the same code can trigger again
    pub fn clear_last_payload(&mut self) {
        self.state.last_payload = None;
    }

    /// Sample one frame
    pub fn tick(&mut self, frame: Option<&FrameData>, modal_open: bool, now: Instant) -> ScanOutcome {
        if !self.state.running || !self.armed || modal_open {
            return ScanOutcome::Skipped;
        }
        if now < self.state.next_allowed_scan {
            return ScanOutcome::CoolingDown;
        }
        let Some(frame) = frame else {
            return ScanOutcome::NoFrame;
        };

        if let Err(e) = self.buffer.fill_from(frame) {
            debug!("Skipping unreadable frame {}: {}", frame.id, e);
            self.arm_cooldown(now);
            return ScanOutcome::Unreadable(e);
        }

        match self.decoder.decode(&self.buffer) {
            Some(text) => self.evaluate(&text, now),
            None => {
                trace!("No QR code in frame {}", frame.id);
                ScanOutcome::NoCode
            }
        }
    }

    /// Apply format, talk and dedup policy to decoded text. Always arms the cooldown.
    pub fn evaluate(&mut self, text: &str, now: Instant) -> ScanOutcome {
        let outcome = match ScanPayload::parse(text) {
            Err(e) => {
                debug!("Rejected QR payload: {}", e);
                ScanOutcome::Invalid(e)
            }
            Ok(payload) if payload.event_code != self.expected_code => {
                debug!("QR payload for another talk: {}", payload);
                ScanOutcome::Mismatch(ScanError::TalkMismatch {
                    expected: self.expected_code.clone(),
                    found: payload.event_code,
                })
            }
            Ok(payload) if self.state.last_payload.as_ref() == Some(&payload) => {
                trace!("Ignoring repeated payload {}", payload);
                ScanOutcome::Repeated(payload)
            }
            Ok(payload) => {
                info!("QR detected: {}", payload);
                self.state.last_payload = Some(payload.clone());
                ScanOutcome::Detected(payload)
            }
        };

        self.arm_cooldown(now);
        outcome
    }
}
