//! Shared test doubles.

use crate::api::{AttendanceApi, ConfirmationStatus, RegistrationStatus, TalkRecord};
use crate::decoder::QrDecoder;
use crate::error::ApiError;
use crate::frame::{FrameData, LumaBuffer};
use crate::registration::RegistrationRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub fn gray_frame(id: u64) -> FrameData {
    FrameData::new(id, SystemTime::now(), vec![200; 64], 8, 8)
}

#[derive(Default)]
struct ScriptState {
    in_view: Option<String>,
    calls: usize,
}

/// Decoder whose "visible" QR text is controlled by the test
#[derive(Clone, Default)]
pub struct ScriptedDecoder {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, text: &str) {
        self.state.lock().in_view = Some(text.to_string());
    }

    pub fn hide(&self) {
        self.state.lock().in_view = None;
    }

    /// Number of frames handed to the decoder
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }
}

impl QrDecoder for ScriptedDecoder {
    fn decode(&mut self, _image: &LumaBuffer) -> Option<String> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.in_view.clone()
    }
}

/// In-memory attendance API with scripted replies
#[derive(Default)]
pub struct FakeApi {
    pub talk: Mutex<Option<Result<TalkRecord, ApiError>>>,
    pub confirmations: Mutex<VecDeque<Result<ConfirmationStatus, ApiError>>>,
    pub registrations: Mutex<VecDeque<Result<RegistrationStatus, ApiError>>>,
    pub confirm_calls: Mutex<Vec<(String, String)>>,
    pub register_calls: Mutex<Vec<RegistrationRequest>>,
    pub talk_calls: Mutex<usize>,
    /// Artificial latency for confirmation calls
    pub confirm_delay: Mutex<Duration>,
}

impl FakeApi {
    pub fn with_talk(record: TalkRecord) -> Arc<Self> {
        let api = Self::default();
        *api.talk.lock() = Some(Ok(record));
        Arc::new(api)
    }

    pub fn push_confirmation(&self, reply: Result<ConfirmationStatus, ApiError>) {
        self.confirmations.lock().push_back(reply);
    }

    pub fn push_registration(&self, reply: Result<RegistrationStatus, ApiError>) {
        self.registrations.lock().push_back(reply);
    }
}

pub fn talk_record(code: &str) -> TalkRecord {
    TalkRecord {
        code: code.to_string(),
        description: "Rust in Production".to_string(),
        university: Some("Unicamp".to_string()),
        active: true,
        date: "10/11/2026".to_string(),
        time: "19:30".to_string(),
    }
}

#[async_trait]
impl AttendanceApi for FakeApi {
    async fn fetch_talk(&self, code: &str) -> Result<TalkRecord, ApiError> {
        *self.talk_calls.lock() += 1;
        self.talk
            .lock()
            .clone()
            .unwrap_or_else(|| Ok(talk_record(code)))
    }

    async fn confirm_attendance(
        &self,
        event_code: &str,
        email: &str,
    ) -> Result<ConfirmationStatus, ApiError> {
        self.confirm_calls
            .lock()
            .push((event_code.to_string(), email.to_string()));
        let delay = *self.confirm_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.confirmations
            .lock()
            .pop_front()
            .unwrap_or(Ok(ConfirmationStatus::Confirmed))
    }

    async fn register_attendee(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationStatus, ApiError> {
        self.register_calls.lock().push(request.clone());
        self.registrations
            .lock()
            .pop_front()
            .unwrap_or(Ok(RegistrationStatus::New))
    }
}
