pub mod api;
pub mod app;
pub mod camera;
pub mod config;
pub mod console;
pub mod decoder;
pub mod error;
pub mod events;
pub mod frame;
pub mod keyboard_input;
pub mod kiosk;
pub mod modal;
pub mod registration;
pub mod scanner;
pub mod status;
pub mod talk;

#[cfg(test)]
mod testing;

pub use api::{AttendanceApi, HttpAttendanceApi, TalkRecord};
pub use app::{Component, ComponentState, KioskOrchestrator, ShutdownReason};
pub use camera::{CameraSession, CaptureDevice, MockCaptureDevice};
pub use config::KioskConfig;
pub use decoder::{QrDecoder, RqrrDecoder};
pub use error::{KioskError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, KioskEvent, OperatorCommand};
pub use frame::FrameData;
pub use kiosk::CheckinKiosk;
pub use modal::ConfirmationModal;
pub use registration::{Registrar, RegistrationForm};
pub use scanner::{ScanLoopController, ScanPayload};
pub use status::{KioskStatus, Toast};
pub use talk::TalkInfo;
