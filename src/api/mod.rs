mod client;
mod types;

pub use client::{confirmation_form, AttendanceApi, HttpAttendanceApi};
pub use types::{
    ConfirmationStatus, RegistrationStatus, StatusResponse, TalkPayload, TalkRecord, TalkResponse,
};
