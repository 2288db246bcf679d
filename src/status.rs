//! Presentation layer: maps kiosk state and error kinds to operator-facing text.

use crate::error::{ApiError, CameraError, ScanError, TalkError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Visual weight of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Ok,
    Error,
}

/// What the status line is currently reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KioskStatus {
    Idle,
    OpeningCamera,
    CameraActive,
    Stopped,
    PausedHidden,
    CameraFailed { kind: CameraFailure },
    InvalidFormat,
    WrongTalk,
    Detected,
    MissingCode,
    TalkUnavailable { reason: TalkFailure },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraFailure {
    PermissionDenied,
    DeviceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TalkFailure {
    NotFound,
    Inactive,
    Unreachable,
}

impl KioskStatus {
    pub fn message(&self) -> &'static str {
        match self {
            KioskStatus::Idle => "Ready. Press S to start the camera.",
            KioskStatus::OpeningCamera => "Opening camera…",
            KioskStatus::CameraActive => "Camera active…",
            KioskStatus::Stopped => "Stopped.",
            KioskStatus::PausedHidden => "Paused (kiosk hidden)…",
            KioskStatus::CameraFailed {
                kind: CameraFailure::PermissionDenied,
            } => "Error opening camera: permission denied",
            KioskStatus::CameraFailed {
                kind: CameraFailure::DeviceUnavailable,
            } => "Error opening camera: device unavailable",
            KioskStatus::InvalidFormat => {
                "Error: invalid QR code (the QR code does not have the expected format)"
            }
            KioskStatus::WrongTalk => {
                "Error: talk not found (the QR code is well formed but belongs to another talk)"
            }
            KioskStatus::Detected => "QR detected",
            KioskStatus::MissingCode => "Provide the talk code with --code CODE.",
            KioskStatus::TalkUnavailable {
                reason: TalkFailure::NotFound,
            } => "Talk not found",
            KioskStatus::TalkUnavailable {
                reason: TalkFailure::Inactive,
            } => "Talk inactive",
            KioskStatus::TalkUnavailable {
                reason: TalkFailure::Unreachable,
            } => "Could not reach the attendance API",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            KioskStatus::Detected => Severity::Ok,
            KioskStatus::CameraFailed { .. }
            | KioskStatus::InvalidFormat
            | KioskStatus::WrongTalk
            | KioskStatus::MissingCode
            | KioskStatus::TalkUnavailable { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl From<&CameraError> for KioskStatus {
    fn from(err: &CameraError) -> Self {
        let kind = match err {
            CameraError::PermissionDenied { .. } => CameraFailure::PermissionDenied,
            CameraError::DeviceUnavailable { .. } => CameraFailure::DeviceUnavailable,
        };
        KioskStatus::CameraFailed { kind }
    }
}

impl From<&ScanError> for KioskStatus {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::InvalidFormat { .. } => KioskStatus::InvalidFormat,
            ScanError::TalkMismatch { .. } => KioskStatus::WrongTalk,
        }
    }
}

impl From<&TalkError> for KioskStatus {
    fn from(err: &TalkError) -> Self {
        match err {
            TalkError::MissingCode => KioskStatus::MissingCode,
            TalkError::NotFound { .. } => KioskStatus::TalkUnavailable {
                reason: TalkFailure::NotFound,
            },
            TalkError::Inactive { .. } => KioskStatus::TalkUnavailable {
                reason: TalkFailure::Inactive,
            },
            TalkError::Unavailable(_) => KioskStatus::TalkUnavailable {
                reason: TalkFailure::Unreachable,
            },
        }
    }
}

/// Transient notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub text: String,
    pub ok: bool,
    pub duration: Duration,
}

impl Toast {
    pub fn success<S: Into<String>>(text: S, duration: Duration) -> Self {
        Self {
            text: text.into(),
            ok: true,
            duration,
        }
    }

    pub fn failure<S: Into<String>>(text: S, duration: Duration) -> Self {
        Self {
            text: text.into(),
            ok: false,
            duration,
        }
    }
}

/// Modal info line for a failed confirmation. Remote messages are shown verbatim.
pub fn confirmation_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Rejected { message } => message
            .clone()
            .unwrap_or_else(|| "Failed to confirm".to_string()),
        _ => "Error while confirming".to_string(),
    }
}
