use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Talk error: {0}")]
    Talk(#[from] TalkError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl KioskError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Capture device acquisition failures. Never fatal: the start control stays retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied: {details}")]
    PermissionDenied { details: String },

    #[error("Camera device unavailable: {details}")]
    DeviceUnavailable { details: String },
}

/// Problems with a decoded QR text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Malformed QR payload: {text:?}")]
    InvalidFormat { text: String },

    #[error("QR payload is for talk {found}, expected {expected}")]
    TalkMismatch { expected: String, found: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {details}")]
    Network { details: String },

    #[error("HTTP status {status}")]
    Http { status: u16 },

    /// The endpoint answered `ok: false`
    #[error("Request rejected: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String> },

    #[error("Invalid response: {details}")]
    InvalidResponse { details: String },
}

impl ApiError {
    /// Message reported by the remote endpoint, if any
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse {
                details: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
            }
        } else {
            ApiError::Network {
                details: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TalkError {
    #[error("No talk code was provided")]
    MissingCode,

    #[error("Talk {code} was not found")]
    NotFound { code: String },

    #[error("Talk {code} is inactive")]
    Inactive { code: String },

    #[error("Talk lookup failed: {0}")]
    Unavailable(ApiError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Graduation year must have 4 digits, got {value:?}")]
    InvalidGraduationYear { value: String },

    #[error("Unknown semester {value:?}")]
    InvalidSemester { value: String },

    #[error("Registration is blocked: {0}")]
    Blocked(TalkError),

    #[error("QR encoding failed: {details}")]
    QrEncoding { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, KioskError>;
