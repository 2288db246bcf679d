use crate::error::EventBusError;
use crate::scanner::ScanPayload;
use crate::status::{KioskStatus, Toast};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Operator actions, the console counterpart of the page's buttons and keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorCommand {
    StartCamera,
    StopCamera,
    Confirm,
    /// Escape key, cancel button or a click on the modal backdrop
    Cancel,
    /// The kiosk window lost or regained focus
    SetVisible(bool),
    ToggleVisibility,
    Quit,
}

/// Why the confirmation modal closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    Cancelled,
    AutoClose,
    CameraStopped,
}

/// Final state of a confirmation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationOutcome {
    Confirmed,
    AlreadyConfirmed,
    Failed { message: String },
}

/// Events that can occur in the check-in kiosk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KioskEvent {
    /// The status line changed
    StatusChanged {
        status: KioskStatus,
        timestamp: SystemTime,
    },
    /// A transient notification should be shown
    Toast { toast: Toast },
    /// Start/stop control availability changed
    ControlsChanged {
        start_enabled: bool,
        stop_enabled: bool,
    },
    /// Camera went live or was released
    CameraStatusChanged {
        live: bool,
        timestamp: SystemTime,
    },
    /// Talk metadata is available for display
    TalkLoaded {
        code: String,
        title: String,
        schedule: String,
    },
    /// A matching QR code opened the confirmation modal
    ModalOpened {
        payload: ScanPayload,
        opened_at: String,
    },
    /// The modal info line changed
    ModalInfo { message: String, ok: bool },
    /// The confirmation modal closed
    ModalClosed { reason: CloseReason },
    /// A confirmation call finished
    ConfirmationSettled {
        payload: ScanPayload,
        outcome: ConfirmationOutcome,
    },
    /// An operator key was pressed
    OperatorCommand { command: OperatorCommand },
    /// A component failed in a recoverable way
    SystemError { component: String, error: String },
    /// Kiosk shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl KioskEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            KioskEvent::StatusChanged { status, .. } => {
                format!("Status: {}", status.message())
            }
            KioskEvent::Toast { toast } => format!("Toast: {}", toast.text),
            KioskEvent::ControlsChanged {
                start_enabled,
                stop_enabled,
            } => format!(
                "Controls: start={} stop={}",
                start_enabled, stop_enabled
            ),
            KioskEvent::CameraStatusChanged { live, .. } => {
                format!("Camera {}", if *live { "live" } else { "released" })
            }
            KioskEvent::TalkLoaded { code, title, .. } => {
                format!("Talk loaded: {} ({})", title, code)
            }
            KioskEvent::ModalOpened { payload, .. } => {
                format!("Modal opened for {}", payload)
            }
            KioskEvent::ModalInfo { message, .. } => format!("Modal info: {}", message),
            KioskEvent::ModalClosed { reason } => format!("Modal closed: {:?}", reason),
            KioskEvent::ConfirmationSettled { payload, outcome } => {
                format!("Confirmation for {}: {:?}", payload, outcome)
            }
            KioskEvent::OperatorCommand { command } => format!("Operator: {:?}", command),
            KioskEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            KioskEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            KioskEvent::StatusChanged { .. } => "status_changed",
            KioskEvent::Toast { .. } => "toast",
            KioskEvent::ControlsChanged { .. } => "controls_changed",
            KioskEvent::CameraStatusChanged { .. } => "camera_status_changed",
            KioskEvent::TalkLoaded { .. } => "talk_loaded",
            KioskEvent::ModalOpened { .. } => "modal_opened",
            KioskEvent::ModalInfo { .. } => "modal_info",
            KioskEvent::ModalClosed { .. } => "modal_closed",
            KioskEvent::ConfirmationSettled { .. } => "confirmation_settled",
            KioskEvent::OperatorCommand { .. } => "operator_command",
            KioskEvent::SystemError { .. } => "system_error",
            KioskEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<KioskEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: KioskEvent) -> Result<usize, EventBusError> {
        match &event {
            KioskEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            KioskEvent::CameraStatusChanged { live, .. } => {
                if *live {
                    info!("Camera live");
                } else {
                    info!("Camera released");
                }
            }
            KioskEvent::ConfirmationSettled { payload, outcome } => match outcome {
                ConfirmationOutcome::Failed { message } => {
                    warn!("Confirmation failed for {}: {}", payload, message)
                }
                _ => info!("Confirmation for {}: {:?}", payload, outcome),
            },
            KioskEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish without caring whether anyone is listening
    pub fn emit(&self, event: KioskEvent) {
        let _ = self.publish(event);
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &KioskEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering capabilities
pub struct EventReceiver {
    receiver: broadcast::Receiver<KioskEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<KioskEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event. Lagging is logged and skipped.
    pub async fn recv(&mut self) -> Result<KioskEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
