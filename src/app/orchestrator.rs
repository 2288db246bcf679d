use super::state::ComponentStates;
use super::types::ShutdownReason;
use crate::api::{AttendanceApi, HttpAttendanceApi};
use crate::camera::{create_capture_device, CaptureDevice, MockCaptureDevice};
use crate::config::KioskConfig;
use crate::console::ConsoleRenderer;
use crate::decoder::RqrrDecoder;
use crate::error::Result;
use crate::events::{EventBus, EventFilter, EventReceiver};
use crate::keyboard_input::KeyboardInputHandler;
use crate::kiosk::CheckinKiosk;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owns the kiosk and the operator-facing components around it
pub struct KioskOrchestrator {
    pub(super) config: KioskConfig,
    pub(super) event_bus: EventBus,
    pub(super) kiosk: CheckinKiosk,

    // Operator surface
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) console: Option<ConsoleRenderer>,
    pub(super) interactive: bool,

    // Lifecycle management
    pub(super) commands: Option<EventReceiver>,
    pub(super) component_states: ComponentStates,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl KioskOrchestrator {
    /// Wire a kiosk that was already built against `event_bus`
    pub fn new(config: KioskConfig, kiosk: CheckinKiosk, event_bus: EventBus) -> Self {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let commands = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["operator_command", "shutdown_requested"]),
            "orchestrator".to_string(),
        );

        Self {
            config,
            keyboard_handler: Some(KeyboardInputHandler::new(event_bus.clone())),
            console: Some(ConsoleRenderer::new(event_bus.clone())),
            event_bus,
            kiosk,
            interactive: false,
            commands: Some(commands),
            component_states: ComponentStates::default(),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Build the production kiosk: configured camera, rqrr decoder, HTTP attendance API
    pub fn from_config(
        config: KioskConfig,
        talk_code: Option<String>,
        mock_image: Option<&Path>,
    ) -> Result<Self> {
        config.validate()?;
        let event_bus = EventBus::new(config.system.event_bus_capacity);

        let device: Arc<dyn CaptureDevice> = match mock_image {
            Some(path) => {
                info!("Using still image {} as the camera", path.display());
                Arc::new(MockCaptureDevice::from_image_file(path)?)
            }
            None => create_capture_device(&config.camera)?,
        };
        let api: Arc<dyn AttendanceApi> = Arc::new(HttpAttendanceApi::new(&config.api)?);

        let kiosk = CheckinKiosk::new(
            &config,
            device,
            Box::new(RqrrDecoder::new()),
            api,
            talk_code,
            event_bus.clone(),
        )?;

        Ok(Self::new(config, kiosk, event_bus))
    }

    /// Enable the keyboard handler and console renderer
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn kiosk(&self) -> &CheckinKiosk {
        &self.kiosk
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
