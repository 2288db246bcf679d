use super::{Component, ComponentState, KioskOrchestrator};
use crate::error::Result;
use tracing::{error, info, warn};

impl KioskOrchestrator {
    /// Register components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing check-in kiosk components");

        self.component_states.register(Component::Talk);
        self.component_states.register(Component::Camera);
        if self.interactive {
            self.component_states.register(Component::Console);
            self.component_states.register(Component::Keyboard);
        }

        info!("All components initialized successfully");
        Ok(())
    }

    /// Load the talk, bring up the operator surface and optionally the camera
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting check-in kiosk");

        self.component_states
            .set(Component::Talk, ComponentState::Starting);
        let talk_state = if self.kiosk.load_talk().await {
            ComponentState::Running
        } else {
            // Not fatal: the kiosk stays up showing why it cannot scan
            ComponentState::Failed
        };
        self.component_states.set(Component::Talk, talk_state);

        if self.interactive {
            if let Some(console) = &self.console {
                self.component_states
                    .set(Component::Console, ComponentState::Starting);
                console.start(self.header()).await.map_err(|e| {
                    error!("Failed to start console: {}", e);
                    e
                })?;
                self.component_states
                    .set(Component::Console, ComponentState::Running);
            }

            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.component_states
                    .set(Component::Keyboard, ComponentState::Starting);
                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;
                self.component_states
                    .set(Component::Keyboard, ComponentState::Running);
            }
        }

        if self.config.camera.auto_start {
            self.component_states
                .set(Component::Camera, ComponentState::Starting);
            if self.kiosk.start_camera().await.is_some() {
                self.component_states
                    .set(Component::Camera, ComponentState::Running);
            } else {
                warn!("Camera did not start automatically");
                self.component_states
                    .set(Component::Camera, ComponentState::Stopped);
            }
        }

        info!("Check-in kiosk started");
        Ok(())
    }

    /// Lines printed above the event log
    pub(super) fn header(&self) -> Vec<String> {
        let mut lines = vec![self.kiosk.pill()];
        match self.kiosk.talk() {
            Some(talk) => {
                lines.push(talk.title().to_string());
                lines.extend(talk.university_line());
                lines.extend(talk.schedule_line());
            }
            None => lines.push("—".to_string()),
        }
        lines
    }
}
