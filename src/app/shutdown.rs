use super::{Component, ComponentState, KioskOrchestrator, ShutdownReason};
use crate::error::{KioskError, Result};
use crate::events::KioskEvent;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;
use tracing::{error, info};

impl KioskOrchestrator {
    /// Stop every component in reverse start order and release the camera
    pub async fn shutdown(&mut self, reason: ShutdownReason) -> Result<i32> {
        info!("Beginning graceful shutdown: {}", reason);
        self.event_bus.emit(KioskEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: reason.to_string(),
        });

        self.cancellation_token.cancel();
        let mut exit_code = reason.exit_code();

        if self.interactive {
            for component in [Component::Keyboard, Component::Console] {
                if let Err(e) = self.stop_component(component).await {
                    error!("Error stopping {}: {}", component, e);
                    exit_code = 1;
                }
            }
        }

        self.component_states
            .set(Component::Camera, ComponentState::Stopping);
        self.kiosk.shutdown();
        self.component_states
            .set(Component::Camera, ComponentState::Stopped);

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop an operator-surface component with a timeout
    async fn stop_component(&mut self, component: Component) -> Result<()> {
        info!("Stopping {} component", component);
        self.component_states
            .set(component, ComponentState::Stopping);

        let limit = Duration::from_secs(2);
        let result = match component {
            Component::Keyboard => match &self.keyboard_handler {
                Some(handler) => timeout(limit, handler.stop()).await,
                None => Ok(Ok(())),
            },
            Component::Console => match &self.console {
                Some(console) => timeout(limit, console.stop()).await,
                None => Ok(Ok(())),
            },
            Component::Talk | Component::Camera => Ok(Ok(())),
        };

        match result {
            Ok(Ok(())) => {
                self.component_states
                    .set(component, ComponentState::Stopped);
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.component_states.set(component, ComponentState::Failed);
                error!("Error stopping {} component: {}", component, e);
                Err(e)
            }
            Err(_) => {
                self.component_states.set(component, ComponentState::Failed);
                error!("{} component stop timeout", component);
                Err(KioskError::component(
                    component.name(),
                    "stop timed out",
                ))
            }
        }
    }
}
