use super::{Component, ComponentState, KioskOrchestrator, ShutdownReason};
use crate::error::{KioskError, Result};
use crate::events::{KioskEvent, OperatorCommand};
use crate::kiosk::Wakeup;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// What woke the run loop
enum Step {
    Shutdown(ShutdownReason),
    Command(OperatorCommand),
    Kiosk(Wakeup),
    Ignore,
}

impl KioskOrchestrator {
    /// Run the kiosk until a signal or the operator asks to quit
    pub async fn run(&mut self) -> Result<i32> {
        info!("Check-in kiosk is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| KioskError::system("Shutdown sender already taken"))?;
        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| KioskError::system("Shutdown receiver already taken"))?;
        let mut commands = self
            .commands
            .take()
            .ok_or_else(|| KioskError::system("Command receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender).await;

        let reason = loop {
            let step = tokio::select! {
                reason = &mut shutdown_receiver => Step::Shutdown(reason.unwrap_or_else(|_| {
                    ShutdownReason::Error("Shutdown channel closed unexpectedly".to_string())
                })),
                event = commands.recv() => match event {
                    Ok(KioskEvent::OperatorCommand { command }) => Step::Command(command),
                    Ok(KioskEvent::ShutdownRequested { .. }) => Step::Shutdown(ShutdownReason::UserRequest),
                    Ok(_) => Step::Ignore,
                    Err(e) => Step::Shutdown(ShutdownReason::Error(e.to_string())),
                },
                wakeup = self.kiosk.next_wakeup() => Step::Kiosk(wakeup),
            };

            match step {
                Step::Shutdown(reason) => break reason,
                Step::Command(OperatorCommand::Quit) => break ShutdownReason::UserRequest,
                Step::Command(command) => {
                    debug!("Handling operator command {:?}", command);
                    self.kiosk.handle_command(command).await;
                    self.sync_camera_state();
                }
                Step::Kiosk(wakeup) => self.kiosk.handle_wakeup(wakeup),
                Step::Ignore => {}
            }
        };

        info!("Shutdown initiated: {}", reason);
        let exit_code = self.shutdown(reason).await?;

        info!("Check-in kiosk shutdown complete");
        Ok(exit_code)
    }

    fn sync_camera_state(&self) {
        let state = if self.kiosk.session().is_live() {
            ComponentState::Running
        } else {
            ComponentState::Stopped
        };
        self.component_states.set(Component::Camera, state);
    }

    /// Set up signal handlers for graceful shutdown
    async fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM"));
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT"));
                }
            }
        });
    }
}
