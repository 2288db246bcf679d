use crate::error::Result;
use crate::events::{EventBus, KioskEvent, OperatorCommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Operator key bindings
pub fn command_for_key(key: &KeyEvent) -> Option<OperatorCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(OperatorCommand::Quit)
        }
        KeyCode::Char('s') | KeyCode::Char('S') => Some(OperatorCommand::StartCamera),
        KeyCode::Char('x') | KeyCode::Char('X') => Some(OperatorCommand::StopCamera),
        KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char('C') => Some(OperatorCommand::Confirm),
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => Some(OperatorCommand::Cancel),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(OperatorCommand::ToggleVisibility),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(OperatorCommand::Quit),
        _ => None,
    }
}

/// Reads operator keys from the terminal and publishes them as commands
pub struct KeyboardInputHandler {
    event_bus: EventBus,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler");

        let event_bus = self.event_bus.clone();
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }
            debug!("Raw mode enabled");

            while !cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key)) = event::read() else {
                            continue;
                        };
                        let Some(command) = command_for_key(&key) else {
                            debug!("Unbound key: {:?}", key.code);
                            continue;
                        };

                        debug!("Operator command: {:?}", command);
                        if let Err(e) = event_bus.publish(KioskEvent::OperatorCommand { command }) {
                            warn!("Failed to publish operator command: {}", e);
                        }
                        if command == OperatorCommand::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
