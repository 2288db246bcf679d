//! Operator console: renders kiosk events as terminal lines.

use crate::error::Result;
use crate::events::{CloseReason, EventBus, EventFilter, EventReceiver, KioskEvent};
use crate::modal::CONFIRM_LABEL;
use crate::status::Severity;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const KEY_HELP: &str =
    "[S] start camera  [X] stop  [Enter] confirm  [Esc] cancel  [H] hide/show  [Q] quit";

/// One block of console output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub lines: Vec<String>,
    pub color: Option<Color>,
}

impl ConsoleLine {
    fn plain<S: Into<String>>(text: S) -> Self {
        Self {
            lines: vec![text.into()],
            color: None,
        }
    }

    fn colored<S: Into<String>>(text: S, color: Color) -> Self {
        Self {
            lines: vec![text.into()],
            color: Some(color),
        }
    }
}

fn severity_color(severity: Severity) -> Option<Color> {
    match severity {
        Severity::Info => None,
        Severity::Ok => Some(Color::Green),
        Severity::Error => Some(Color::Red),
    }
}

fn ok_color(ok: bool) -> Color {
    if ok {
        Color::Green
    } else {
        Color::Red
    }
}

/// Console rendering of an event; `None` for events with no visible effect
pub fn render(event: &KioskEvent) -> Option<ConsoleLine> {
    match event {
        KioskEvent::StatusChanged { status, .. } => Some(ConsoleLine {
            lines: vec![format!("Status: {}", status.message())],
            color: severity_color(status.severity()),
        }),
        KioskEvent::Toast { toast } => Some(ConsoleLine::colored(
            format!("» {}", toast.text),
            ok_color(toast.ok),
        )),
        KioskEvent::ControlsChanged {
            start_enabled,
            stop_enabled,
        } => Some(ConsoleLine::colored(
            format!(
                "Controls: start {}, stop {}",
                if *start_enabled { "enabled" } else { "disabled" },
                if *stop_enabled { "enabled" } else { "disabled" }
            ),
            Color::DarkGrey,
        )),
        KioskEvent::TalkLoaded {
            code,
            title,
            schedule,
        } => {
            let mut lines = vec![format!("Talk: {} ({})", title, code)];
            if !schedule.is_empty() {
                lines.push(schedule.clone());
            }
            Some(ConsoleLine {
                lines,
                color: Some(Color::Cyan),
            })
        }
        KioskEvent::ModalOpened { payload, opened_at } => Some(ConsoleLine {
            lines: vec![
                format!("┌ Confirm attendance  [Talk: {}]", payload.event_code),
                format!("│ Email: {}", payload.email),
                format!("│ Code:  {}", payload.event_code),
                format!("│ Read:  {}", opened_at),
                format!("│ [Enter] {}   [Esc] Cancel", CONFIRM_LABEL),
            ],
            color: Some(Color::Yellow),
        }),
        KioskEvent::ModalInfo { message, ok } => {
            Some(ConsoleLine::colored(format!("│ {}", message), ok_color(*ok)))
        }
        KioskEvent::ModalClosed { reason } => Some(ConsoleLine::colored(
            match reason {
                CloseReason::Cancelled => "└ Cancelled",
                CloseReason::AutoClose => "└ Closed",
                CloseReason::CameraStopped => "└ Closed (shutting down)",
            },
            Color::Yellow,
        )),
        KioskEvent::SystemError { component, error } => Some(ConsoleLine::colored(
            format!("Error in {}: {}", component, error),
            Color::Red,
        )),
        KioskEvent::ShutdownRequested { reason, .. } => {
            Some(ConsoleLine::plain(format!("Shutting down: {}", reason)))
        }
        KioskEvent::CameraStatusChanged { .. }
        | KioskEvent::ConfirmationSettled { .. }
        | KioskEvent::OperatorCommand { .. } => None,
    }
}

/// Write a block. Lines end in `\r\n` since the terminal is in raw mode.
pub fn write_line<W: Write>(out: &mut W, line: &ConsoleLine) -> io::Result<()> {
    if let Some(color) = line.color {
        queue!(out, SetForegroundColor(color))?;
    }
    for text in &line.lines {
        queue!(out, Print(text), Print("\r\n"))?;
    }
    if line.color.is_some() {
        queue!(out, ResetColor)?;
    }
    out.flush()
}

/// Renders bus events on stdout until stopped
pub struct ConsoleRenderer {
    event_bus: EventBus,
    cancellation_token: CancellationToken,
}

impl ConsoleRenderer {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Print the kiosk header and start following events
    pub async fn start(&self, header: Vec<String>) -> Result<()> {
        info!("Starting console renderer");
        let mut stdout = io::stdout();
        write_line(
            &mut stdout,
            &ConsoleLine {
                lines: header.into_iter().chain([KEY_HELP.to_string()]).collect(),
                color: Some(Color::Cyan),
            },
        )?;

        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::All,
            "console".to_string(),
        );
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let mut stdout = io::stdout();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = receiver.recv() => match event {
                        Ok(event) => {
                            if let Some(line) = render(&event) {
                                if let Err(e) = write_line(&mut stdout, &line) {
                                    warn!("Console write failed: {}", e);
                                }
                            }
                        }
                        Err(_) => break,
                    },
                }
            }
            debug!("Console renderer exited");
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.cancellation_token.cancel();
        Ok(())
    }
}
