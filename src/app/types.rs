use std::fmt;

/// Parts of the kiosk whose lifecycle the orchestrator tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Talk,
    Camera,
    Console,
    Keyboard,
}

impl Component {
    pub fn name(&self) -> &'static str {
        match self {
            Component::Talk => "talk",
            Component::Camera => "camera",
            Component::Console => "console",
            Component::Keyboard => "keyboard",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why the kiosk is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(&'static str),
    Error(String),
    /// `q`, Ctrl-C in raw mode, or a published shutdown request
    UserRequest,
}

impl ShutdownReason {
    /// Process exit code reported for this reason
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Error(_) => 1,
            ShutdownReason::Signal(_) | ShutdownReason::UserRequest => 0,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::Error(message) => write!(f, "error: {}", message),
            ShutdownReason::UserRequest => f.write_str("operator quit"),
        }
    }
}
