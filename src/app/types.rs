use std::fmt;

/// Lifecycle of an orchestrated component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentState::Stopped => "stopped",
            ComponentState::Starting => "starting",
            ComponentState::Running => "running",
            ComponentState::Stopping => "stopping",
            ComponentState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What ended the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "signal {}", name),
            ShutdownReason::UserRequest => f.write_str("user request"),
        }
    }
}
