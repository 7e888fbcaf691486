use crate::hal::{DeviceHandle, Generation, SessionHandle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally visible lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    Closed,
    Opening,
    Open,
    Configuring,
    Active,
    Reconfiguring,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Closed => "closed",
            SessionPhase::Opening => "opening",
            SessionPhase::Open => "open",
            SessionPhase::Configuring => "configuring",
            SessionPhase::Active => "active",
            SessionPhase::Reconfiguring => "reconfiguring",
        };
        f.write_str(name)
    }
}

/// Internal state. Each variant owns exactly the handles that are live in it.
#[derive(Debug)]
pub(super) enum SessionState {
    Closed,
    Opening {
        generation: Generation,
    },
    Open {
        device: DeviceHandle,
    },
    Configuring {
        device: DeviceHandle,
        generation: Generation,
    },
    Active {
        device: DeviceHandle,
        session: SessionHandle,
    },
    Reconfiguring {
        device: DeviceHandle,
        generation: Generation,
    },
}

impl SessionState {
    pub(super) fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Closed => SessionPhase::Closed,
            SessionState::Opening { .. } => SessionPhase::Opening,
            SessionState::Open { .. } => SessionPhase::Open,
            SessionState::Configuring { .. } => SessionPhase::Configuring,
            SessionState::Active { .. } => SessionPhase::Active,
            SessionState::Reconfiguring { .. } => SessionPhase::Reconfiguring,
        }
    }

    /// Generation of the session request this state is waiting on
    pub(super) fn pending_session(&self) -> Option<Generation> {
        match self {
            SessionState::Configuring { generation, .. }
            | SessionState::Reconfiguring { generation, .. } => Some(*generation),
            _ => None,
        }
    }
}
