use super::state::{SessionPhase, SessionState};
use super::targets::{CaptureMode, TargetSet};
use crate::error::CameraError;
use crate::hal::{
    DeviceHandle, DeviceId, Generation, HardwareEvent, SessionHandle, SessionId, SurfaceId,
};
use std::mem;
use tracing::{debug, info, warn};

/// Inputs the machine consumes: application commands and hardware completions
#[derive(Debug)]
pub enum SessionInput {
    Open {
        device_id: String,
        targets: TargetSet,
    },
    Configure {
        targets: TargetSet,
    },
    Reconfigure {
        targets: TargetSet,
    },
    Close,
    Hardware(HardwareEvent),
    /// A request issued through an effect failed synchronously
    Rejected {
        generation: Generation,
        error: CameraError,
    },
}

/// Side effects for the executor, in the order they must run
#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
    OpenDevice {
        device_id: String,
        generation: Generation,
    },
    CreateSession {
        device: DeviceId,
        surfaces: Vec<SurfaceId>,
        generation: Generation,
    },
    StartRepeating {
        session: SessionId,
        targets: TargetSet,
    },
    CloseSession(SessionHandle),
    CloseDevice(DeviceHandle),
    ReleaseStillSink,
    ReleaseEncoder,
    Report(CameraError),
}

/// The session that requests may currently be submitted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub session: SessionId,
    pub targets: TargetSet,
}

/// Device/session lifecycle as a pure transition function.
///
/// Owns the device and session handles. Every hardware completion is matched
/// against the generation of the request it answers; anything else is stale.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    device_id: Option<String>,
    device_generation: Option<Generation>,
    targets: Option<TargetSet>,
    still_sink_held: bool,
    last_generation: u64,
    /// Request left in flight by a voluntary close; blocks reopening until answered
    abandoned: Option<Generation>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Closed,
            device_id: None,
            device_generation: None,
            targets: None,
            still_sink_held: false,
            last_generation: 0,
            abandoned: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn targets(&self) -> Option<TargetSet> {
        self.targets
    }

    /// Request a previous close left unanswered, if any
    pub fn abandoned_request(&self) -> Option<Generation> {
        self.abandoned
    }

    pub fn mode(&self) -> Option<CaptureMode> {
        self.targets.map(|targets| targets.mode())
    }

    pub fn active(&self) -> Option<ActiveSession> {
        match (&self.state, self.targets) {
            (SessionState::Active { session, .. }, Some(targets)) => Some(ActiveSession {
                session: session.id(),
                targets,
            }),
            _ => None,
        }
    }

    pub fn handle(&mut self, input: SessionInput) -> Result<Vec<Effect>, CameraError> {
        match input {
            SessionInput::Open { device_id, targets } => self.open(&device_id, targets),
            SessionInput::Configure { targets } => self.configure(targets),
            SessionInput::Reconfigure { targets } => self.reconfigure(targets),
            SessionInput::Close => Ok(self.close()),
            SessionInput::Hardware(event) => Ok(self.on_hardware_event(event)),
            SessionInput::Rejected { generation, error } => {
                Ok(self.on_request_rejected(generation, error))
            }
        }
    }

    /// Closed → Opening. The still-image sink bound in `targets` is owned from here on.
    pub fn open(
        &mut self,
        device_id: &str,
        targets: TargetSet,
    ) -> Result<Vec<Effect>, CameraError> {
        if !self.is_closed() {
            return Err(CameraError::InvalidState {
                operation: "open",
                phase: self.phase(),
            });
        }

        if let Some(generation) = self.abandoned {
            return Err(CameraError::RequestPending { generation });
        }

        let generation = self.issue_generation();
        info!("Opening camera {} (request {})", device_id, generation);

        self.state = SessionState::Opening { generation };
        self.device_id = Some(device_id.to_string());
        self.device_generation = Some(generation);
        self.targets = Some(targets);
        self.still_sink_held = true;

        Ok(vec![Effect::OpenDevice {
            device_id: device_id.to_string(),
            generation,
        }])
    }

    /// Open/Active → Configuring. An existing session is released before the new one
    /// is requested.
    pub fn configure(&mut self, targets: TargetSet) -> Result<Vec<Effect>, CameraError> {
        match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open { device } => {
                Ok(self.request_session(device, targets, Vec::new(), false))
            }
            SessionState::Active { device, session } => {
                let effects = vec![Effect::CloseSession(session)];
                Ok(self.request_session(device, targets, effects, false))
            }
            other => {
                let phase = other.phase();
                self.state = other;
                Err(CameraError::InvalidState {
                    operation: "configure",
                    phase,
                })
            }
        }
    }

    /// Active → Reconfiguring with a new target set
    pub fn reconfigure(&mut self, targets: TargetSet) -> Result<Vec<Effect>, CameraError> {
        match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Active { device, session } => {
                info!(
                    "Reconfiguring session {:?} for {}",
                    session.id(),
                    targets.mode()
                );
                let effects = vec![Effect::CloseSession(session)];
                Ok(self.request_session(device, targets, effects, true))
            }
            other => {
                self.state = other;
                Err(CameraError::SessionUnavailable {
                    operation: "reconfigure",
                })
            }
        }
    }

    /// Release everything and return to Closed. A no-op when already closed.
    pub fn close(&mut self) -> Vec<Effect> {
        if self.is_closed() {
            debug!("Close requested on closed session");
            return Vec::new();
        }

        info!("Closing camera session from {}", self.phase());
        self.abandoned = match self.state {
            SessionState::Opening { generation } => Some(generation),
            _ => self.state.pending_session(),
        };
        if let Some(generation) = self.abandoned {
            debug!("Request {} left in flight by close", generation);
        }
        self.teardown()
    }

    pub fn on_hardware_event(&mut self, event: HardwareEvent) -> Vec<Effect> {
        if let Some(generation) = event.generation() {
            self.settle_abandoned(generation);
        }

        match event {
            HardwareEvent::DeviceOpened { generation, device } => {
                self.on_device_opened(generation, device)
            }
            HardwareEvent::DeviceDisconnected { generation } => {
                if !self.is_current_device(generation) {
                    debug!("Ignoring stale disconnect for request {}", generation);
                    return Vec::new();
                }
                let device_id = self.device_id.clone().unwrap_or_default();
                self.fail(CameraError::DeviceDisconnected { device_id })
            }
            HardwareEvent::DeviceError { generation, code } => {
                if !self.is_current_device(generation) {
                    debug!("Ignoring stale device error {} for request {}", code, generation);
                    return Vec::new();
                }
                let device_id = self.device_id.clone().unwrap_or_default();
                self.fail(CameraError::DeviceError { device_id, code })
            }
            HardwareEvent::SessionConfigured {
                generation,
                session,
            } => self.on_session_configured(generation, session),
            HardwareEvent::SessionConfigureFailed { generation } => {
                if self.state.pending_session() != Some(generation) {
                    debug!("Ignoring stale configure failure for request {}", generation);
                    return Vec::new();
                }
                self.fail(CameraError::ConfigurationFailure {
                    details: "capture session rejected by camera".to_string(),
                })
            }
            HardwareEvent::ImageAvailable => Vec::new(),
        }
    }

    /// A request issued by an effect failed before the hardware accepted it
    pub fn on_request_rejected(
        &mut self,
        generation: Generation,
        error: CameraError,
    ) -> Vec<Effect> {
        self.settle_abandoned(generation);

        if self.is_opening(generation) || self.state.pending_session() == Some(generation) {
            return self.fail(error);
        }

        debug!("Ignoring rejection of stale request {}: {}", generation, error);
        Vec::new()
    }

    fn on_device_opened(&mut self, generation: Generation, device: DeviceHandle) -> Vec<Effect> {
        if !self.is_opening(generation) {
            warn!(
                "Releasing device {:?} opened by stale request {}",
                device.id(),
                generation
            );
            return vec![Effect::CloseDevice(device)];
        }

        debug!("Camera device {:?} opened", device.id());
        self.state = SessionState::Open { device };

        let Some(targets) = self.targets else {
            return self.fail(CameraError::ConfigurationFailure {
                details: "no capture targets to configure".to_string(),
            });
        };

        match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open { device } => {
                self.request_session(device, targets, Vec::new(), false)
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    fn on_session_configured(
        &mut self,
        generation: Generation,
        session: SessionHandle,
    ) -> Vec<Effect> {
        if self.state.pending_session() != Some(generation) {
            warn!(
                "Releasing session {:?} configured by stale request {}",
                session.id(),
                generation
            );
            return vec![Effect::CloseSession(session)];
        }

        let previous = mem::replace(&mut self.state, SessionState::Closed);
        let (device, targets) = match (previous, self.targets) {
            (SessionState::Configuring { device, .. }, Some(targets))
            | (SessionState::Reconfiguring { device, .. }, Some(targets)) => (device, targets),
            (other, _) => {
                self.state = other;
                return vec![Effect::CloseSession(session)];
            }
        };

        info!("Session {:?} active for {}", session.id(), targets.mode());
        let session_id = session.id();
        self.state = SessionState::Active { device, session };

        vec![Effect::StartRepeating {
            session: session_id,
            targets,
        }]
    }

    fn request_session(
        &mut self,
        device: DeviceHandle,
        targets: TargetSet,
        mut effects: Vec<Effect>,
        reconfiguring: bool,
    ) -> Vec<Effect> {
        let generation = self.issue_generation();
        debug!(
            "Requesting {} session on {:?} (request {})",
            targets.mode(),
            device.id(),
            generation
        );

        effects.push(Effect::CreateSession {
            device: device.id(),
            surfaces: targets.session_surfaces(),
            generation,
        });

        self.targets = Some(targets);
        self.state = if reconfiguring {
            SessionState::Reconfiguring { device, generation }
        } else {
            SessionState::Configuring { device, generation }
        };

        effects
    }

    fn fail(&mut self, error: CameraError) -> Vec<Effect> {
        warn!("Camera session failed in {}: {}", self.phase(), error);
        let mut effects = self.teardown();
        effects.push(Effect::Report(error));
        effects
    }

    /// Session, device, still sink, encoder: always in that order
    fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let was_open = !self.is_closed();

        match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Closed | SessionState::Opening { .. } => {}
            SessionState::Open { device }
            | SessionState::Configuring { device, .. }
            | SessionState::Reconfiguring { device, .. } => {
                effects.push(Effect::CloseDevice(device));
            }
            SessionState::Active { device, session } => {
                effects.push(Effect::CloseSession(session));
                effects.push(Effect::CloseDevice(device));
            }
        }

        if self.still_sink_held {
            self.still_sink_held = false;
            effects.push(Effect::ReleaseStillSink);
        }

        if was_open {
            effects.push(Effect::ReleaseEncoder);
        }

        self.device_id = None;
        self.device_generation = None;
        self.targets = None;

        effects
    }

    fn settle_abandoned(&mut self, generation: Generation) {
        if self.abandoned == Some(generation) {
            debug!("Abandoned request {} has completed", generation);
            self.abandoned = None;
        }
    }

    fn is_opening(&self, generation: Generation) -> bool {
        matches!(self.state, SessionState::Opening { generation: g } if g == generation)
    }

    fn is_current_device(&self, generation: Generation) -> bool {
        !self.is_closed() && self.device_generation == Some(generation)
    }

    fn issue_generation(&mut self) -> Generation {
        self.last_generation += 1;
        Generation(self.last_generation)
    }
}
