use crate::capture::{RequestDispatcher, StillImageSink};
use crate::error::CameraError;
use crate::events::{CameraEvent, EventBus, FatalErrorKind};
use crate::hal::CameraHal;
use crate::recording::SessionControl;
use crate::session::{Effect, SessionInput, SessionMachine, SessionPhase, TargetSet};
use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, warn};

/// Runs the session machine and executes the effects it emits against the HAL
pub(super) struct SessionDriver {
    pub(super) hal: Arc<dyn CameraHal>,
    pub(super) machine: SessionMachine,
    pub(super) dispatcher: RequestDispatcher,
    pub(super) sink: StillImageSink,
    pub(super) event_bus: Arc<EventBus>,
    reported_phase: SessionPhase,
    last_failure: Option<CameraError>,
    encoder_release_pending: bool,
    became_active: bool,
}

impl SessionDriver {
    pub(super) fn new(
        hal: Arc<dyn CameraHal>,
        sink: StillImageSink,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(Arc::clone(&hal)),
            hal,
            machine: SessionMachine::new(),
            sink,
            event_bus,
            reported_phase: SessionPhase::Closed,
            last_failure: None,
            encoder_release_pending: false,
            became_active: false,
        }
    }

    /// Feed one input to the machine and run everything it asks for
    pub(super) fn apply(&mut self, input: SessionInput) -> Result<(), CameraError> {
        let effects = self.machine.handle(input)?;
        self.execute(effects);
        self.publish_phase();
        Ok(())
    }

    pub(super) fn take_last_failure(&mut self) -> Option<CameraError> {
        self.last_failure.take()
    }

    pub(super) fn take_encoder_release(&mut self) -> bool {
        mem::take(&mut self.encoder_release_pending)
    }

    pub(super) fn take_became_active(&mut self) -> bool {
        mem::take(&mut self.became_active)
    }

    /// Publish a failure to the notification side
    pub(super) fn report(&mut self, failure: CameraError) {
        match FatalErrorKind::from_error(&failure) {
            Some(kind) => self.event_bus.notify(CameraEvent::FatalError {
                kind,
                message: failure.to_string(),
            }),
            None => warn!("Camera request rejected: {}", failure),
        }
        self.last_failure = Some(failure);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::OpenDevice {
                    device_id,
                    generation,
                } => {
                    if let Err(e) = self.hal.open_device(&device_id, generation) {
                        queue.extend(self.machine.on_request_rejected(generation, e));
                    }
                }
                Effect::CreateSession {
                    device,
                    surfaces,
                    generation,
                } => {
                    if let Err(e) = self.hal.create_session(device, &surfaces, generation) {
                        queue.extend(self.machine.on_request_rejected(generation, e));
                    }
                }
                Effect::StartRepeating { session, targets } => {
                    match self.dispatcher.start_repeating(self.machine.active()) {
                        Ok(mode) => {
                            self.event_bus.notify(CameraEvent::PreviewStarted { mode });
                            self.became_active = true;
                        }
                        Err(e) => {
                            error!(
                                "Repeating {} request on {:?} failed: {}",
                                targets.mode(),
                                session,
                                e
                            );
                            queue.extend(self.machine.close());
                            self.report(CameraError::ConfigurationFailure {
                                details: e.to_string(),
                            });
                        }
                    }
                }
                Effect::CloseSession(session) => {
                    self.dispatcher.session_closed(session.id());
                    self.hal.close_session(session);
                }
                Effect::CloseDevice(device) => self.hal.close_device(device),
                Effect::ReleaseStillSink => self.sink.release(),
                Effect::ReleaseEncoder => self.encoder_release_pending = true,
                Effect::Report(failure) => self.report(failure),
            }
        }
    }

    fn publish_phase(&mut self) {
        let phase = self.machine.phase();
        if phase == self.reported_phase {
            return;
        }

        debug!("Session {} -> {}", self.reported_phase, phase);
        self.reported_phase = phase;
        self.event_bus.notify(CameraEvent::SessionStateChanged {
            phase,
            timestamp: SystemTime::now(),
        });
    }
}

impl SessionControl for SessionDriver {
    fn active_targets(&self) -> Option<TargetSet> {
        self.machine.active().map(|active| active.targets)
    }

    fn reconfigure(&mut self, targets: TargetSet) -> Result<(), CameraError> {
        self.last_failure = None;
        self.apply(SessionInput::Reconfigure { targets })?;

        if self.machine.is_closed() {
            return Err(self.last_failure.clone().unwrap_or(CameraError::SessionUnavailable {
                operation: "reconfigure",
            }));
        }
        Ok(())
    }
}
