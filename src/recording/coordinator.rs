use super::encoder::{
    EncoderFactory, EncoderParams, MediaEncoder, RecordingOutputs, RecordingProfile,
};
use crate::error::{CameraError, RecordingError};
use crate::hal::SurfaceId;
use crate::orientation::OutputRotation;
use crate::session::TargetSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordingPhase {
    Idle,
    Recording,
    /// Encoder released, waiting for the preview-only session to come back
    Stopping,
}

impl fmt::Display for RecordingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingPhase::Idle => "idle",
            RecordingPhase::Recording => "recording",
            RecordingPhase::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Snapshot of a recording in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingState {
    pub active: bool,
    pub output_target: SurfaceId,
    pub output_path: PathBuf,
    pub orientation_hint: OutputRotation,
}

/// The part of the session the coordinator drives
pub trait SessionControl {
    /// Targets of the session when it is Active, `None` otherwise
    fn active_targets(&self) -> Option<TargetSet>;

    /// Rebuild the session around `targets`
    fn reconfigure(&mut self, targets: TargetSet) -> Result<(), CameraError>;
}

/// Moves the session between preview-only and preview-plus-record and owns the encoder
pub struct RecordingCoordinator {
    factory: Arc<dyn EncoderFactory>,
    outputs: Arc<dyn RecordingOutputs>,
    profile: RecordingProfile,
    phase: RecordingPhase,
    encoder: Option<Box<dyn MediaEncoder>>,
    state: Option<RecordingState>,
}

impl RecordingCoordinator {
    pub fn new(
        factory: Arc<dyn EncoderFactory>,
        outputs: Arc<dyn RecordingOutputs>,
        profile: RecordingProfile,
    ) -> Self {
        Self {
            factory,
            outputs,
            profile,
            phase: RecordingPhase::Idle,
            encoder: None,
            state: None,
        }
    }

    pub fn phase(&self) -> RecordingPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&RecordingState> {
        self.state.as_ref()
    }

    /// Prepare an encoder, rebuild the session with its surface, then start encoding
    pub fn start_recording(
        &mut self,
        session: &mut dyn SessionControl,
        orientation_hint: OutputRotation,
    ) -> Result<RecordingState, RecordingError> {
        if self.phase != RecordingPhase::Idle {
            return Err(RecordingError::InvalidState {
                operation: "start",
                phase: self.phase,
            });
        }

        let targets = session
            .active_targets()
            .ok_or(CameraError::SessionUnavailable {
                operation: "start recording",
            })?;

        let output_path = self.outputs.reserve()?;
        let params = EncoderParams::from_profile(&self.profile, output_path, orientation_hint);
        let mut encoder = match self.factory.create(&params) {
            Ok(encoder) => encoder,
            Err(e) => {
                self.outputs.discard(&params.output_path);
                return Err(e);
            }
        };
        let output_target = encoder.surface();

        if let Err(e) = session.reconfigure(targets.with_recording(output_target)) {
            warn!("Recording not started, session rebuild failed: {}", e);
            encoder.release();
            self.outputs.discard(&params.output_path);
            return Err(e.into());
        }

        if let Err(e) = encoder.start() {
            // the session switches back once the recording session is active
            warn!("Recording not started: {}", e);
            encoder.release();
            self.outputs.discard(&params.output_path);
            return Err(e);
        }

        info!(
            "Recording started into {} via {:?} (orientation {})",
            params.output_path.display(),
            output_target,
            orientation_hint
        );
        let state = RecordingState {
            active: true,
            output_target,
            output_path: params.output_path,
            orientation_hint,
        };

        self.encoder = Some(encoder);
        self.state = Some(state.clone());
        self.phase = RecordingPhase::Recording;
        Ok(state)
    }

    /// Stop and release the encoder, then rebuild the session without it
    pub fn stop_recording(
        &mut self,
        session: &mut dyn SessionControl,
    ) -> Result<(), RecordingError> {
        if self.phase != RecordingPhase::Recording {
            return Err(RecordingError::InvalidState {
                operation: "stop",
                phase: self.phase,
            });
        }

        let stopped = match self.encoder.as_mut() {
            Some(encoder) => encoder.stop(),
            None => Ok(()),
        };
        self.release_held_encoder();

        let reverted = match session.active_targets() {
            Some(targets) => session.reconfigure(targets.without_recording()),
            None => Err(CameraError::SessionUnavailable {
                operation: "stop recording",
            }),
        };

        match reverted {
            Ok(()) => {
                info!("Recording stopped");
                self.phase = RecordingPhase::Stopping;
            }
            Err(e) => {
                warn!("Recording stopped, session not rebuilt: {}", e);
                self.phase = RecordingPhase::Idle;
                stopped?;
                return Err(e.into());
            }
        }

        stopped
    }

    /// The session became Active again with `targets`
    pub fn on_session_active(&mut self, session: &mut dyn SessionControl) {
        let Some(targets) = session.active_targets() else {
            return;
        };

        match self.phase {
            RecordingPhase::Stopping if targets.record().is_none() => {
                debug!("Preview-only session restored");
                self.phase = RecordingPhase::Idle;
            }
            RecordingPhase::Idle if targets.record().is_some() => {
                warn!("Session still streams to a released encoder, switching back to preview");
                if let Err(e) = session.reconfigure(targets.without_recording()) {
                    warn!("Failed to restore preview-only session: {}", e);
                }
            }
            _ => {}
        }
    }

    /// Release any held encoder and return to Idle. Returns whether a recording was running.
    pub fn release_encoder(&mut self) -> bool {
        let was_recording = self.phase == RecordingPhase::Recording;
        self.release_held_encoder();
        self.phase = RecordingPhase::Idle;
        was_recording
    }

    fn release_held_encoder(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            debug!("Releasing encoder {:?}", encoder.surface());
            encoder.release();
        }
        self.state = None;
    }
}
