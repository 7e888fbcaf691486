use crate::error::CameraError;
use crate::hal::{CameraHal, CaptureRequest, RequestTemplate, SessionId};
use crate::orientation::OutputRotation;
use crate::session::{ActiveSession, CaptureMode};
use std::sync::Arc;
use tracing::{debug, info};

/// The repeating request currently streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatingRequest {
    pub session: SessionId,
    pub mode: CaptureMode,
}

/// Builds capture requests for the active session and submits them
pub struct RequestDispatcher {
    hal: Arc<dyn CameraHal>,
    repeating: Option<RepeatingRequest>,
}

impl RequestDispatcher {
    pub fn new(hal: Arc<dyn CameraHal>) -> Self {
        Self {
            hal,
            repeating: None,
        }
    }

    /// Stream preview, or preview and recording, replacing any earlier repeating request
    pub fn start_repeating(
        &mut self,
        active: Option<ActiveSession>,
    ) -> Result<CaptureMode, CameraError> {
        let active = active.ok_or(CameraError::SessionUnavailable {
            operation: "start repeating request",
        })?;

        let mode = active.targets.mode();
        let template = match mode {
            CaptureMode::PreviewOnly => RequestTemplate::Preview,
            CaptureMode::PreviewAndRecord => RequestTemplate::Record,
        };
        let request = CaptureRequest {
            template,
            targets: active.targets.repeating_surfaces(),
            jpeg_orientation: None,
        };

        self.hal.set_repeating_request(active.session, &request)?;
        self.repeating = Some(RepeatingRequest {
            session: active.session,
            mode,
        });

        info!("Repeating {} request started", mode);
        Ok(mode)
    }

    /// Capture one still into the still-image surface, tagged with `rotation`
    pub fn capture_once(
        &self,
        active: Option<ActiveSession>,
        rotation: OutputRotation,
    ) -> Result<(), CameraError> {
        let active = active.ok_or(CameraError::SessionUnavailable { operation: "capture" })?;

        let request = CaptureRequest {
            template: RequestTemplate::StillCapture,
            targets: vec![active.targets.still()],
            jpeg_orientation: Some(rotation),
        };

        self.hal.capture(active.session, &request)?;
        debug!("Still capture submitted with orientation {}", rotation);
        Ok(())
    }

    /// Forget the repeating request of a session that was closed
    pub fn session_closed(&mut self, session: SessionId) {
        if self.repeating.map(|request| request.session) == Some(session) {
            self.repeating = None;
        }
    }

    pub fn repeating(&self) -> Option<RepeatingRequest> {
        self.repeating
    }
}
