use crate::error::{CameraError, EventBusError};
use crate::orientation::OutputRotation;
use crate::session::{CaptureMode, SessionPhase};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Classes of failure surfaced to the notification collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FatalErrorKind {
    DeviceAccess,
    ConfigurationFailure,
    DeviceDisconnected,
    DeviceError,
}

impl FatalErrorKind {
    /// Kind for errors that tore the session down, `None` for everything else
    pub fn from_error(error: &CameraError) -> Option<Self> {
        match error {
            CameraError::DeviceAccess { .. } | CameraError::NotFound { .. } => {
                Some(FatalErrorKind::DeviceAccess)
            }
            CameraError::ConfigurationFailure { .. } => Some(FatalErrorKind::ConfigurationFailure),
            CameraError::DeviceDisconnected { .. } => Some(FatalErrorKind::DeviceDisconnected),
            CameraError::DeviceError { .. } => Some(FatalErrorKind::DeviceError),
            CameraError::SessionUnavailable { .. }
            | CameraError::InvalidState { .. }
            | CameraError::RequestPending { .. } => None,
        }
    }
}

impl fmt::Display for FatalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FatalErrorKind::DeviceAccess => "device_access",
            FatalErrorKind::ConfigurationFailure => "configuration_failure",
            FatalErrorKind::DeviceDisconnected => "device_disconnected",
            FatalErrorKind::DeviceError => "device_error",
        };
        f.write_str(name)
    }
}

/// Events published by the camera core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CameraEvent {
    /// The session moved to a new lifecycle phase
    SessionStateChanged {
        phase: SessionPhase,
        timestamp: SystemTime,
    },
    /// A repeating request is streaming
    PreviewStarted { mode: CaptureMode },
    /// A still image was written by the persistence collaborator
    ImageSaved {
        capture_id: String,
        location: PathBuf,
        size_bytes: usize,
    },
    /// A still image could not be captured or written
    ImageSaveFailed { capture_id: String, reason: String },
    /// Recording began into `location` with the given orientation hint
    RecordingStarted {
        location: PathBuf,
        orientation_hint: OutputRotation,
    },
    /// Recording stopped and the encoder was released
    RecordingStopped,
    /// A hardware failure tore the session down
    FatalError {
        kind: FatalErrorKind,
        message: String,
    },
    /// Application shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl CameraEvent {
    pub fn description(&self) -> String {
        match self {
            CameraEvent::SessionStateChanged { phase, .. } => format!("Session {}", phase),
            CameraEvent::PreviewStarted { mode } => format!("Streaming {}", mode),
            CameraEvent::ImageSaved {
                location,
                size_bytes,
                ..
            } => format!("Saved picture to {} ({} bytes)", location.display(), size_bytes),
            CameraEvent::ImageSaveFailed { reason, .. } => {
                format!("Failed to save picture: {}", reason)
            }
            CameraEvent::RecordingStarted {
                location,
                orientation_hint,
            } => format!(
                "Recording to {} (orientation {})",
                location.display(),
                orientation_hint
            ),
            CameraEvent::RecordingStopped => "Recording stopped".to_string(),
            CameraEvent::FatalError { kind, message } => format!("{}: {}", kind, message),
            CameraEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CameraEvent::SessionStateChanged { .. } => "session_state_changed",
            CameraEvent::PreviewStarted { .. } => "preview_started",
            CameraEvent::ImageSaved { .. } => "image_saved",
            CameraEvent::ImageSaveFailed { .. } => "image_save_failed",
            CameraEvent::RecordingStarted { .. } => "recording_started",
            CameraEvent::RecordingStopped => "recording_stopped",
            CameraEvent::FatalError { .. } => "fatal_error",
            CameraEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }

    /// Events a user should be told about
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            CameraEvent::ImageSaved { .. }
                | CameraEvent::ImageSaveFailed { .. }
                | CameraEvent::RecordingStarted { .. }
                | CameraEvent::RecordingStopped
                | CameraEvent::FatalError { .. }
        )
    }
}

/// Broadcast event bus shared by the camera core and its collaborators
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CameraEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: CameraEvent) -> Result<usize, EventBusError> {
        match &event {
            CameraEvent::FatalError { kind, message } => {
                error!("Camera failure ({}): {}", kind, message);
            }
            CameraEvent::ImageSaveFailed { reason, .. } => {
                warn!("Picture not saved: {}", reason);
            }
            CameraEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish without caring whether anyone is listening
    pub fn notify(&self, event: CameraEvent) {
        if let Err(e) = self.publish(event) {
            debug!("Event dropped: {}", e);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    Notifications,
}

impl EventFilter {
    pub fn matches(&self, event: &CameraEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Notifications => event.is_notification(),
        }
    }
}

/// Receiver that skips events not matching its filter
pub struct EventReceiver {
    receiver: broadcast::Receiver<CameraEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<CameraEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next matching event. Lagging drops the missed events and continues.
    pub async fn recv(&mut self) -> Result<CameraEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
