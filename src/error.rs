use crate::device::LensFacing;
use crate::hal::Generation;
use crate::recording::RecordingPhase;
use crate::session::SessionPhase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl CamflowError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures originating from the camera device, its session, or misuse of either
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Device {device_id} is not accessible: {details}")]
    DeviceAccess { device_id: String, details: String },

    #[error("No {facing} camera found")]
    NotFound { facing: LensFacing },

    #[error("Session configuration failed: {details}")]
    ConfigurationFailure { details: String },

    #[error("Camera device {device_id} disconnected")]
    DeviceDisconnected { device_id: String },

    #[error("Camera device {device_id} reported error code {code}")]
    DeviceError { device_id: String, code: i32 },

    #[error("No active capture session for {operation}")]
    SessionUnavailable { operation: &'static str },

    #[error("Cannot {operation} while session is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: SessionPhase,
    },

    #[error("Request {generation} from a closed session has not completed yet")]
    RequestPending { generation: Generation },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("Cannot {operation} recording while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: RecordingPhase,
    },

    #[error("Failed to reserve recording output: {details}")]
    Output { details: String },

    #[error("Failed to prepare encoder: {details}")]
    Prepare { details: String },

    #[error("Failed to start encoder: {details}")]
    Start { details: String },

    #[error("Failed to stop encoder: {details}")]
    Stop { details: String },

    #[error("Session reconfiguration failed: {0}")]
    Session(#[from] CameraError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to create directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write image to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, CamflowError>;
