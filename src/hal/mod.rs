//! Platform camera service seam.
//!
//! Asynchronous requests (`open_device`, `create_session`, `capture`) return
//! immediately; their completions arrive later as [`HardwareEvent`]s on the
//! channel handed to the implementation at construction. Every completion
//! echoes the [`Generation`] of the request that caused it.

pub mod mock;

use crate::device::{DeviceCharacteristics, Size};
use crate::error::CameraError;
use crate::orientation::OutputRotation;
use std::fmt;
use tokio::sync::mpsc;

/// Identity of an open camera device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

/// Identity of a configured capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Reference to an output surface owned by a display, image reader or encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Request counter echoed back by the hardware so late callbacks can be told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Exclusive ownership of an open camera device. Released by `CameraHal::close_device`.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    id: DeviceId,
}

impl DeviceHandle {
    pub fn new(id: DeviceId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }
}

/// Exclusive ownership of a configured session. Released by `CameraHal::close_session`.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle {
    id: SessionId,
}

impl SessionHandle {
    pub fn new(id: SessionId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }
}

/// Notifications delivered by the platform's callback context
#[derive(Debug, PartialEq, Eq)]
pub enum HardwareEvent {
    DeviceOpened {
        generation: Generation,
        device: DeviceHandle,
    },
    DeviceDisconnected {
        generation: Generation,
    },
    DeviceError {
        generation: Generation,
        code: i32,
    },
    SessionConfigured {
        generation: Generation,
        session: SessionHandle,
    },
    SessionConfigureFailed {
        generation: Generation,
    },
    /// A still capture finished and a frame is waiting in the still-image reader
    ImageAvailable,
}

impl HardwareEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HardwareEvent::DeviceOpened { .. } => "device_opened",
            HardwareEvent::DeviceDisconnected { .. } => "device_disconnected",
            HardwareEvent::DeviceError { .. } => "device_error",
            HardwareEvent::SessionConfigured { .. } => "session_configured",
            HardwareEvent::SessionConfigureFailed { .. } => "session_configure_failed",
            HardwareEvent::ImageAvailable => "image_available",
        }
    }

    /// Request this event answers, if it answers one
    pub fn generation(&self) -> Option<Generation> {
        match self {
            HardwareEvent::DeviceOpened { generation, .. }
            | HardwareEvent::DeviceDisconnected { generation }
            | HardwareEvent::DeviceError { generation, .. }
            | HardwareEvent::SessionConfigured { generation, .. }
            | HardwareEvent::SessionConfigureFailed { generation } => Some(*generation),
            HardwareEvent::ImageAvailable => None,
        }
    }
}

pub type HardwareEventSender = mpsc::UnboundedSender<HardwareEvent>;
pub type HardwareEventReceiver = mpsc::UnboundedReceiver<HardwareEvent>;

/// Create the channel a HAL implementation reports completions on
pub fn hardware_event_channel() -> (HardwareEventSender, HardwareEventReceiver) {
    mpsc::unbounded_channel()
}

/// Capture request templates tuned by the platform for each use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTemplate {
    Preview,
    Record,
    StillCapture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<SurfaceId>,
    pub jpeg_orientation: Option<OutputRotation>,
}

/// Platform camera service
pub trait CameraHal: Send + Sync {
    /// Ids of all cameras in platform enumeration order
    fn device_ids(&self) -> Result<Vec<String>, CameraError>;

    fn characteristics(&self, device_id: &str) -> Result<DeviceCharacteristics, CameraError>;

    /// Start opening a camera. Completes with `DeviceOpened`, `DeviceDisconnected`
    /// or `DeviceError`.
    fn open_device(&self, device_id: &str, generation: Generation) -> Result<(), CameraError>;

    fn close_device(&self, device: DeviceHandle);

    /// Start building a session bound to exactly `surfaces`.
    /// Completes with `SessionConfigured` or `SessionConfigureFailed`.
    fn create_session(
        &self,
        device: DeviceId,
        surfaces: &[SurfaceId],
        generation: Generation,
    ) -> Result<(), CameraError>;

    /// Close a session. No event of that session is delivered afterwards.
    fn close_session(&self, session: SessionHandle);

    /// Replace the session's repeating request
    fn set_repeating_request(
        &self,
        session: SessionId,
        request: &CaptureRequest,
    ) -> Result<(), CameraError>;

    /// Submit a single request. Stills complete with `ImageAvailable`.
    fn capture(&self, session: SessionId, request: &CaptureRequest) -> Result<(), CameraError>;

    /// Create the JPEG reader stills are delivered to. Dropping it releases it.
    fn open_still_sink(&self, size: Size) -> Result<Box<dyn StillImageReader>, CameraError>;
}

/// Reader holding at most one in-flight still frame
pub trait StillImageReader: Send + Sync {
    fn surface(&self) -> SurfaceId;

    /// Take the newest buffered frame, releasing any older ones
    fn acquire_latest(&mut self) -> Option<Box<dyn StillFrame>>;
}

/// A frame borrowed from the reader's buffer. Dropping it returns the buffer.
pub trait StillFrame: Send {
    /// Encoded JPEG bytes of the frame
    fn data(&self) -> &[u8];
}
