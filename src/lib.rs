pub mod app;
pub mod capture;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod events;
pub mod hal;
pub mod orientation;
pub mod recording;
pub mod session;
pub mod storage;

pub use app::{CamflowOrchestrator, ComponentState, ShutdownReason};
pub use config::CamflowConfig;
pub use controller::{CameraController, CameraHandle, CameraService, CameraStatus, ControllerParts};
pub use device::{DeviceDescriptor, DeviceResolver, LensFacing, Size};
pub use error::{CameraError, CamflowError, PersistenceError, RecordingError, Result};
pub use events::{CameraEvent, EventBus, EventFilter, EventReceiver, FatalErrorKind};
pub use hal::{CameraHal, HardwareEvent};
pub use orientation::{compute_output_rotation, OutputRotation, RotationTable};
pub use recording::{RecordingCoordinator, RecordingPhase, RecordingProfile};
pub use session::{SessionMachine, SessionPhase, TargetSet};
pub use storage::{FileImageWriter, VideoFileAllocator};
