use super::keyboard_input::KeyboardInputHandler;
use super::types::{ComponentState, ShutdownReason};
use crate::config::CamflowConfig;
use crate::controller::{CameraController, CameraHandle, ControllerParts};
use crate::device::{DeviceDescriptor, DeviceResolver};
use crate::error::{CamflowError, Result};
use crate::events::EventBus;
use crate::hal::mock::{MockCameraHal, ResponseMode};
use crate::hal::{hardware_event_channel, HardwareEventReceiver, SurfaceId};
use crate::orientation::FixedOrientation;
use crate::recording::mock::MockEncoderFactory;
use crate::storage::{FileImageWriter, VideoFileAllocator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wires the camera core to the simulated platform, storage and user input
pub struct CamflowOrchestrator {
    pub(super) config: CamflowConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) hal: Arc<MockCameraHal>,

    // Components
    pub(super) controller: Option<CameraController>,
    pub(super) hardware_events: Option<HardwareEventReceiver>,
    pub(super) camera: Option<CameraHandle>,
    pub(super) camera_task: Option<JoinHandle<()>>,
    pub(super) notifier_task: Option<JoinHandle<()>>,
    pub(super) preview_surface: SurfaceId,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl CamflowOrchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(config: CamflowConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (hardware_sender, hardware_events) = hardware_event_channel();
        let hal = Arc::new(MockCameraHal::new(
            config.simulation.mock_devices(),
            hardware_sender,
            ResponseMode::Immediate,
        ));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let controller = CameraController::new(ControllerParts {
            hal: hal.clone(),
            orientation: Arc::new(FixedOrientation(config.simulation.display_rotation())),
            rotation_table: config.orientation,
            persistence: Arc::new(FileImageWriter::new(&config.storage)),
            encoders: Arc::new(MockEncoderFactory::new()),
            recording_outputs: Arc::new(VideoFileAllocator::new(&config.storage)),
            recording_profile: config.recording.clone(),
            event_bus: Arc::clone(&event_bus),
        });
        let preview_surface = hal.create_surface();
        let keyboard_enabled = config.system.keyboard;

        Ok(Self {
            config,
            event_bus,
            hal,
            controller: Some(controller),
            hardware_events: Some(hardware_events),
            camera: None,
            camera_task: None,
            notifier_task: None,
            preview_surface,
            keyboard_handler: None,
            keyboard_enabled,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// The simulated platform the camera runs on
    pub fn simulated_hal(&self) -> Arc<MockCameraHal> {
        Arc::clone(&self.hal)
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Handle to the running camera service
    pub fn camera(&self) -> Result<CameraHandle> {
        self.camera
            .clone()
            .ok_or_else(|| CamflowError::component("camera", "camera service not started"))
    }

    /// Every camera the simulated platform exposes
    pub fn list_devices(config: &CamflowConfig) -> Result<Vec<DeviceDescriptor>> {
        let (sender, _receiver) = hardware_event_channel();
        let hal =
            MockCameraHal::new(config.simulation.mock_devices(), sender, ResponseMode::Manual);
        Ok(DeviceResolver::new(&hal).list()?)
    }
}
