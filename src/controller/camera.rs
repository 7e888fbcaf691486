use super::driver::SessionDriver;
use crate::capture::{ImagePersistence, StillImageSink};
use crate::device::{DeviceDescriptor, DeviceResolver, LensFacing};
use crate::error::{CameraError, RecordingError};
use crate::events::{CameraEvent, EventBus};
use crate::hal::{CameraHal, HardwareEvent, SurfaceId};
use crate::orientation::{
    compute_output_rotation, OrientationService, OutputRotation, RotationTable,
};
use crate::recording::{
    EncoderFactory, RecordingCoordinator, RecordingOutputs, RecordingPhase, RecordingProfile,
    RecordingState,
};
use crate::session::{CaptureMode, SessionInput, SessionPhase, TargetSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Collaborators the controller is built from
pub struct ControllerParts {
    pub hal: Arc<dyn CameraHal>,
    pub orientation: Arc<dyn OrientationService>,
    pub rotation_table: RotationTable,
    pub persistence: Arc<dyn ImagePersistence>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub recording_outputs: Arc<dyn RecordingOutputs>,
    pub recording_profile: RecordingProfile,
    pub event_bus: Arc<EventBus>,
}

/// Point-in-time view of the camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraStatus {
    pub phase: SessionPhase,
    pub mode: Option<CaptureMode>,
    pub device: Option<DeviceDescriptor>,
    pub output_rotation: OutputRotation,
    pub recording: RecordingPhase,
}

/// Entry point for every camera operation. Must be driven from a single task.
pub struct CameraController {
    driver: SessionDriver,
    recorder: RecordingCoordinator,
    orientation: Arc<dyn OrientationService>,
    rotation_table: RotationTable,
    descriptor: Option<DeviceDescriptor>,
    output_rotation: OutputRotation,
}

impl CameraController {
    pub fn new(parts: ControllerParts) -> Self {
        let sink = StillImageSink::new(parts.persistence, Arc::clone(&parts.event_bus));

        Self {
            driver: SessionDriver::new(parts.hal, sink, parts.event_bus),
            recorder: RecordingCoordinator::new(
                parts.encoders,
                parts.recording_outputs,
                parts.recording_profile,
            ),
            orientation: parts.orientation,
            rotation_table: parts.rotation_table,
            descriptor: None,
            output_rotation: OutputRotation::default(),
        }
    }

    /// Resolve a camera for `facing`, fix the output rotation and start opening it
    pub fn request_open(
        &mut self,
        facing: LensFacing,
        preview: SurfaceId,
    ) -> Result<DeviceDescriptor, CameraError> {
        if !self.driver.machine.is_closed() {
            return Err(CameraError::InvalidState {
                operation: "open",
                phase: self.driver.machine.phase(),
            });
        }

        if let Some(generation) = self.driver.machine.abandoned_request() {
            debug!("Open refused: request {} still in flight", generation);
            return Err(CameraError::RequestPending { generation });
        }

        let descriptor = match DeviceResolver::new(self.driver.hal.as_ref()).resolve(facing) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.driver.report(e.clone());
                return Err(e);
            }
        };

        let device_rotation = self
            .rotation_table
            .snapshot(self.orientation.rotation_snapshot());
        let output_rotation = compute_output_rotation(
            descriptor.sensor_orientation_degrees,
            device_rotation,
            descriptor.facing,
        );
        debug!(
            "Output rotation {} for device rotation {:?}",
            output_rotation, device_rotation
        );

        let reader = match self.driver.hal.open_still_sink(descriptor.max_still_size) {
            Ok(reader) => reader,
            Err(e) => {
                self.driver.report(e.clone());
                return Err(e);
            }
        };
        let still = self.driver.sink.attach(reader);
        let targets = TargetSet::preview_only(preview, still);

        self.driver.take_last_failure();
        if let Err(e) = self.driver.apply(SessionInput::Open {
            device_id: descriptor.id.clone(),
            targets,
        }) {
            self.driver.sink.release();
            return Err(e);
        }

        if self.driver.machine.is_closed() {
            self.settle();
            return Err(self
                .driver
                .take_last_failure()
                .unwrap_or(CameraError::DeviceAccess {
                    device_id: descriptor.id,
                    details: "open failed".to_string(),
                }));
        }

        info!(
            "Opening {} camera {} with output rotation {}",
            descriptor.facing, descriptor.id, output_rotation
        );
        self.descriptor = Some(descriptor.clone());
        self.output_rotation = output_rotation;
        self.settle();
        Ok(descriptor)
    }

    /// Deliver a completion from the hardware callback context
    pub fn on_hardware_event(&mut self, event: HardwareEvent) {
        debug!("Hardware event: {}", event.name());

        match event {
            HardwareEvent::ImageAvailable => {
                self.driver.sink.on_image_available();
            }
            other => {
                if let Err(e) = self.driver.apply(SessionInput::Hardware(other)) {
                    self.driver.report(e);
                }
            }
        }

        self.settle();
    }

    /// Capture one still tagged with the orientation fixed at open time
    pub fn trigger_capture(&mut self) -> Result<(), CameraError> {
        self.driver
            .dispatcher
            .capture_once(self.driver.machine.active(), self.output_rotation)
    }

    pub fn trigger_start_recording(&mut self) -> Result<RecordingState, RecordingError> {
        let state = self
            .recorder
            .start_recording(&mut self.driver, self.output_rotation);
        self.settle();

        let state = state?;
        self.driver.event_bus.notify(CameraEvent::RecordingStarted {
            location: state.output_path.clone(),
            orientation_hint: state.orientation_hint,
        });
        Ok(state)
    }

    pub fn trigger_stop_recording(&mut self) -> Result<(), RecordingError> {
        let was_recording = self.recorder.phase() == RecordingPhase::Recording;
        let result = self.recorder.stop_recording(&mut self.driver);
        self.settle();

        if was_recording && self.recorder.phase() != RecordingPhase::Recording {
            self.driver.event_bus.notify(CameraEvent::RecordingStopped);
        }
        result
    }

    /// The preview surface is gone: release everything
    pub fn surface_torn_down(&mut self) {
        if let Err(e) = self.driver.apply(SessionInput::Close) {
            self.driver.report(e);
        }
        self.settle();
        self.descriptor = None;
    }

    pub fn status(&self) -> CameraStatus {
        CameraStatus {
            phase: self.driver.machine.phase(),
            mode: self.driver.machine.mode(),
            device: self.descriptor.clone(),
            output_rotation: self.output_rotation,
            recording: self.recorder.phase(),
        }
    }

    /// Run deferred work the session machine asked for
    fn settle(&mut self) {
        loop {
            if self.driver.take_encoder_release() && self.recorder.release_encoder() {
                self.driver.event_bus.notify(CameraEvent::RecordingStopped);
            }

            if self.driver.take_became_active() {
                self.recorder.on_session_active(&mut self.driver);
                continue;
            }

            break;
        }

        if self.driver.machine.is_closed() {
            self.descriptor = None;
        }
    }
}
