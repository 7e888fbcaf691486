use super::keyboard_input::KeyboardInputHandler;
use super::{CamflowOrchestrator, ComponentState};
use crate::controller::CameraService;
use crate::error::{CamflowError, Result};
use crate::events::{CameraEvent, EventFilter, EventReceiver};
use crate::session::SessionPhase;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

const ACTIVE_TIMEOUT: Duration = Duration::from_secs(5);

impl CamflowOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing camflow components");

        let mut states = self.component_states.lock().await;
        states.insert("camera".to_string(), ComponentState::Stopped);
        states.insert("notifier".to_string(), ComponentState::Stopped);
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }
        drop(states);

        Ok(())
    }

    /// Start the camera service, open the configured camera and attach user input
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting camflow");

        self.start_notifier().await;

        self.set_component_state("camera", ComponentState::Starting)
            .await;
        let parts = (self.controller.take(), self.hardware_events.take());
        let (controller, hardware_events) = match parts {
            (Some(controller), Some(hardware_events)) => (controller, hardware_events),
            _ => return Err(CamflowError::system("Camera service already started")),
        };

        let (camera, task) = CameraService::spawn(
            controller,
            hardware_events,
            self.config.system.command_queue_capacity,
            self.cancellation_token.child_token(),
        );
        self.camera = Some(camera.clone());
        self.camera_task = Some(task);

        let facing = self.config.camera.facing;
        match camera.open(facing, self.preview_surface).await {
            Ok(descriptor) => info!(
                "Opening {} camera {} (sensor {}°)",
                descriptor.facing, descriptor.id, descriptor.sensor_orientation_degrees
            ),
            Err(e) => {
                self.set_component_state("camera", ComponentState::Failed)
                    .await;
                error!("Failed to open {} camera: {}", facing, e);
                return Err(e);
            }
        }

        if let Err(e) = self.wait_for_active(ACTIVE_TIMEOUT).await {
            self.set_component_state("camera", ComponentState::Failed)
                .await;
            error!("Camera session did not become active: {}", e);
            return Err(e);
        }
        self.set_component_state("camera", ComponentState::Running)
            .await;

        if self.keyboard_enabled {
            self.set_component_state("keyboard", ComponentState::Starting)
                .await;
            let handler = KeyboardInputHandler::new(camera, self.event_bus());
            match handler.start().await {
                Ok(()) => {
                    self.keyboard_handler = Some(handler);
                    self.set_component_state("keyboard", ComponentState::Running)
                        .await;
                }
                Err(e) => {
                    // The camera stays usable without keyboard triggers
                    warn!("Keyboard input unavailable: {}", e);
                    self.set_component_state("keyboard", ComponentState::Failed)
                        .await;
                }
            }
        }

        info!("camflow started");
        Ok(())
    }

    /// Poll the camera until its session is streaming
    pub async fn wait_for_active(&self, limit: Duration) -> Result<()> {
        let camera = self.camera()?;
        let deadline = Instant::now() + limit;

        loop {
            let status = camera.status().await?;
            match status.phase {
                SessionPhase::Active => return Ok(()),
                SessionPhase::Closed => {
                    return Err(CamflowError::component(
                        "camera",
                        "session closed while opening",
                    ))
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(CamflowError::component(
                    "camera".to_string(),
                    format!("session still {} after {:?}", status.phase, limit),
                ));
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Log user-facing notifications until shutdown
    async fn start_notifier(&mut self) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::Notifications,
            "notifier".to_string(),
        );
        let cancellation_token = self.cancellation_token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    event = receiver.recv() => match event {
                        Ok(CameraEvent::FatalError { kind, message }) => {
                            error!("Camera failure ({}): {}", kind, message);
                        }
                        Ok(event) => info!("{}", event.description()),
                        Err(_) => break,
                    },
                }
            }
        });

        self.notifier_task = Some(task);
        self.set_component_state("notifier", ComponentState::Running)
            .await;
    }
}
