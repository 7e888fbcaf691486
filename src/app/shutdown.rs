use super::{CamflowOrchestrator, ComponentState};
use crate::error::{CamflowError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl CamflowOrchestrator {
    /// Stop user input, close the camera and wait for the service to exit
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        if let Some(handler) = self.keyboard_handler.take() {
            self.set_component_state("keyboard", ComponentState::Stopping)
                .await;
            if let Err(e) = handler.stop().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
            self.set_component_state("keyboard", ComponentState::Stopped)
                .await;
        }

        if let Err(e) = self.stop_camera().await {
            error!("Error stopping camera: {}", e);
            exit_code = 1;
        }

        // Ends the notifier and any remaining watchers
        self.cancellation_token.cancel();
        if let Some(task) = self.notifier_task.take() {
            if timeout(STOP_TIMEOUT, task).await.is_err() {
                warn!("Notifier did not stop in time");
            }
        }
        self.set_component_state("notifier", ComponentState::Stopped)
            .await;

        let failed = self.failed_components().await;
        if !failed.is_empty() {
            warn!("Components failed during shutdown: {}", failed.join(", "));
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_camera(&mut self) -> Result<()> {
        info!("Stopping camera component");
        self.set_component_state("camera", ComponentState::Stopping)
            .await;

        if let Some(camera) = self.camera.take() {
            // The preview surface goes away with the application
            if let Err(e) = camera.surface_torn_down().await {
                warn!("Camera service did not accept teardown: {}", e);
            }
        }

        let Some(task) = self.camera_task.take() else {
            self.set_component_state("camera", ComponentState::Stopped)
                .await;
            return Ok(());
        };

        self.cancellation_token.cancel();
        match timeout(STOP_TIMEOUT, task).await {
            Ok(Ok(())) => {
                self.set_component_state("camera", ComponentState::Stopped)
                    .await;
                info!("camera component stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state("camera", ComponentState::Failed)
                    .await;
                Err(CamflowError::component(
                    "camera".to_string(),
                    format!("service task failed: {}", e),
                ))
            }
            Err(_) => {
                self.set_component_state("camera", ComponentState::Failed)
                    .await;
                Err(CamflowError::component("camera", "component stop timeout"))
            }
        }
    }
}
