use super::camera::{CameraController, CameraStatus};
use crate::device::{DeviceDescriptor, LensFacing};
use crate::error::{CameraError, CamflowError, RecordingError, Result};
use crate::hal::{HardwareEventReceiver, SurfaceId};
use crate::recording::RecordingState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

enum CameraCommand {
    Open {
        facing: LensFacing,
        preview: SurfaceId,
        reply: oneshot::Sender<std::result::Result<DeviceDescriptor, CameraError>>,
    },
    Capture {
        reply: oneshot::Sender<std::result::Result<(), CameraError>>,
    },
    StartRecording {
        reply: oneshot::Sender<std::result::Result<RecordingState, RecordingError>>,
    },
    StopRecording {
        reply: oneshot::Sender<std::result::Result<(), RecordingError>>,
    },
    SurfaceTornDown {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<CameraStatus>,
    },
}

/// Cloneable client of a running [`CameraService`]
#[derive(Clone)]
pub struct CameraHandle {
    commands: mpsc::Sender<CameraCommand>,
}

impl CameraHandle {
    pub async fn open(&self, facing: LensFacing, preview: SurfaceId) -> Result<DeviceDescriptor> {
        let (reply, response) = oneshot::channel();
        self.send(CameraCommand::Open {
            facing,
            preview,
            reply,
        })
        .await?;
        Ok(Self::wait(response).await??)
    }

    pub async fn capture(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(CameraCommand::Capture { reply }).await?;
        Ok(Self::wait(response).await??)
    }

    pub async fn start_recording(&self) -> Result<RecordingState> {
        let (reply, response) = oneshot::channel();
        self.send(CameraCommand::StartRecording { reply }).await?;
        Ok(Self::wait(response).await??)
    }

    pub async fn stop_recording(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(CameraCommand::StopRecording { reply }).await?;
        Ok(Self::wait(response).await??)
    }

    pub async fn surface_torn_down(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(CameraCommand::SurfaceTornDown { reply }).await?;
        Self::wait(response).await
    }

    pub async fn status(&self) -> Result<CameraStatus> {
        let (reply, response) = oneshot::channel();
        self.send(CameraCommand::Status { reply }).await?;
        Self::wait(response).await
    }

    async fn send(&self, command: CameraCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CamflowError::component("camera_service", "service is not running"))
    }

    async fn wait<T>(response: oneshot::Receiver<T>) -> Result<T> {
        response.await.map_err(|_| {
            CamflowError::component("camera_service", "service stopped before replying")
        })
    }
}

/// Serializes commands and hardware completions onto one task that owns the controller
pub struct CameraService {
    controller: CameraController,
    commands: mpsc::Receiver<CameraCommand>,
    hardware: HardwareEventReceiver,
    cancellation_token: CancellationToken,
}

impl CameraService {
    /// Start the service task. Cancelling `cancellation_token` closes the camera and ends it.
    pub fn spawn(
        controller: CameraController,
        hardware: HardwareEventReceiver,
        command_capacity: usize,
        cancellation_token: CancellationToken,
    ) -> (CameraHandle, JoinHandle<()>) {
        let (sender, commands) = mpsc::channel(command_capacity);
        let service = Self {
            controller,
            commands,
            hardware,
            cancellation_token,
        };

        let task = tokio::spawn(service.run());
        (CameraHandle { commands: sender }, task)
    }

    async fn run(mut self) {
        info!("Camera service started");

        loop {
            tokio::select! {
                _ = self.cancellation_token.cancelled() => {
                    debug!("Camera service cancelled");
                    break;
                }
                Some(event) = self.hardware.recv() => {
                    self.controller.on_hardware_event(event);
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => {
                        debug!("All camera handles dropped");
                        break;
                    }
                },
            }
        }

        self.controller.surface_torn_down();
        info!("Camera service stopped");
    }

    fn dispatch(&mut self, command: CameraCommand) {
        // a dropped reply only means the caller stopped waiting
        match command {
            CameraCommand::Open {
                facing,
                preview,
                reply,
            } => {
                let _ = reply.send(self.controller.request_open(facing, preview));
            }
            CameraCommand::Capture { reply } => {
                let _ = reply.send(self.controller.trigger_capture());
            }
            CameraCommand::StartRecording { reply } => {
                let _ = reply.send(self.controller.trigger_start_recording());
            }
            CameraCommand::StopRecording { reply } => {
                let _ = reply.send(self.controller.trigger_stop_recording());
            }
            CameraCommand::SurfaceTornDown { reply } => {
                self.controller.surface_torn_down();
                let _ = reply.send(());
            }
            CameraCommand::Status { reply } => {
                let _ = reply.send(self.controller.status());
            }
        }
    }
}
