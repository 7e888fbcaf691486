use crate::controller::CameraHandle;
use crate::error::Result;
use crate::events::{CameraEvent, EventBus};
use crate::recording::RecordingPhase;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press asks the camera to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Capture,
    ToggleRecording,
    Quit,
}

impl KeyAction {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char(' ') | KeyCode::Enter => Some(KeyAction::Capture),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(KeyAction::ToggleRecording),
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
            _ => None,
        }
    }
}

/// Keyboard triggers for capture and recording on the controlling terminal
pub struct KeyboardInputHandler {
    camera: CameraHandle,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(camera: CameraHandle, event_bus: Arc<EventBus>) -> Self {
        Self {
            camera,
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - SPACE captures, R toggles recording, Q quits");

        let camera = self.camera.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(action) = KeyAction::from_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        let camera = camera.clone();
                        let event_bus = Arc::clone(&event_bus);
                        runtime_handle.spawn(async move {
                            perform(action, &camera, &event_bus).await;
                        });

                        if action == KeyAction::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Let the blocking task notice the cancellation and restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

/// Run one key action against the camera service
pub async fn perform(action: KeyAction, camera: &CameraHandle, event_bus: &EventBus) {
    match action {
        KeyAction::Capture => {
            info!("Capture key pressed");
            if let Err(e) = camera.capture().await {
                warn!("Capture rejected: {}", e);
            }
        }
        KeyAction::ToggleRecording => {
            let recording = match camera.status().await {
                Ok(status) => status.recording,
                Err(e) => {
                    warn!("Cannot read camera status: {}", e);
                    return;
                }
            };

            let result = match recording {
                RecordingPhase::Idle => camera.start_recording().await.map(|_| ()),
                RecordingPhase::Recording => camera.stop_recording().await,
                RecordingPhase::Stopping => {
                    debug!("Recording is still stopping");
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!("Recording toggle rejected: {}", e);
            }
        }
        KeyAction::Quit => {
            info!("Quit key pressed - requesting shutdown");
            event_bus.notify(CameraEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "User requested via keyboard".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CamflowConfig;
    use crate::device::LensFacing;
    use crate::events::{EventFilter, EventReceiver};
    use crate::app::CamflowOrchestrator;
    use tempfile::TempDir;

    async fn started(temp_dir: &TempDir) -> CamflowOrchestrator {
        let mut config = CamflowConfig::default();
        config.storage.path = temp_dir.path().to_string_lossy().to_string();
        config.system.keyboard = false;

        let mut orchestrator = CamflowOrchestrator::new(config).unwrap();
        orchestrator.start().await.unwrap();
        orchestrator
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyAction::from_key(KeyCode::Char(' ')), Some(KeyAction::Capture));
        assert_eq!(
            KeyAction::from_key(KeyCode::Char('r')),
            Some(KeyAction::ToggleRecording)
        );
        assert_eq!(KeyAction::from_key(KeyCode::Esc), Some(KeyAction::Quit));
        assert_eq!(KeyAction::from_key(KeyCode::Char('x')), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = started(&temp_dir).await;
        let handler =
            KeyboardInputHandler::new(orchestrator.camera().unwrap(), orchestrator.event_bus());

        assert!(!handler.cancellation_token.is_cancelled());
        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }

    #[tokio::test]
    async fn test_toggle_recording_starts_then_stops() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = started(&temp_dir).await;
        let camera = orchestrator.camera().unwrap();
        let event_bus = orchestrator.event_bus();

        let status = camera.status().await.unwrap();
        assert_eq!(status.device.map(|d| d.facing), Some(LensFacing::Back));

        perform(KeyAction::ToggleRecording, &camera, &event_bus).await;
        assert_eq!(camera.status().await.unwrap().recording, RecordingPhase::Recording);

        perform(KeyAction::ToggleRecording, &camera, &event_bus).await;
        assert_ne!(camera.status().await.unwrap().recording, RecordingPhase::Recording);
    }

    #[tokio::test]
    async fn test_quit_publishes_shutdown_request() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = started(&temp_dir).await;
        let event_bus = orchestrator.event_bus();
        let mut receiver = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "test".to_string(),
        );

        perform(KeyAction::Quit, &orchestrator.camera().unwrap(), &event_bus).await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "shutdown_requested");
    }
}
