use super::*;
use crate::config::CamflowConfig;
use crate::device::LensFacing;
use crate::events::CameraEvent;
use crate::recording::RecordingPhase;
use crate::session::SessionPhase;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::time::timeout;

fn create_test_config(temp_dir: &TempDir) -> CamflowConfig {
    let mut config = CamflowConfig::default();
    config.storage.path = temp_dir.path().join("captures").to_string_lossy().to_string();
    config.system.keyboard = false;
    config
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = CamflowOrchestrator::new(create_test_config(&temp_dir)).unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty());
    assert!(orchestrator.camera().is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir);
    config.system.command_queue_capacity = 0;

    assert!(CamflowOrchestrator::new(config).is_err());
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let temp_dir = TempDir::new().unwrap();
    let mut orchestrator = CamflowOrchestrator::new(create_test_config(&temp_dir)).unwrap();
    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.get("camera"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("notifier"), Some(&ComponentState::Stopped));
    assert!(!states.contains_key("keyboard"));
}

#[tokio::test]
async fn test_start_opens_configured_camera() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir);
    config.camera.facing = LensFacing::Front;

    let mut orchestrator = CamflowOrchestrator::new(config).unwrap();
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let status = orchestrator.camera().unwrap().status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Active);
    assert_eq!(status.device.map(|d| d.id), Some("1".to_string()));
    assert_eq!(
        orchestrator.get_component_state("camera").await,
        Some(ComponentState::Running)
    );
}

#[tokio::test]
async fn test_start_fails_without_matching_camera() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir);
    config.simulation.devices.retain(|d| d.facing == LensFacing::Back);
    config.camera.facing = LensFacing::Front;

    let mut orchestrator = CamflowOrchestrator::new(config).unwrap();
    assert!(orchestrator.start().await.is_err());
    assert_eq!(
        orchestrator.get_component_state("camera").await,
        Some(ComponentState::Failed)
    );
    assert_eq!(orchestrator.failed_components().await, vec!["camera".to_string()]);
}

#[tokio::test]
async fn test_shutdown_request_releases_everything() {
    let temp_dir = TempDir::new().unwrap();
    let mut orchestrator = CamflowOrchestrator::new(create_test_config(&temp_dir)).unwrap();
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let camera = orchestrator.camera().unwrap();
    camera.start_recording().await.unwrap();
    assert_eq!(camera.status().await.unwrap().recording, RecordingPhase::Recording);

    let hal = orchestrator.simulated_hal();
    let event_bus = orchestrator.event_bus();

    let run = tokio::spawn(async move { orchestrator.run().await });

    // Retry until the runtime's watcher has subscribed
    let exit_code = loop {
        event_bus.notify(CameraEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "test".to_string(),
        });
        if run.is_finished() {
            break run.await.unwrap().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(exit_code, 0);
    assert_eq!(hal.live_devices(), 0);
    assert_eq!(hal.live_sessions(), 0);
    assert!(!hal.still_sink_open());
    assert_eq!(hal.invalid_releases(), 0);
}

#[tokio::test]
async fn test_run_twice_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut orchestrator = CamflowOrchestrator::new(create_test_config(&temp_dir)).unwrap();
    orchestrator.start().await.unwrap();
    let event_bus = orchestrator.event_bus();

    let run = tokio::spawn(async move {
        let first = orchestrator.run().await;
        let second = orchestrator.run().await;
        (first, second)
    });

    let (first, second) = timeout(Duration::from_secs(5), async move {
        loop {
            event_bus.notify(CameraEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "test".to_string(),
            });
            if run.is_finished() {
                break run.await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(first.unwrap(), 0);
    assert!(second.is_err());
}

#[tokio::test]
async fn test_list_devices_from_simulation() {
    let devices = CamflowOrchestrator::list_devices(&CamflowConfig::default()).unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].facing, LensFacing::Back);
    assert_eq!(devices[1].facing, LensFacing::Front);
}
