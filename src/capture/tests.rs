use super::*;
use crate::device::Size;
use crate::error::{CameraError, PersistenceError};
use crate::events::{CameraEvent, EventBus};
use crate::hal::mock::{default_devices, HalCall, MockCameraHal, ResponseMode};
use crate::hal::{
    hardware_event_channel, CameraHal, CaptureRequest, RequestTemplate, SessionId, SurfaceId,
};
use crate::orientation::OutputRotation;
use crate::session::{ActiveSession, CaptureMode, TargetSet};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

const PREVIEW: SurfaceId = SurfaceId(1);
const STILL: SurfaceId = SurfaceId(2);
const RECORD: SurfaceId = SurfaceId(3);

#[derive(Default)]
struct MemoryPersistence {
    images: Mutex<Vec<Bytes>>,
}

#[async_trait]
impl ImagePersistence for MemoryPersistence {
    async fn persist(&self, capture_id: &str, image: Bytes) -> Result<PathBuf, PersistenceError> {
        self.images.lock().push(image);
        Ok(PathBuf::from(format!("memory/{}.jpg", capture_id)))
    }
}

struct FailingPersistence;

#[async_trait]
impl ImagePersistence for FailingPersistence {
    async fn persist(&self, capture_id: &str, _image: Bytes) -> Result<PathBuf, PersistenceError> {
        Err(PersistenceError::Write {
            path: format!("{}.jpg", capture_id),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }
}

/// A mock HAL with one live session, as a session machine would have configured it
fn hal_with_session() -> (Arc<MockCameraHal>, SessionId) {
    let (sender, _receiver) = hardware_event_channel();
    let hal = Arc::new(MockCameraHal::new(default_devices(), sender, ResponseMode::Manual));

    hal.open_device("0", crate::hal::Generation(1)).unwrap();
    let device = match hal.complete_open() {
        Some(crate::hal::HardwareEvent::DeviceOpened { device, .. }) => device,
        other => panic!("Unexpected event {:?}", other),
    };
    hal.create_session(device.id(), &[PREVIEW, STILL], crate::hal::Generation(2))
        .unwrap();
    let session = match hal.complete_session() {
        Some(crate::hal::HardwareEvent::SessionConfigured { session, .. }) => session.id(),
        other => panic!("Unexpected event {:?}", other),
    };
    hal.clear_calls();

    (hal, session)
}

fn active(session: SessionId, targets: TargetSet) -> Option<ActiveSession> {
    Some(ActiveSession { session, targets })
}

#[test]
fn test_start_repeating_preview_only() {
    let (hal, session) = hal_with_session();
    let mut dispatcher = RequestDispatcher::new(hal.clone());

    let mode = dispatcher
        .start_repeating(active(session, TargetSet::preview_only(PREVIEW, STILL)))
        .unwrap();

    assert_eq!(mode, CaptureMode::PreviewOnly);
    assert_eq!(
        hal.calls(),
        vec![HalCall::SetRepeating {
            session,
            request: CaptureRequest {
                template: RequestTemplate::Preview,
                targets: vec![PREVIEW],
                jpeg_orientation: None,
            },
        }]
    );
    assert_eq!(dispatcher.repeating().map(|r| r.mode), Some(CaptureMode::PreviewOnly));
}

#[test]
fn test_start_repeating_with_recording_uses_record_template() {
    let (hal, session) = hal_with_session();
    let mut dispatcher = RequestDispatcher::new(hal.clone());
    let targets = TargetSet::preview_only(PREVIEW, STILL).with_recording(RECORD);

    dispatcher.start_repeating(active(session, targets)).unwrap();

    match hal.calls().as_slice() {
        [HalCall::SetRepeating { request, .. }] => {
            assert_eq!(request.template, RequestTemplate::Record);
            assert_eq!(request.targets, vec![PREVIEW, RECORD]);
        }
        other => panic!("Unexpected calls {:?}", other),
    }
}

#[test]
fn test_capture_tags_jpeg_orientation() {
    let (hal, session) = hal_with_session();
    let dispatcher = RequestDispatcher::new(hal.clone());

    dispatcher
        .capture_once(
            active(session, TargetSet::preview_only(PREVIEW, STILL)),
            OutputRotation::Rotate270,
        )
        .unwrap();

    assert_eq!(
        hal.calls(),
        vec![HalCall::Capture {
            session,
            request: CaptureRequest {
                template: RequestTemplate::StillCapture,
                targets: vec![STILL],
                jpeg_orientation: Some(OutputRotation::Rotate270),
            },
        }]
    );
}

#[test]
fn test_requests_without_session_make_no_hardware_call() {
    let (hal, _) = hal_with_session();
    let mut dispatcher = RequestDispatcher::new(hal.clone());

    assert_eq!(
        dispatcher.capture_once(None, OutputRotation::Rotate0),
        Err(CameraError::SessionUnavailable { operation: "capture" })
    );
    assert!(matches!(
        dispatcher.start_repeating(None),
        Err(CameraError::SessionUnavailable { .. })
    ));
    assert!(hal.calls().is_empty());
    assert!(dispatcher.repeating().is_none());
}

#[test]
fn test_session_closed_clears_only_matching_repeating_request() {
    let (hal, session) = hal_with_session();
    let mut dispatcher = RequestDispatcher::new(hal);
    dispatcher
        .start_repeating(active(session, TargetSet::preview_only(PREVIEW, STILL)))
        .unwrap();

    dispatcher.session_closed(SessionId(session.0 + 100));
    assert!(dispatcher.repeating().is_some());

    dispatcher.session_closed(session);
    assert!(dispatcher.repeating().is_none());
}

#[tokio::test]
async fn test_sink_persists_latest_frame_only() {
    let (sender, _receiver) = hardware_event_channel();
    let hal = MockCameraHal::new(default_devices(), sender, ResponseMode::Manual);
    let persistence = Arc::new(MemoryPersistence::default());
    let event_bus = Arc::new(EventBus::new(16));
    let mut events = event_bus.subscribe();

    let mut sink = StillImageSink::new(persistence.clone(), Arc::clone(&event_bus));
    sink.attach(hal.open_still_sink(Size::new(640, 480)).unwrap());

    hal.push_frame(vec![0xFF, 0xD8, 1, 0xFF, 0xD9]);
    hal.push_frame(vec![0xFF, 0xD8, 2, 0xFF, 0xD9]);

    sink.on_image_available().unwrap().await.unwrap();

    assert_eq!(
        persistence.images.lock().as_slice(),
        &[Bytes::from_static(&[0xFF, 0xD8, 2, 0xFF, 0xD9])]
    );
    // the discarded older frame and the delivered one
    assert_eq!(hal.frames_released(), 2);

    match events.recv().await.unwrap() {
        CameraEvent::ImageSaved { size_bytes, .. } => assert_eq!(size_bytes, 5),
        other => panic!("Unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_sink_reports_persistence_failure() {
    let (sender, _receiver) = hardware_event_channel();
    let hal = MockCameraHal::new(default_devices(), sender, ResponseMode::Manual);
    let event_bus = Arc::new(EventBus::new(16));
    let mut events = event_bus.subscribe();

    let mut sink = StillImageSink::new(Arc::new(FailingPersistence), Arc::clone(&event_bus));
    sink.attach(hal.open_still_sink(Size::new(640, 480)).unwrap());
    hal.push_frame(vec![0xFF, 0xD8, 0xFF, 0xD9]);

    sink.on_image_available().unwrap().await.unwrap();

    match events.recv().await.unwrap() {
        CameraEvent::ImageSaveFailed { reason, .. } => assert!(reason.contains("disk full")),
        other => panic!("Unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_sink_without_frame_or_reader() {
    let (sender, _receiver) = hardware_event_channel();
    let hal = MockCameraHal::new(default_devices(), sender, ResponseMode::Manual);
    let event_bus = Arc::new(EventBus::new(16));
    let mut sink = StillImageSink::new(Arc::new(MemoryPersistence::default()), event_bus);

    assert!(matches!(sink.take_image(), CaptureOutcome::Failure(_)));

    sink.attach(hal.open_still_sink(Size::new(640, 480)).unwrap());
    assert!(sink.surface().is_some());
    assert!(matches!(sink.take_image(), CaptureOutcome::Failure(_)));
    assert!(sink.on_image_available().is_none());

    sink.release();
    assert!(sink.surface().is_none());
    assert!(!hal.still_sink_open());
    assert_eq!(hal.calls().last(), Some(&HalCall::ReleaseStillSink));
}
