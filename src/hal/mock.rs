//! Simulated camera service.
//!
//! Journals every call so tests can assert release ordering, and counts the
//! device and session handles it has handed out that are still live. In
//! [`ResponseMode::Immediate`] completions are sent on the hardware event
//! channel as soon as a request is made; in [`ResponseMode::Manual`] they are
//! queued until a test completes them explicitly.

use super::{
    CameraHal, CaptureRequest, DeviceHandle, DeviceId, Generation, HardwareEvent,
    HardwareEventSender, SessionHandle, SessionId, StillFrame, StillImageReader, SurfaceId,
};
use crate::device::{DeviceCharacteristics, LensFacing, Size};
use crate::error::CameraError;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// How the mock answers asynchronous requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Immediate,
    Manual,
}

/// One recorded call into the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalCall {
    OpenDevice {
        device_id: String,
        generation: Generation,
    },
    CloseDevice(DeviceId),
    CreateSession {
        device: DeviceId,
        surfaces: Vec<SurfaceId>,
        generation: Generation,
    },
    CloseSession(SessionId),
    SetRepeating {
        session: SessionId,
        request: CaptureRequest,
    },
    Capture {
        session: SessionId,
        request: CaptureRequest,
    },
    OpenStillSink(Size),
    ReleaseStillSink,
}

/// A camera the mock reports
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub id: String,
    pub characteristics: DeviceCharacteristics,
}

impl MockDevice {
    pub fn new(
        id: &str,
        facing: LensFacing,
        sensor_orientation: u32,
        jpeg_sizes: Vec<Size>,
    ) -> Self {
        Self {
            id: id.to_string(),
            characteristics: DeviceCharacteristics {
                facing,
                sensor_orientation,
                jpeg_output_sizes: jpeg_sizes,
            },
        }
    }
}

/// A back camera mounted at 90° and a front camera mounted at 270°
pub fn default_devices() -> Vec<MockDevice> {
    vec![
        MockDevice::new(
            "0",
            LensFacing::Back,
            90,
            vec![Size::new(1920, 1080), Size::new(4032, 3024), Size::new(640, 480)],
        ),
        MockDevice::new(
            "1",
            LensFacing::Front,
            270,
            vec![Size::new(1280, 720), Size::new(3264, 2448)],
        ),
    ]
}

#[derive(Default)]
struct MockState {
    calls: Vec<HalCall>,
    next_handle: u64,
    next_surface: u64,
    live_devices: HashSet<DeviceId>,
    live_sessions: HashSet<SessionId>,
    invalid_releases: usize,
    pending_opens: VecDeque<Generation>,
    pending_sessions: VecDeque<Generation>,
    unreadable: HashSet<String>,
    enumeration_fails: bool,
    fail_open: bool,
    fail_session_request: bool,
    fail_capture: bool,
    still_sink: Option<Size>,
    still_frames: VecDeque<Vec<u8>>,
    frames_released: usize,
    captures: u64,
}

impl MockState {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Simulated platform camera service
pub struct MockCameraHal {
    devices: Vec<MockDevice>,
    mode: ResponseMode,
    events: HardwareEventSender,
    state: Arc<Mutex<MockState>>,
}

impl MockCameraHal {
    pub fn new(devices: Vec<MockDevice>, events: HardwareEventSender, mode: ResponseMode) -> Self {
        Self {
            devices,
            mode,
            events,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Allocate a fresh surface, standing in for a display or encoder input
    pub fn create_surface(&self) -> SurfaceId {
        let mut state = self.state.lock();
        state.next_surface += 1;
        SurfaceId(1000 + state.next_surface)
    }

    pub fn calls(&self) -> Vec<HalCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn live_devices(&self) -> usize {
        self.state.lock().live_devices.len()
    }

    pub fn live_sessions(&self) -> usize {
        self.state.lock().live_sessions.len()
    }

    /// Releases of handles that were already released or never handed out
    pub fn invalid_releases(&self) -> usize {
        self.state.lock().invalid_releases
    }

    pub fn still_sink_open(&self) -> bool {
        self.state.lock().still_sink.is_some()
    }

    /// Frames handed to a reader and dropped again
    pub fn frames_released(&self) -> usize {
        self.state.lock().frames_released
    }

    pub fn set_unreadable(&self, device_id: &str) {
        self.state.lock().unreadable.insert(device_id.to_string());
    }

    pub fn set_enumeration_fails(&self, fails: bool) {
        self.state.lock().enumeration_fails = fails;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    pub fn set_fail_session_request(&self, fail: bool) {
        self.state.lock().fail_session_request = fail;
    }

    pub fn set_fail_capture(&self, fail: bool) {
        self.state.lock().fail_capture = fail;
    }

    /// Complete the oldest pending device open with a fresh handle
    pub fn complete_open(&self) -> Option<HardwareEvent> {
        let mut state = self.state.lock();
        let generation = state.pending_opens.pop_front()?;
        let id = DeviceId(state.allocate());
        state.live_devices.insert(id);
        Some(HardwareEvent::DeviceOpened {
            generation,
            device: DeviceHandle::new(id),
        })
    }

    /// Fail the oldest pending device open
    pub fn fail_pending_open(&self, code: i32) -> Option<HardwareEvent> {
        let generation = self.state.lock().pending_opens.pop_front()?;
        Some(HardwareEvent::DeviceError { generation, code })
    }

    /// Complete the oldest pending session request with a fresh handle
    pub fn complete_session(&self) -> Option<HardwareEvent> {
        let mut state = self.state.lock();
        let generation = state.pending_sessions.pop_front()?;
        let id = SessionId(state.allocate());
        state.live_sessions.insert(id);
        Some(HardwareEvent::SessionConfigured {
            generation,
            session: SessionHandle::new(id),
        })
    }

    /// Reject the oldest pending session request
    pub fn fail_pending_session(&self) -> Option<HardwareEvent> {
        let generation = self.state.lock().pending_sessions.pop_front()?;
        Some(HardwareEvent::SessionConfigureFailed { generation })
    }

    /// Buffer a frame in the still reader as if a capture had completed
    pub fn push_frame(&self, data: Vec<u8>) {
        self.state.lock().still_frames.push_back(data);
    }

    /// Deliver an event as though it came from the platform callback thread
    pub fn emit(&self, event: HardwareEvent) {
        if self.events.send(event).is_err() {
            debug!("Hardware event dropped, no receiver");
        }
    }

    fn journal(&self, call: HalCall) {
        self.state.lock().calls.push(call);
    }

    fn find(&self, device_id: &str) -> Option<&MockDevice> {
        self.devices.iter().find(|device| device.id == device_id)
    }
}

impl CameraHal for MockCameraHal {
    fn device_ids(&self) -> Result<Vec<String>, CameraError> {
        if self.state.lock().enumeration_fails {
            return Err(CameraError::DeviceAccess {
                device_id: "*".to_string(),
                details: "camera service unavailable".to_string(),
            });
        }
        Ok(self.devices.iter().map(|device| device.id.clone()).collect())
    }

    fn characteristics(&self, device_id: &str) -> Result<DeviceCharacteristics, CameraError> {
        if self.state.lock().unreadable.contains(device_id) {
            return Err(CameraError::DeviceAccess {
                device_id: device_id.to_string(),
                details: "characteristics unreadable".to_string(),
            });
        }

        self.find(device_id)
            .map(|device| device.characteristics.clone())
            .ok_or_else(|| CameraError::DeviceAccess {
                device_id: device_id.to_string(),
                details: "unknown camera id".to_string(),
            })
    }

    fn open_device(&self, device_id: &str, generation: Generation) -> Result<(), CameraError> {
        self.journal(HalCall::OpenDevice {
            device_id: device_id.to_string(),
            generation,
        });

        if self.state.lock().fail_open || self.find(device_id).is_none() {
            return Err(CameraError::DeviceAccess {
                device_id: device_id.to_string(),
                details: "open rejected".to_string(),
            });
        }

        self.state.lock().pending_opens.push_back(generation);
        if self.mode == ResponseMode::Immediate {
            if let Some(event) = self.complete_open() {
                self.emit(event);
            }
        }
        Ok(())
    }

    fn close_device(&self, device: DeviceHandle) {
        let mut state = self.state.lock();
        state.calls.push(HalCall::CloseDevice(device.id()));

        if !state.live_devices.remove(&device.id()) {
            warn!("Close of unknown device {:?}", device.id());
            state.invalid_releases += 1;
        }
    }

    fn create_session(
        &self,
        device: DeviceId,
        surfaces: &[SurfaceId],
        generation: Generation,
    ) -> Result<(), CameraError> {
        let mut state = self.state.lock();
        state.calls.push(HalCall::CreateSession {
            device,
            surfaces: surfaces.to_vec(),
            generation,
        });

        if state.fail_session_request {
            return Err(CameraError::ConfigurationFailure {
                details: "surface abandoned".to_string(),
            });
        }
        if !state.live_devices.contains(&device) {
            return Err(CameraError::DeviceAccess {
                device_id: format!("{}", device.0),
                details: "device is closed".to_string(),
            });
        }

        state.pending_sessions.push_back(generation);
        drop(state);

        if self.mode == ResponseMode::Immediate {
            if let Some(event) = self.complete_session() {
                self.emit(event);
            }
        }
        Ok(())
    }

    fn close_session(&self, session: SessionHandle) {
        let mut state = self.state.lock();
        state.calls.push(HalCall::CloseSession(session.id()));

        if !state.live_sessions.remove(&session.id()) {
            warn!("Close of unknown session {:?}", session.id());
            state.invalid_releases += 1;
        }
    }

    fn set_repeating_request(
        &self,
        session: SessionId,
        request: &CaptureRequest,
    ) -> Result<(), CameraError> {
        let mut state = self.state.lock();
        state.calls.push(HalCall::SetRepeating {
            session,
            request: request.clone(),
        });

        if !state.live_sessions.contains(&session) {
            return Err(CameraError::ConfigurationFailure {
                details: format!("session {} is closed", session.0),
            });
        }
        Ok(())
    }

    fn capture(&self, session: SessionId, request: &CaptureRequest) -> Result<(), CameraError> {
        let mut state = self.state.lock();
        state.calls.push(HalCall::Capture {
            session,
            request: request.clone(),
        });

        if state.fail_capture || !state.live_sessions.contains(&session) {
            return Err(CameraError::DeviceAccess {
                device_id: format!("session {}", session.0),
                details: "capture rejected".to_string(),
            });
        }

        state.captures += 1;
        let Some(size) = state.still_sink else {
            return Ok(());
        };
        let frame = synthetic_jpeg(size, state.captures);
        state.still_frames.push_back(frame);
        drop(state);

        if self.mode == ResponseMode::Immediate {
            self.emit(HardwareEvent::ImageAvailable);
        }
        Ok(())
    }

    fn open_still_sink(&self, size: Size) -> Result<Box<dyn StillImageReader>, CameraError> {
        let mut state = self.state.lock();
        state.calls.push(HalCall::OpenStillSink(size));
        state.still_sink = Some(size);
        state.still_frames.clear();
        let surface = SurfaceId(state.allocate());

        Ok(Box::new(MockStillReader {
            surface,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockStillReader {
    surface: SurfaceId,
    state: Arc<Mutex<MockState>>,
}

impl StillImageReader for MockStillReader {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn acquire_latest(&mut self) -> Option<Box<dyn StillFrame>> {
        let mut state = self.state.lock();
        let latest = state.still_frames.pop_back()?;
        let discarded = state.still_frames.len();
        state.still_frames.clear();
        state.frames_released += discarded;

        Some(Box::new(MockFrame {
            data: latest,
            state: Arc::clone(&self.state),
        }))
    }
}

impl Drop for MockStillReader {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.calls.push(HalCall::ReleaseStillSink);
        state.still_sink = None;
        state.still_frames.clear();
    }
}

struct MockFrame {
    data: Vec<u8>,
    state: Arc<Mutex<MockState>>,
}

impl StillFrame for MockFrame {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for MockFrame {
    fn drop(&mut self) {
        self.state.lock().frames_released += 1;
    }
}

/// Minimal JPEG-framed payload: SOI, a comment segment, EOI
pub fn synthetic_jpeg(size: Size, sequence: u64) -> Vec<u8> {
    let comment = format!("camflow {} #{}", size, sequence);
    let length = (comment.len() + 2) as u16;

    let mut data = vec![0xFF, 0xD8, 0xFF, 0xFE];
    data.extend_from_slice(&length.to_be_bytes());
    data.extend_from_slice(comment.as_bytes());
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}
