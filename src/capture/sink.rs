use crate::error::PersistenceError;
use crate::events::{CameraEvent, EventBus};
use crate::hal::{StillImageReader, SurfaceId};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of draining the still-image reader once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    StillImageBytes(Bytes),
    Failure(String),
}

/// Where captured stills end up
#[async_trait]
pub trait ImagePersistence: Send + Sync {
    /// Store one encoded image and return where it was written
    async fn persist(&self, capture_id: &str, image: Bytes) -> Result<PathBuf, PersistenceError>;
}

/// Owns the still-image reader and hands finished frames to persistence
pub struct StillImageSink {
    reader: Option<Box<dyn StillImageReader>>,
    persistence: Arc<dyn ImagePersistence>,
    event_bus: Arc<EventBus>,
}

impl StillImageSink {
    pub fn new(persistence: Arc<dyn ImagePersistence>, event_bus: Arc<EventBus>) -> Self {
        Self {
            reader: None,
            persistence,
            event_bus,
        }
    }

    /// Take ownership of a reader, releasing any previous one
    pub fn attach(&mut self, reader: Box<dyn StillImageReader>) -> SurfaceId {
        let surface = reader.surface();
        if self.reader.replace(reader).is_some() {
            warn!("Still image reader replaced while still attached");
        }
        surface
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.reader.as_ref().map(|reader| reader.surface())
    }

    pub fn release(&mut self) {
        if self.reader.take().is_some() {
            debug!("Still image reader released");
        }
    }

    /// Copy out the newest pending frame and give its buffer back right away
    pub fn take_image(&mut self) -> CaptureOutcome {
        let Some(reader) = self.reader.as_mut() else {
            return CaptureOutcome::Failure("still image reader is closed".to_string());
        };

        match reader.acquire_latest() {
            Some(frame) => {
                let bytes = Bytes::copy_from_slice(frame.data());
                drop(frame);
                CaptureOutcome::StillImageBytes(bytes)
            }
            None => CaptureOutcome::Failure("no frame available".to_string()),
        }
    }

    /// Handle an image-available notification. Persistence runs on its own task.
    pub fn on_image_available(&mut self) -> Option<JoinHandle<()>> {
        let capture_id = Uuid::new_v4().to_string();

        match self.take_image() {
            CaptureOutcome::StillImageBytes(image) => {
                debug!("Captured still {} ({} bytes)", capture_id, image.len());
                Some(self.spawn_persist(capture_id, image))
            }
            CaptureOutcome::Failure(reason) => {
                self.event_bus
                    .notify(CameraEvent::ImageSaveFailed { capture_id, reason });
                None
            }
        }
    }

    fn spawn_persist(&self, capture_id: String, image: Bytes) -> JoinHandle<()> {
        let persistence = Arc::clone(&self.persistence);
        let event_bus = Arc::clone(&self.event_bus);

        tokio::spawn(async move {
            let size_bytes = image.len();
            match persistence.persist(&capture_id, image).await {
                Ok(location) => {
                    info!("Saved picture to {}", location.display());
                    event_bus.notify(CameraEvent::ImageSaved {
                        capture_id,
                        location,
                        size_bytes,
                    });
                }
                Err(e) => {
                    event_bus.notify(CameraEvent::ImageSaveFailed {
                        capture_id,
                        reason: e.to_string(),
                    });
                }
            }
        })
    }
}
