//! Simulated encoder and output files that journal their lifecycle.

use super::encoder::{EncoderFactory, EncoderParams, MediaEncoder, RecordingOutputs};
use crate::error::RecordingError;
use crate::hal::SurfaceId;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderCall {
    Create(EncoderParams),
    Start(SurfaceId),
    Stop(SurfaceId),
    Release(SurfaceId),
}

#[derive(Default)]
struct EncoderJournal {
    calls: Vec<EncoderCall>,
    next_surface: u64,
    live: usize,
    fail_prepare: bool,
    fail_start: bool,
    fail_stop: bool,
}

/// Encoder factory handing out [`MockEncoder`]s
#[derive(Clone, Default)]
pub struct MockEncoderFactory {
    journal: Arc<Mutex<EncoderJournal>>,
}

impl MockEncoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EncoderCall> {
        self.journal.lock().calls.clone()
    }

    /// Encoders created and not yet released
    pub fn live_encoders(&self) -> usize {
        self.journal.lock().live
    }

    pub fn set_fail_prepare(&self, fail: bool) {
        self.journal.lock().fail_prepare = fail;
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.journal.lock().fail_start = fail;
    }

    pub fn set_fail_stop(&self, fail: bool) {
        self.journal.lock().fail_stop = fail;
    }
}

impl EncoderFactory for MockEncoderFactory {
    fn create(&self, params: &EncoderParams) -> Result<Box<dyn MediaEncoder>, RecordingError> {
        let mut journal = self.journal.lock();
        journal.calls.push(EncoderCall::Create(params.clone()));

        if journal.fail_prepare {
            return Err(RecordingError::Prepare {
                details: "encoder rejected profile".to_string(),
            });
        }

        journal.next_surface += 1;
        journal.live += 1;
        let surface = SurfaceId(5000 + journal.next_surface);
        debug!("Mock encoder prepared on {:?}", surface);

        Ok(Box::new(MockEncoder {
            surface,
            journal: Arc::clone(&self.journal),
        }))
    }
}

pub struct MockEncoder {
    surface: SurfaceId,
    journal: Arc<Mutex<EncoderJournal>>,
}

impl MediaEncoder for MockEncoder {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn start(&mut self) -> Result<(), RecordingError> {
        let mut journal = self.journal.lock();
        journal.calls.push(EncoderCall::Start(self.surface));
        if journal.fail_start {
            return Err(RecordingError::Start {
                details: "encoder failed to start".to_string(),
            });
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordingError> {
        let mut journal = self.journal.lock();
        journal.calls.push(EncoderCall::Stop(self.surface));
        if journal.fail_stop {
            return Err(RecordingError::Stop {
                details: "no frames were recorded".to_string(),
            });
        }
        Ok(())
    }

    fn release(self: Box<Self>) {
        let mut journal = self.journal.lock();
        journal.calls.push(EncoderCall::Release(self.surface));
        journal.live = journal.live.saturating_sub(1);
    }
}

#[derive(Default)]
struct OutputJournal {
    reserved: Vec<PathBuf>,
    discarded: Vec<PathBuf>,
    fail_reserve: bool,
}

/// Output files named in sequence without touching the filesystem
#[derive(Clone, Default)]
pub struct MockRecordingOutputs {
    journal: Arc<Mutex<OutputJournal>>,
}

impl MockRecordingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserved(&self) -> Vec<PathBuf> {
        self.journal.lock().reserved.clone()
    }

    pub fn discarded(&self) -> Vec<PathBuf> {
        self.journal.lock().discarded.clone()
    }

    pub fn set_fail_reserve(&self, fail: bool) {
        self.journal.lock().fail_reserve = fail;
    }
}

impl RecordingOutputs for MockRecordingOutputs {
    fn reserve(&self) -> Result<PathBuf, RecordingError> {
        let mut journal = self.journal.lock();
        if journal.fail_reserve {
            return Err(RecordingError::Output {
                details: "no space left".to_string(),
            });
        }

        let path = PathBuf::from(format!("video_{}.mp4", journal.reserved.len() + 1));
        journal.reserved.push(path.clone());
        Ok(path)
    }

    fn discard(&self, path: &Path) {
        self.journal.lock().discarded.push(path.to_path_buf());
    }
}
