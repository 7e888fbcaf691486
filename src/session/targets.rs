use crate::hal::SurfaceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the repeating request feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureMode {
    PreviewOnly,
    PreviewAndRecord,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::PreviewOnly => f.write_str("preview"),
            CaptureMode::PreviewAndRecord => f.write_str("preview+record"),
        }
    }
}

/// Surfaces a session binds. The mode follows from whether a recording surface is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSet {
    preview: SurfaceId,
    still: SurfaceId,
    record: Option<SurfaceId>,
}

impl TargetSet {
    pub fn preview_only(preview: SurfaceId, still: SurfaceId) -> Self {
        Self {
            preview,
            still,
            record: None,
        }
    }

    pub fn with_recording(self, record: SurfaceId) -> Self {
        Self {
            record: Some(record),
            ..self
        }
    }

    pub fn without_recording(self) -> Self {
        Self {
            record: None,
            ..self
        }
    }

    pub fn mode(&self) -> CaptureMode {
        if self.record.is_some() {
            CaptureMode::PreviewAndRecord
        } else {
            CaptureMode::PreviewOnly
        }
    }

    pub fn preview(&self) -> SurfaceId {
        self.preview
    }

    pub fn still(&self) -> SurfaceId {
        self.still
    }

    pub fn record(&self) -> Option<SurfaceId> {
        self.record
    }

    /// Every surface the session must be created with
    pub fn session_surfaces(&self) -> Vec<SurfaceId> {
        let mut surfaces = vec![self.preview, self.still];
        surfaces.extend(self.record);
        surfaces
    }

    /// Surfaces the repeating request streams into
    pub fn repeating_surfaces(&self) -> Vec<SurfaceId> {
        let mut surfaces = vec![self.preview];
        surfaces.extend(self.record);
        surfaces
    }
}
