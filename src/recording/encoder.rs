use crate::device::Size;
use crate::error::RecordingError;
use crate::hal::SurfaceId;
use crate::orientation::OutputRotation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// High-quality recording profile handed to the encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingProfile {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_video_bit_rate")]
    pub video_bit_rate: u32,
    #[serde(default = "default_audio_bit_rate")]
    pub audio_bit_rate: u32,
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,
}

impl Default for RecordingProfile {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            frame_rate: default_frame_rate(),
            video_bit_rate: default_video_bit_rate(),
            audio_bit_rate: default_audio_bit_rate(),
            audio_sample_rate: default_audio_sample_rate(),
        }
    }
}

fn default_frame_width() -> u32 {
    1920
}

fn default_frame_height() -> u32 {
    1080
}

fn default_frame_rate() -> u32 {
    30
}

fn default_video_bit_rate() -> u32 {
    17_000_000
}

fn default_audio_bit_rate() -> u32 {
    96_000
}

fn default_audio_sample_rate() -> u32 {
    48_000
}

/// Everything an encoder needs to be prepared for one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderParams {
    /// File the encoder writes the finished recording to
    pub output_path: PathBuf,
    pub frame_size: Size,
    pub frame_rate: u32,
    pub video_bit_rate: u32,
    pub audio_bit_rate: u32,
    pub audio_sample_rate: u32,
    pub orientation_hint: OutputRotation,
}

impl EncoderParams {
    pub fn from_profile(
        profile: &RecordingProfile,
        output_path: PathBuf,
        orientation_hint: OutputRotation,
    ) -> Self {
        Self {
            output_path,
            frame_size: Size::new(profile.frame_width, profile.frame_height),
            frame_rate: profile.frame_rate,
            video_bit_rate: profile.video_bit_rate,
            audio_bit_rate: profile.audio_bit_rate,
            audio_sample_rate: profile.audio_sample_rate,
            orientation_hint,
        }
    }
}

/// Hands out the files recordings are written to
pub trait RecordingOutputs: Send + Sync {
    /// Claim a new, unused output file
    fn reserve(&self) -> Result<PathBuf, RecordingError>;

    /// Give back a reserved file no recording was written to
    fn discard(&self, path: &Path);
}

/// Creates prepared encoders
pub trait EncoderFactory: Send + Sync {
    fn create(&self, params: &EncoderParams) -> Result<Box<dyn MediaEncoder>, RecordingError>;
}

/// A prepared video encoder fed through its input surface
pub trait MediaEncoder: Send + Sync {
    /// Surface the camera session streams recording frames into
    fn surface(&self) -> SurfaceId;

    fn start(&mut self) -> Result<(), RecordingError>;

    fn stop(&mut self) -> Result<(), RecordingError>;

    /// Release the encoder and its surface
    fn release(self: Box<Self>);
}
