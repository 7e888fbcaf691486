mod coordinator;
mod encoder;
pub mod mock;

pub use coordinator::{RecordingCoordinator, RecordingPhase, RecordingState, SessionControl};
pub use encoder::{
    EncoderFactory, EncoderParams, MediaEncoder, RecordingOutputs, RecordingProfile,
};
