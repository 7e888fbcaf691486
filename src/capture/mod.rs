mod dispatcher;
mod sink;
#[cfg(test)]
mod tests;

pub use dispatcher::{RepeatingRequest, RequestDispatcher};
pub use sink::{CaptureOutcome, ImagePersistence, StillImageSink};
