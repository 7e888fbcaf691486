mod machine;
mod state;
mod targets;

pub use machine::{ActiveSession, Effect, SessionInput, SessionMachine};
pub use state::SessionPhase;
pub use targets::{CaptureMode, TargetSet};
