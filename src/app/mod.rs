pub mod keyboard_input;

mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::CamflowOrchestrator;
pub use types::{ComponentState, ShutdownReason};
