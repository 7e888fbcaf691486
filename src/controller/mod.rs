//! Executes session effects and serializes every camera operation onto one task.

mod camera;
mod driver;
mod service;

pub use camera::{CameraController, CameraStatus, ControllerParts};
pub use service::{CameraHandle, CameraService};
