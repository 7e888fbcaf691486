use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction a camera lens faces relative to the device screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    Back,
    Front,
    External,
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LensFacing::Back => "back",
            LensFacing::Front => "front",
            LensFacing::External => "external",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for LensFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back" => Ok(LensFacing::Back),
            "front" => Ok(LensFacing::Front),
            "external" => Ok(LensFacing::External),
            other => Err(format!("unknown lens facing '{}'", other)),
        }
    }
}

/// Pixel dimensions of an output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Static properties reported by the platform for one camera id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCharacteristics {
    pub facing: LensFacing,
    /// Clockwise rotation of the sensor relative to the device's natural orientation
    pub sensor_orientation: u32,
    /// Output sizes supported for JPEG stills
    pub jpeg_output_sizes: Vec<Size>,
}

impl DeviceCharacteristics {
    /// Largest JPEG output by pixel area. Ties keep the first size reported.
    pub fn max_still_size(&self) -> Option<Size> {
        self.jpeg_output_sizes
            .iter()
            .copied()
            .fold(None, |best: Option<Size>, size| match best {
                Some(current) if current.area() >= size.area() => Some(current),
                _ => Some(size),
            })
    }
}

/// Immutable description of the camera chosen for one open cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub facing: LensFacing,
    pub sensor_orientation_degrees: u32,
    pub max_still_size: Size,
}
