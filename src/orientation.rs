//! Output rotation for captured stills and recordings.
//!
//! The rotation is derived from the sensor mounting angle, the device's
//! rotation at the moment the camera is opened, and the lens facing. It is
//! computed once per open cycle and not tracked afterwards.

use crate::device::LensFacing;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw orientation value the platform reports when the rotation is not known
pub const ORIENTATION_UNKNOWN: i32 = -1;

/// Display rotation codes reported by the platform orientation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayRotation {
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl DisplayRotation {
    /// Map a platform rotation code (0..=3) to a display rotation
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(DisplayRotation::Rotation0),
            1 => Some(DisplayRotation::Rotation90),
            2 => Some(DisplayRotation::Rotation180),
            3 => Some(DisplayRotation::Rotation270),
            _ => None,
        }
    }
}

/// Immutable mapping from display rotation codes to device rotation degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationTable {
    pub rotation_0: u32,
    pub rotation_90: u32,
    pub rotation_180: u32,
    pub rotation_270: u32,
}

impl Default for RotationTable {
    fn default() -> Self {
        Self {
            rotation_0: 0,
            rotation_90: 270,
            rotation_180: 180,
            rotation_270: 90,
        }
    }
}

impl RotationTable {
    pub fn degrees(&self, rotation: DisplayRotation) -> u32 {
        match rotation {
            DisplayRotation::Rotation0 => self.rotation_0,
            DisplayRotation::Rotation90 => self.rotation_90,
            DisplayRotation::Rotation180 => self.rotation_180,
            DisplayRotation::Rotation270 => self.rotation_270,
        }
    }

    /// Device rotation for a sampled display rotation (`None` means unknown)
    pub fn snapshot(&self, rotation: Option<DisplayRotation>) -> DeviceRotation {
        match rotation {
            Some(rotation) => DeviceRotation::Degrees(self.degrees(rotation) as i32),
            None => DeviceRotation::Unknown,
        }
    }

    pub fn entries(&self) -> [u32; 4] {
        [
            self.rotation_0,
            self.rotation_90,
            self.rotation_180,
            self.rotation_270,
        ]
    }
}

/// Device rotation sampled at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRotation {
    Unknown,
    Degrees(i32),
}

impl DeviceRotation {
    pub fn from_raw(raw: i32) -> Self {
        if raw == ORIENTATION_UNKNOWN {
            DeviceRotation::Unknown
        } else {
            DeviceRotation::Degrees(raw)
        }
    }
}

/// Platform orientation service sampled when a camera is opened
pub trait OrientationService: Send + Sync {
    /// Current display rotation, or `None` when the platform cannot tell
    fn rotation_snapshot(&self) -> Option<DisplayRotation>;
}

/// Orientation service that always reports the same rotation
#[derive(Debug, Clone, Copy)]
pub struct FixedOrientation(pub Option<DisplayRotation>);

impl OrientationService for FixedOrientation {
    fn rotation_snapshot(&self) -> Option<DisplayRotation> {
        self.0
    }
}

/// Clockwise rotation to tag onto stills and recordings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputRotation {
    #[default]
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl OutputRotation {
    /// Nearest quarter turn to `degrees`, normalized into 0..360
    pub fn from_degrees(degrees: i32) -> Self {
        match round_to_quarter(i64::from(degrees.rem_euclid(360))).rem_euclid(360) {
            90 => OutputRotation::Rotate90,
            180 => OutputRotation::Rotate180,
            270 => OutputRotation::Rotate270,
            _ => OutputRotation::Rotate0,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            OutputRotation::Rotate0 => 0,
            OutputRotation::Rotate90 => 90,
            OutputRotation::Rotate180 => 180,
            OutputRotation::Rotate270 => 270,
        }
    }
}

impl fmt::Display for OutputRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Integer rounding to a multiple of 90, truncating toward zero like the platform does
fn round_to_quarter(degrees: i64) -> i64 {
    (degrees + 45) / 90 * 90
}

/// Rotation that makes a frame from this sensor upright for the sampled device rotation.
///
/// Front-facing sensors are mirrored, so the device rotation is applied in the
/// opposite direction.
pub fn compute_output_rotation(
    sensor_orientation: u32,
    device_rotation: DeviceRotation,
    facing: LensFacing,
) -> OutputRotation {
    let DeviceRotation::Degrees(raw) = device_rotation else {
        return OutputRotation::Rotate0;
    };

    let mut rotation = round_to_quarter(i64::from(raw));
    if facing == LensFacing::Front {
        rotation = -rotation;
    }

    let sensor = i64::from(sensor_orientation % 360);
    let degrees = (sensor + rotation + 360).rem_euclid(360);
    // 0..360 always fits
    OutputRotation::from_degrees(degrees as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUARTERS: [i32; 4] = [0, 90, 180, 270];

    #[test]
    fn test_back_camera_upright() {
        let rotation =
            compute_output_rotation(90, DeviceRotation::Degrees(0), LensFacing::Back);
        assert_eq!(rotation, OutputRotation::Rotate90);
    }

    #[test]
    fn test_back_camera_device_rotated() {
        let table = RotationTable::default();
        let device_rotation = table.snapshot(Some(DisplayRotation::Rotation90));
        assert_eq!(device_rotation, DeviceRotation::Degrees(270));

        let rotation = compute_output_rotation(90, device_rotation, LensFacing::Back);
        assert_eq!(rotation, OutputRotation::Rotate0);
    }

    #[test]
    fn test_front_camera_mirrors_device_rotation() {
        let table = RotationTable::default();
        let device_rotation = table.snapshot(Some(DisplayRotation::Rotation90));

        let rotation = compute_output_rotation(90, device_rotation, LensFacing::Front);
        assert_eq!(rotation, OutputRotation::Rotate180);
    }

    #[test]
    fn test_unknown_rotation_means_no_correction() {
        for sensor in QUARTERS {
            for facing in [LensFacing::Back, LensFacing::Front, LensFacing::External] {
                let rotation =
                    compute_output_rotation(sensor as u32, DeviceRotation::Unknown, facing);
                assert_eq!(rotation, OutputRotation::Rotate0);
            }
        }

        assert_eq!(
            DeviceRotation::from_raw(ORIENTATION_UNKNOWN),
            DeviceRotation::Unknown
        );
        assert_eq!(RotationTable::default().snapshot(None), DeviceRotation::Unknown);
    }

    #[test]
    fn test_results_are_quarter_turns_and_periodic() {
        for sensor in QUARTERS {
            for device in QUARTERS {
                for facing in [LensFacing::Back, LensFacing::Front] {
                    let base = compute_output_rotation(
                        sensor as u32,
                        DeviceRotation::Degrees(device),
                        facing,
                    );
                    assert!(QUARTERS.contains(&(base.degrees() as i32)));

                    let wrapped = compute_output_rotation(
                        sensor as u32,
                        DeviceRotation::Degrees(device + 360),
                        facing,
                    );
                    assert_eq!(base, wrapped, "sensor {} device {} {:?}", sensor, device, facing);
                }
            }
        }
    }

    #[test]
    fn test_raw_rotation_rounds_to_nearest_quarter() {
        let near_zero = compute_output_rotation(0, DeviceRotation::Degrees(44), LensFacing::Back);
        assert_eq!(near_zero, OutputRotation::Rotate0);

        let near_ninety =
            compute_output_rotation(0, DeviceRotation::Degrees(45), LensFacing::Back);
        assert_eq!(near_ninety, OutputRotation::Rotate90);

        let almost_full =
            compute_output_rotation(90, DeviceRotation::Degrees(350), LensFacing::Back);
        assert_eq!(almost_full, OutputRotation::Rotate90);
    }

    #[test]
    fn test_extreme_inputs_do_not_overflow() {
        let rotation =
            compute_output_rotation(u32::MAX, DeviceRotation::Degrees(i32::MAX), LensFacing::Back);
        assert!(QUARTERS.contains(&(rotation.degrees() as i32)));

        let rotation =
            compute_output_rotation(u32::MAX, DeviceRotation::Degrees(i32::MIN), LensFacing::Front);
        assert!(QUARTERS.contains(&(rotation.degrees() as i32)));

        // 450 reduces to 90 before any arithmetic
        let rotation = compute_output_rotation(450, DeviceRotation::Degrees(0), LensFacing::Back);
        assert_eq!(rotation, OutputRotation::Rotate90);
    }

    #[test]
    fn test_display_rotation_codes() {
        assert_eq!(DisplayRotation::from_code(0), Some(DisplayRotation::Rotation0));
        assert_eq!(DisplayRotation::from_code(3), Some(DisplayRotation::Rotation270));
        assert_eq!(DisplayRotation::from_code(4), None);
    }
}
