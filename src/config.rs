use crate::device::{LensFacing, Size};
use crate::hal::mock::MockDevice;
use crate::orientation::{DisplayRotation, RotationTable};
use crate::recording::RecordingProfile;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CamflowConfig {
    pub camera: CameraConfig,
    #[serde(default)]
    pub orientation: RotationTable,
    #[serde(default)]
    pub recording: RecordingProfile,
    pub storage: StorageConfig,
    pub simulation: SimulationConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Lens facing to open at startup
    #[serde(default = "default_facing")]
    pub facing: LensFacing,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory captured stills and recordings are written to
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Still image file name prefix, followed by a timestamp
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,

    /// Recording file name prefix, followed by a timestamp
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,

    /// Write a JSON sidecar next to every image
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Display rotation code (0..=3) reported at open time, -1 when unknown
    #[serde(default = "default_display_rotation")]
    pub display_rotation: i32,

    /// Cameras the simulated platform exposes
    #[serde(default = "default_simulated_devices")]
    pub devices: Vec<SimulatedDevice>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulatedDevice {
    pub id: String,
    pub facing: LensFacing,
    pub sensor_orientation: u32,
    #[serde(default)]
    pub jpeg_sizes: Vec<Size>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Pending commands the camera service buffers
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,

    /// Enable keyboard triggers on the controlling terminal
    #[serde(default = "default_keyboard")]
    pub keyboard: bool,
}

impl SimulationConfig {
    /// Display rotation as the orientation service reports it
    pub fn display_rotation(&self) -> Option<DisplayRotation> {
        u32::try_from(self.display_rotation)
            .ok()
            .and_then(DisplayRotation::from_code)
    }

    pub fn mock_devices(&self) -> Vec<MockDevice> {
        self.devices
            .iter()
            .map(|device| {
                MockDevice::new(
                    &device.id,
                    device.facing,
                    device.sensor_orientation,
                    device.jpeg_sizes.clone(),
                )
            })
            .collect()
    }
}

impl CamflowConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camflow.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let table = RotationTable::default();
        let recording = RecordingProfile::default();

        let settings = Config::builder()
            .set_default("camera.facing", default_facing().to_string())?
            .set_default("orientation.rotation_0", table.rotation_0)?
            .set_default("orientation.rotation_90", table.rotation_90)?
            .set_default("orientation.rotation_180", table.rotation_180)?
            .set_default("orientation.rotation_270", table.rotation_270)?
            .set_default("recording.frame_width", recording.frame_width)?
            .set_default("recording.frame_height", recording.frame_height)?
            .set_default("recording.frame_rate", recording.frame_rate)?
            .set_default("recording.video_bit_rate", recording.video_bit_rate)?
            .set_default("recording.audio_bit_rate", recording.audio_bit_rate)?
            .set_default("recording.audio_sample_rate", recording.audio_sample_rate)?
            .set_default("storage.path", default_storage_path())?
            .set_default("storage.image_prefix", default_image_prefix())?
            .set_default("storage.video_prefix", default_video_prefix())?
            .set_default("storage.save_metadata", default_save_metadata())?
            .set_default("simulation.display_rotation", default_display_rotation())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default(
                "system.command_queue_capacity",
                default_command_queue_capacity() as i64,
            )?
            .set_default("system.keyboard", default_keyboard())?
            .add_source(File::with_name(&path_str).required(false))
            // CAMFLOW_SECTION__KEY
            .add_source(
                Environment::with_prefix("CAMFLOW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CamflowConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for degrees in self.orientation.entries() {
            if degrees % 90 != 0 || degrees >= 360 {
                return Err(ConfigError::Message(format!(
                    "Rotation table entry {} must be one of 0, 90, 180, 270",
                    degrees
                )));
            }
        }

        let recording = &self.recording;
        if recording.frame_width == 0 || recording.frame_height == 0 {
            return Err(ConfigError::Message(
                "Recording frame size must be greater than 0".to_string(),
            ));
        }

        if recording.frame_rate == 0 {
            return Err(ConfigError::Message(
                "Recording frame rate must be greater than 0".to_string(),
            ));
        }

        if recording.video_bit_rate == 0
            || recording.audio_bit_rate == 0
            || recording.audio_sample_rate == 0
        {
            return Err(ConfigError::Message(
                "Recording bit rates and sample rate must be greater than 0".to_string(),
            ));
        }

        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Storage path must not be empty".to_string(),
            ));
        }

        for prefix in [&self.storage.image_prefix, &self.storage.video_prefix] {
            if prefix.contains(|c: char| c == '/' || c == '\\') {
                return Err(ConfigError::Message(format!(
                    "File prefix '{}' must not contain a path separator",
                    prefix
                )));
            }
        }

        if !(-1..=3).contains(&self.simulation.display_rotation) {
            return Err(ConfigError::Message(format!(
                "Display rotation code {} must be between 0 and 3, or -1 for unknown",
                self.simulation.display_rotation
            )));
        }

        let mut ids = HashSet::new();
        for device in &self.simulation.devices {
            if !ids.insert(device.id.as_str()) {
                return Err(ConfigError::Message(format!(
                    "Simulated camera id '{}' is used more than once",
                    device.id
                )));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.command_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Command queue capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CamflowConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                facing: default_facing(),
            },
            orientation: RotationTable::default(),
            recording: RecordingProfile::default(),
            storage: StorageConfig {
                path: default_storage_path(),
                image_prefix: default_image_prefix(),
                video_prefix: default_video_prefix(),
                save_metadata: default_save_metadata(),
            },
            simulation: SimulationConfig {
                display_rotation: default_display_rotation(),
                devices: default_simulated_devices(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                command_queue_capacity: default_command_queue_capacity(),
                keyboard: default_keyboard(),
            },
        }
    }
}

// Default value functions
fn default_facing() -> LensFacing {
    LensFacing::Back
}

fn default_storage_path() -> String {
    "./captures".to_string()
}

fn default_image_prefix() -> String {
    "image".to_string()
}

fn default_video_prefix() -> String {
    "video".to_string()
}

fn default_save_metadata() -> bool {
    false
}

fn default_display_rotation() -> i32 {
    0
}

fn default_simulated_devices() -> Vec<SimulatedDevice> {
    crate::hal::mock::default_devices()
        .into_iter()
        .map(|device| SimulatedDevice {
            id: device.id,
            facing: device.characteristics.facing,
            sensor_orientation: device.characteristics.sensor_orientation,
            jpeg_sizes: device.characteristics.jpeg_output_sizes,
        })
        .collect()
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_command_queue_capacity() -> usize {
    32
}

fn default_keyboard() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config() {
        let config = CamflowConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.camera.facing, LensFacing::Back);
        assert_eq!(config.storage.video_prefix, "video");
        assert_eq!(config.orientation, RotationTable::default());
        assert_eq!(config.simulation.devices.len(), 2);
        assert_eq!(
            config.simulation.display_rotation(),
            Some(DisplayRotation::Rotation0)
        );
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[camera]
facing = "front"

[orientation]
rotation_90 = 90
rotation_270 = 270

[storage]
path = "/tmp/camflow-stills"
video_prefix = "clip"

[simulation]
display_rotation = -1

[[simulation.devices]]
id = "7"
facing = "front"
sensor_orientation = 270
jpeg_sizes = [{{ width = 640, height = 480 }}]
"#
        )
        .unwrap();

        let config = CamflowConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.camera.facing, LensFacing::Front);
        assert_eq!(config.orientation.rotation_90, 90);
        assert_eq!(config.orientation.rotation_180, 180);
        assert_eq!(config.storage.path, "/tmp/camflow-stills");
        assert_eq!(config.storage.image_prefix, "image");
        assert_eq!(config.storage.video_prefix, "clip");
        assert_eq!(config.simulation.display_rotation(), None);
        assert_eq!(config.simulation.devices.len(), 1);
        assert_eq!(config.simulation.devices[0].jpeg_sizes, vec![Size::new(640, 480)]);
        assert_eq!(config.recording, RecordingProfile::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_variable_override() {
        env::set_var("CAMFLOW_SYSTEM__COMMAND_QUEUE_CAPACITY", "7");

        let config = CamflowConfig::load_from_file("does-not-exist.toml").unwrap();
        assert_eq!(config.system.command_queue_capacity, 7);

        env::remove_var("CAMFLOW_SYSTEM__COMMAND_QUEUE_CAPACITY");
    }

    #[test]
    fn test_config_validation() {
        let mut config = CamflowConfig::default();

        config.orientation.rotation_90 = 45;
        assert!(config.validate().is_err());
        config.orientation.rotation_90 = 270;

        config.recording.frame_rate = 0;
        assert!(config.validate().is_err());
        config.recording.frame_rate = 30;

        config.simulation.display_rotation = 4;
        assert!(config.validate().is_err());
        config.simulation.display_rotation = 1;

        config.simulation.devices.push(config.simulation.devices[0].clone());
        assert!(config.validate().is_err());
        config.simulation.devices.pop();

        config.system.command_queue_capacity = 0;
        assert!(config.validate().is_err());
        config.system.command_queue_capacity = 32;

        config.storage.video_prefix = "clips/video".to_string();
        assert!(config.validate().is_err());
        config.storage.video_prefix = "video".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let rendered = toml::to_string_pretty(&CamflowConfig::default()).unwrap();
        let parsed: CamflowConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, CamflowConfig::default());
    }
}
