use super::types::{DeviceCharacteristics, DeviceDescriptor, LensFacing};
use crate::error::CameraError;
use crate::hal::CameraHal;
use tracing::{debug, info, warn};

/// Finds the camera to open for a requested lens facing
pub struct DeviceResolver<'a> {
    hal: &'a dyn CameraHal,
}

impl<'a> DeviceResolver<'a> {
    pub fn new(hal: &'a dyn CameraHal) -> Self {
        Self { hal }
    }

    /// Return the first device, in platform enumeration order, facing `facing`.
    ///
    /// Devices whose characteristics cannot be read are skipped. The order is
    /// whatever the platform reports and may change between calls.
    pub fn resolve(&self, facing: LensFacing) -> Result<DeviceDescriptor, CameraError> {
        for id in self.hal.device_ids()? {
            let Some(descriptor) = self.describe(&id) else {
                continue;
            };

            if descriptor.facing == facing {
                info!(
                    "Resolved {} camera {} (sensor {}°, max still {})",
                    facing,
                    descriptor.id,
                    descriptor.sensor_orientation_degrees,
                    descriptor.max_still_size
                );
                return Ok(descriptor);
            }

            debug!("Skipping camera {} facing {}", id, descriptor.facing);
        }

        warn!("No {} camera found", facing);
        Err(CameraError::NotFound { facing })
    }

    /// Every device that can be described, in enumeration order
    pub fn list(&self) -> Result<Vec<DeviceDescriptor>, CameraError> {
        Ok(self
            .hal
            .device_ids()?
            .iter()
            .filter_map(|id| self.describe(id))
            .collect())
    }

    fn describe(&self, id: &str) -> Option<DeviceDescriptor> {
        let characteristics = match self.hal.characteristics(id) {
            Ok(characteristics) => characteristics,
            Err(e) => {
                warn!("Skipping camera {}: {}", id, e);
                return None;
            }
        };

        descriptor_from(id, &characteristics)
    }
}

fn descriptor_from(id: &str, characteristics: &DeviceCharacteristics) -> Option<DeviceDescriptor> {
    let Some(max_still_size) = characteristics.max_still_size() else {
        warn!("Skipping camera {}: no JPEG output sizes", id);
        return None;
    };

    if characteristics.sensor_orientation % 90 != 0 {
        warn!(
            "Camera {} reports sensor orientation {}°, output rotation will be snapped",
            id, characteristics.sensor_orientation
        );
    }

    Some(DeviceDescriptor {
        id: id.to_string(),
        facing: characteristics.facing,
        sensor_orientation_degrees: characteristics.sensor_orientation,
        max_still_size,
    })
}
