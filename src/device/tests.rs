use super::*;
use crate::error::CameraError;
use crate::hal::hardware_event_channel;
use crate::hal::mock::{default_devices, MockCameraHal, MockDevice, ResponseMode};

fn mock_hal(devices: Vec<MockDevice>) -> MockCameraHal {
    let (sender, _receiver) = hardware_event_channel();
    MockCameraHal::new(devices, sender, ResponseMode::Manual)
}

#[test]
fn test_resolve_back_camera() {
    let hal = mock_hal(default_devices());
    let descriptor = DeviceResolver::new(&hal).resolve(LensFacing::Back).unwrap();

    assert_eq!(descriptor.id, "0");
    assert_eq!(descriptor.facing, LensFacing::Back);
    assert_eq!(descriptor.sensor_orientation_degrees, 90);
    assert_eq!(descriptor.max_still_size, Size::new(4032, 3024));
}

#[test]
fn test_resolve_first_match_in_enumeration_order() {
    let hal = mock_hal(vec![
        MockDevice::new("2", LensFacing::Front, 270, vec![Size::new(640, 480)]),
        MockDevice::new("5", LensFacing::Back, 90, vec![Size::new(800, 600)]),
        MockDevice::new("7", LensFacing::Back, 270, vec![Size::new(1600, 1200)]),
    ]);

    let descriptor = DeviceResolver::new(&hal).resolve(LensFacing::Back).unwrap();
    assert_eq!(descriptor.id, "5");
}

#[test]
fn test_resolve_skips_unreadable_devices() {
    let hal = mock_hal(vec![
        MockDevice::new("0", LensFacing::Back, 90, vec![Size::new(640, 480)]),
        MockDevice::new("1", LensFacing::Back, 0, vec![Size::new(1280, 720)]),
    ]);
    hal.set_unreadable("0");

    let descriptor = DeviceResolver::new(&hal).resolve(LensFacing::Back).unwrap();
    assert_eq!(descriptor.id, "1");
}

#[test]
fn test_resolve_skips_devices_without_jpeg_sizes() {
    let hal = mock_hal(vec![
        MockDevice::new("0", LensFacing::Front, 270, Vec::new()),
        MockDevice::new("1", LensFacing::Front, 270, vec![Size::new(1280, 720)]),
    ]);

    let descriptor = DeviceResolver::new(&hal).resolve(LensFacing::Front).unwrap();
    assert_eq!(descriptor.id, "1");
}

#[test]
fn test_resolve_not_found() {
    let hal = mock_hal(default_devices());
    let result = DeviceResolver::new(&hal).resolve(LensFacing::External);

    assert_eq!(
        result,
        Err(CameraError::NotFound {
            facing: LensFacing::External
        })
    );
}

#[test]
fn test_enumeration_failure_is_device_access() {
    let hal = mock_hal(default_devices());
    hal.set_enumeration_fails(true);

    let result = DeviceResolver::new(&hal).resolve(LensFacing::Back);
    assert!(matches!(result, Err(CameraError::DeviceAccess { .. })));
}

#[test]
fn test_list_returns_describable_devices() {
    let hal = mock_hal(default_devices());
    hal.set_unreadable("1");

    let devices = DeviceResolver::new(&hal).list().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "0");
}

#[test]
fn test_max_still_size_prefers_first_on_tie() {
    let characteristics = DeviceCharacteristics {
        facing: LensFacing::Back,
        sensor_orientation: 90,
        jpeg_output_sizes: vec![Size::new(1200, 800), Size::new(800, 1200), Size::new(640, 480)],
    };
    assert_eq!(characteristics.max_still_size(), Some(Size::new(1200, 800)));

    let empty = DeviceCharacteristics {
        jpeg_output_sizes: Vec::new(),
        ..characteristics
    };
    assert_eq!(empty.max_still_size(), None);
}

#[test]
fn test_lens_facing_parse() {
    assert_eq!("Front".parse::<LensFacing>(), Ok(LensFacing::Front));
    assert_eq!(LensFacing::External.to_string(), "external");
    assert!("side".parse::<LensFacing>().is_err());
}
