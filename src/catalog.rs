//! Device catalog: fresh enumeration and device selection.

use crate::capability::reduce_aspect_ratios;
use crate::errors::CameraError;
use crate::permissions::PermissionStatus;
use crate::platform::{DeviceDiscovery, DeviceRecord};
use crate::types::{CameraDevice, DeviceKind, DeviceSelector};
use std::sync::Arc;

/// Read-only view over the discovery primitive. Cloning is cheap and it does
/// not go through the session's command queue.
#[derive(Clone)]
pub struct DeviceCatalog {
    discovery: Arc<dyn DeviceDiscovery>,
}

impl DeviceCatalog {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>) -> Self {
        Self { discovery }
    }

    /// Enumerate devices in hardware-index order. Every call hits the
    /// hardware again.
    pub fn enumerate(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let mut records = self.discovery.discover().map_err(|e| match e {
            CameraError::HardwareUnavailable(msg) => CameraError::HardwareUnavailable(msg),
            other => CameraError::HardwareUnavailable(other.to_string()),
        })?;
        records.sort_by_key(|r| r.hardware_index);

        let devices: Vec<CameraDevice> = records.into_iter().map(normalize).collect();
        log::debug!("Enumerated {} camera devices", devices.len());
        Ok(devices)
    }

    pub fn authorization(&self) -> PermissionStatus {
        self.discovery.authorization()
    }

    pub fn find(&self, device_id: &str) -> Result<CameraDevice, CameraError> {
        self.enumerate()?
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| CameraError::DeviceNotFound(device_id.to_string()))
    }

    /// Resolve a selector against a fresh enumeration.
    pub fn select(
        &self,
        selector: &DeviceSelector,
        prefer_physical: bool,
    ) -> Result<CameraDevice, CameraError> {
        let devices = self.enumerate()?;
        select_from(&devices, selector, prefer_physical)
    }
}

/// An explicit id always wins. Otherwise pick by direction; with
/// `prefer_physical` a single-lens device beats any virtual one, wide-angle
/// first.
pub fn select_from(
    devices: &[CameraDevice],
    selector: &DeviceSelector,
    prefer_physical: bool,
) -> Result<CameraDevice, CameraError> {
    if let Some(id) = &selector.device_id {
        return devices
            .iter()
            .find(|d| &d.id == id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound(id.clone()));
    }

    let facing: Vec<&CameraDevice> = devices
        .iter()
        .filter(|d| d.lens_direction == selector.lens_direction)
        .collect();

    let chosen = if prefer_physical {
        let physical = || facing.iter().filter(|d| !d.device_kind.is_virtual());
        physical()
            .find(|d| d.device_kind == DeviceKind::WideAngle)
            .or_else(|| physical().next())
            .or_else(|| {
                let fallback = facing.first();
                if let Some(d) = fallback {
                    log::warn!(
                        "Only virtual devices face {}; using {} with switching restricted",
                        selector.lens_direction,
                        d.id
                    );
                }
                fallback
            })
    } else {
        facing.first()
    };

    chosen.map(|d| (*d).clone()).ok_or_else(|| {
        CameraError::DeviceNotFound(format!("no {} camera", selector.lens_direction))
    })
}

fn normalize(record: DeviceRecord) -> CameraDevice {
    CameraDevice {
        supported_aspect_ratios: reduce_aspect_ratios(&record.formats),
        sensor_orientation_degrees: normalize_orientation(record.sensor_orientation),
        id: record.id,
        display_name: record.name,
        lens_direction: record.position,
        has_flash: record.has_flash,
        has_torch: record.has_torch,
        device_kind: record.kind,
    }
}

/// Snap to the nearest quarter turn in `0..360`.
fn normalize_orientation(degrees: i32) -> u16 {
    let wrapped = degrees.rem_euclid(360);
    (((wrapped + 45) / 90 % 4) * 90) as u16
}
