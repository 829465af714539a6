//! Anti-macro policy: keep multi-lens modules from swapping their active
//! constituent lens behind the caller's back.
//!
//! Device selection is the catalog's job (`prefer_physical`); this module
//! owns the switching control and the watch on switching attempts.

use crate::errors::CameraError;
use crate::platform::{with_configuration_lock, CaptureDriver, DriverNotice, SwitchingBehavior, SwitchingConditions};
use crate::types::{CameraDevice, CameraState};

/// What `enable`/`disable` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Applied,
    /// The device has no switching control; nothing to do.
    NotApplicable,
}

/// Restrict switching with no allowed conditions and start watching.
pub fn enable(
    driver: &mut dyn CaptureDriver,
    device: &CameraDevice,
) -> Result<PolicyOutcome, CameraError> {
    if driver.switching_behavior() == SwitchingBehavior::Unsupported {
        log::debug!("Device {} has no switching control, anti-macro is a no-op", device.id);
        return Ok(PolicyOutcome::NotApplicable);
    }

    with_configuration_lock(driver, |d| {
        d.set_switching_behavior(SwitchingBehavior::Restricted(SwitchingConditions::NONE))
    })
    .map_err(|e| policy_error("enable", device, e))?;

    driver.watch_switching(true);
    log::info!("Anti-macro enabled on {} ({:?})", device.id, device.device_kind);
    Ok(PolicyOutcome::Applied)
}

/// Hand switching back to the driver and drop the watch.
pub fn disable(
    driver: &mut dyn CaptureDriver,
    device: &CameraDevice,
) -> Result<PolicyOutcome, CameraError> {
    if driver.switching_behavior() == SwitchingBehavior::Unsupported {
        return Ok(PolicyOutcome::NotApplicable);
    }

    driver.watch_switching(false);
    with_configuration_lock(driver, |d| d.set_switching_behavior(SwitchingBehavior::Auto))
        .map_err(|e| policy_error("disable", device, e))?;

    log::info!("Anti-macro disabled on {}", device.id);
    Ok(PolicyOutcome::Applied)
}

/// Message for a switching attempt, or `None` when the notice must not
/// trip the macro flag (policy off, or a notice for another device).
pub fn detection_message(state: &CameraState, notice: &DriverNotice) -> Option<String> {
    let DriverNotice::ConstituentSwitch { device_id, from, to } = notice else {
        return None;
    };
    if !state.anti_macro_enabled {
        return None;
    }
    let active = state.active_device.as_ref()?;
    if &active.id != device_id {
        return None;
    }
    Some(match from {
        Some(from) => format!(
            "Device {} attempted to switch constituent lens from {} to {}",
            device_id, from, to
        ),
        None => format!("Device {} attempted to switch constituent lens to {}", device_id, to),
    })
}

fn policy_error(action: &str, device: &CameraDevice, cause: CameraError) -> CameraError {
    let message = match cause {
        CameraError::PolicyConfigError(msg) | CameraError::HardwareError(msg) => msg,
        other => other.to_string(),
    };
    CameraError::PolicyConfigError(format!("{} on {}: {}", action, device.id, message))
}
