use super::{controller, CommandError};
use crate::permissions::PermissionStatus;
use crate::types::{
    CameraDevice, CameraState, DeviceSelector, ExposureRange, FlashMode, InitializeParams,
    LensDirection, ResolutionPreset, ZoomRange,
};
use std::path::PathBuf;
use tauri::command;

/// List cameras with a fresh enumeration
#[command]
pub async fn enumerate_devices() -> Result<Vec<CameraDevice>, CommandError> {
    let devices = controller().await.enumerate_devices()?;
    log::info!("Found {} cameras", devices.len());
    for device in &devices {
        log::debug!(
            "Camera: {} - {} ({}, {:?})",
            device.id,
            device.display_name,
            device.lens_direction,
            device.device_kind
        );
    }
    Ok(devices)
}

#[command]
pub async fn check_camera_permission() -> Result<PermissionStatus, CommandError> {
    Ok(controller().await.authorization())
}

/// Bring up the capture session. Omitted options fall back to the
/// configured session defaults.
#[command]
pub async fn initialize(
    lens_direction: LensDirection,
    device_id: Option<String>,
    resolution_preset: Option<ResolutionPreset>,
    enable_anti_macro: Option<bool>,
    enable_audio: Option<bool>,
    auto_flash: Option<bool>,
) -> Result<(), CommandError> {
    let defaults = super::config::current_config().await.session;
    let params = InitializeParams::new(DeviceSelector {
        device_id,
        lens_direction,
    })
    .with_preset(resolution_preset.unwrap_or(defaults.default_preset))
    .with_anti_macro(enable_anti_macro.unwrap_or(defaults.anti_macro))
    .with_audio(enable_audio.unwrap_or(defaults.enable_audio))
    .with_auto_flash(auto_flash.unwrap_or(defaults.auto_flash));

    log::info!("Initializing camera: {:?}", params);
    controller().await.initialize(params).await.map_err(|e| {
        log::error!("Failed to initialize camera: {}", e);
        CommandError::from(e)
    })
}

#[command]
pub async fn dispose() -> Result<(), CommandError> {
    Ok(super::retire_controller().await?)
}

#[command]
pub async fn get_camera_state() -> Result<CameraState, CommandError> {
    Ok((*controller().await.state()).clone())
}

#[command]
pub async fn set_anti_macro_enabled(enabled: bool) -> Result<(), CommandError> {
    Ok(controller().await.set_anti_macro_enabled(enabled).await?)
}

#[command]
pub async fn set_flash_mode(mode: FlashMode) -> Result<(), CommandError> {
    Ok(controller().await.set_flash_mode(mode).await?)
}

/// `level` defaults to full brightness
#[command]
pub async fn set_torch_mode(enabled: bool, level: Option<f64>) -> Result<(), CommandError> {
    Ok(controller()
        .await
        .set_torch_mode(enabled, level.unwrap_or(1.0))
        .await?)
}

#[command]
pub async fn set_zoom_level(level: f64) -> Result<f64, CommandError> {
    Ok(controller().await.set_zoom_level(level).await?)
}

#[command]
pub async fn get_zoom_range() -> Result<ZoomRange, CommandError> {
    Ok(controller().await.get_zoom_range()?)
}

#[command]
pub async fn get_exposure_offset_range() -> Result<ExposureRange, CommandError> {
    Ok(controller().await.get_exposure_offset_range()?)
}

#[command]
pub async fn set_focus_point(x: f64, y: f64) -> Result<(), CommandError> {
    Ok(controller().await.set_focus_point(x, y).await?)
}

#[command]
pub async fn set_exposure_point(x: f64, y: f64) -> Result<(), CommandError> {
    Ok(controller().await.set_exposure_point(x, y).await?)
}

#[command]
pub async fn set_exposure_compensation(ev: f64) -> Result<f64, CommandError> {
    Ok(controller().await.set_exposure_compensation(ev).await?)
}

#[command]
pub async fn switch_camera() -> Result<LensDirection, CommandError> {
    let direction = controller().await.switch_camera().await?;
    log::info!("Switched to {} camera", direction);
    Ok(direction)
}

#[command]
pub async fn switch_to_camera(device_id: String) -> Result<LensDirection, CommandError> {
    Ok(controller().await.switch_to_camera(&device_id).await?)
}

#[command]
pub async fn take_picture() -> Result<PathBuf, CommandError> {
    controller().await.take_picture().await.map_err(|e| {
        log::error!("Failed to take picture: {}", e);
        CommandError::from(e)
    })
}

#[command]
pub async fn start_video_recording() -> Result<(), CommandError> {
    Ok(controller().await.start_video_recording().await?)
}

#[command]
pub async fn stop_video_recording() -> Result<PathBuf, CommandError> {
    Ok(controller().await.stop_video_recording().await?)
}
