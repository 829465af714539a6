#![allow(dead_code)]

use crablens::testing::MockRig;
use crablens::{
    CameraController, CameraEvent, CrabLensConfig, DeviceSelector, EventStream, InitializeParams,
    LensDirection,
};
use std::time::Duration;
use tempfile::TempDir;

pub fn config_in(dir: &TempDir) -> CrabLensConfig {
    let mut config = CrabLensConfig::default();
    config.storage.output_directory = dir.path().to_string_lossy().into_owned();
    config
}

pub fn back(anti_macro: bool) -> InitializeParams {
    InitializeParams::new(DeviceSelector::direction(LensDirection::Back)).with_anti_macro(anti_macro)
}

pub fn front() -> InitializeParams {
    InitializeParams::new(DeviceSelector::direction(LensDirection::Front))
}

pub fn device(id: &str, direction: LensDirection, anti_macro: bool) -> InitializeParams {
    InitializeParams::new(DeviceSelector::id(id, direction)).with_anti_macro(anti_macro)
}

/// Controller over `rig`, already initialized with `params`.
pub async fn running(rig: &MockRig, dir: &TempDir, params: InitializeParams) -> CameraController {
    let controller = rig.controller(config_in(dir));
    controller
        .initialize(params)
        .await
        .expect("initialize should succeed");
    controller
}

/// Poll `condition` until it holds, failing after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

pub async fn next_event(events: &mut EventStream) -> CameraEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Everything already delivered, without waiting.
pub fn drain(events: &mut EventStream) -> Vec<CameraEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
