//! Zoom, exposure, focus, flash and torch controls

mod common;

use common::{back, config_in, device, front, running};
use crablens::testing::{MockDevice, MockRig};
use crablens::{DeviceKind, ExposureRange, FlashMode, LensDirection, ZoomRange};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_zoom_is_clamped_to_device_range() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, device("back-triple", LensDirection::Back, false)).await;

    assert_eq!(assert_ok!(controller.set_zoom_level(20.0).await), 10.0);
    assert_eq!(rig.zoom_factor(), 10.0);
    assert_eq!(assert_ok!(controller.get_zoom_range()).current, 10.0);

    assert_eq!(assert_ok!(controller.set_zoom_level(0.1).await), 0.5);
    assert_eq!(
        assert_ok!(controller.get_zoom_range()),
        ZoomRange { min: 0.5, max: 10.0, current: 0.5 }
    );

    assert_eq!(assert_ok!(controller.set_zoom_level(2.5).await), 2.5);
    assert!(!rig.is_config_locked());
}

#[tokio::test]
async fn test_zoom_rejects_non_finite_values() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let err = assert_err!(controller.set_zoom_level(f64::NAN).await);
    assert_eq!(err.code(), "invalidArgument");
    let err = assert_err!(controller.set_zoom_level(f64::INFINITY).await);
    assert_eq!(err.code(), "invalidArgument");
    assert_eq!(controller.state().zoom.current, 1.0);
}

#[tokio::test]
async fn test_zoom_without_report_uses_unit_range() {
    let rig = MockRig::new().with_device(
        MockDevice::new("webcam", DeviceKind::WideAngle, LensDirection::Front).with_zoom(None),
    );
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, front()).await;

    assert_eq!(assert_ok!(controller.get_zoom_range()), ZoomRange::FALLBACK);
    assert_eq!(assert_ok!(controller.set_zoom_level(3.0).await), 1.0);
}

#[tokio::test]
async fn test_inverted_zoom_report_falls_back() {
    let rig = MockRig::new().with_device(
        MockDevice::new("odd", DeviceKind::WideAngle, LensDirection::Back).with_zoom(Some(
            ZoomRange {
                min: 4.0,
                max: 2.0,
                current: 3.0,
            },
        )),
    );
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(false)).await;

    assert_eq!(controller.state().zoom, ZoomRange::FALLBACK);
}

#[tokio::test]
async fn test_zoom_lock_failure_leaves_state() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    rig.fail_lock(true);
    let err = assert_err!(controller.set_zoom_level(2.0).await);
    assert_eq!(err.code(), "hardwareError");
    assert_eq!(controller.state().zoom.current, 1.0);
    assert_eq!(rig.zoom_factor(), 1.0);
}

#[tokio::test]
async fn test_exposure_compensation_is_clamped() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_eq!(
        assert_ok!(controller.get_exposure_offset_range()),
        ExposureRange { min: -2.0, max: 2.0 }
    );
    assert_eq!(assert_ok!(controller.set_exposure_compensation(5.0).await), 2.0);
    assert_eq!(rig.exposure_bias(), 2.0);
    assert_eq!(controller.state().exposure_offset, 2.0);

    assert_eq!(assert_ok!(controller.set_exposure_compensation(-0.5).await), -0.5);
    let err = assert_err!(controller.set_exposure_compensation(f64::NAN).await);
    assert_eq!(err.code(), "invalidArgument");
}

#[tokio::test]
async fn test_focus_and_exposure_points() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.set_focus_point(0.5, 0.25).await);
    assert_eq!(rig.focus_point(), Some((0.5, 0.25)));
    assert_ok!(controller.set_exposure_point(0.0, 1.0).await);
    assert_eq!(rig.exposure_point(), Some((0.0, 1.0)));

    let err = assert_err!(controller.set_focus_point(1.5, 0.0).await);
    assert_eq!(err.code(), "invalidArgument");
    let err = assert_err!(controller.set_exposure_point(0.5, -0.1).await);
    assert_eq!(err.code(), "invalidArgument");
    assert_eq!(rig.focus_point(), Some((0.5, 0.25)));
}

#[tokio::test]
async fn test_torch_level_is_clamped() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.set_torch_mode(true, 0.0).await);
    assert_eq!(rig.torch(), Some(0.01));
    let state = controller.state();
    assert!(state.torch_on);
    assert_eq!(state.torch_level, 0.01);
    assert_eq!(state.flash_mode, FlashMode::Torch);

    assert_ok!(controller.set_torch_mode(true, 3.0).await);
    assert_eq!(rig.torch(), Some(1.0));

    assert_ok!(controller.set_torch_mode(false, 1.0).await);
    assert_eq!(rig.torch(), None);
    let state = controller.state();
    assert!(!state.torch_on);
    assert_eq!(state.flash_mode, FlashMode::Off);

    let err = assert_err!(controller.set_torch_mode(true, f64::NAN).await);
    assert_eq!(err.code(), "invalidArgument");
}

#[tokio::test]
async fn test_out_of_range_torch_floor_falls_back() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.torch.min_level = 5.0;
    let controller = rig.controller(config);
    assert_ok!(controller.initialize(back(true)).await);

    assert_ok!(controller.set_torch_mode(true, 0.0).await);
    assert_eq!(rig.torch(), Some(0.01));
    assert_ok!(controller.set_torch_mode(true, 0.5).await);
    assert_eq!(controller.state().torch_level, 0.5);
}

#[tokio::test]
async fn test_torch_without_hardware() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, front()).await;

    let err = assert_err!(controller.set_torch_mode(true, 1.0).await);
    assert_eq!(err.code(), "hardwareError");
    assert_ok!(controller.set_torch_mode(false, 1.0).await);
    assert!(!controller.state().torch_on);
}

#[tokio::test]
async fn test_flash_mode_rules() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.set_flash_mode(FlashMode::Auto).await);
    assert_eq!(controller.state().flash_mode, FlashMode::Auto);

    let err = assert_err!(controller.set_flash_mode(FlashMode::Torch).await);
    assert_eq!(err.code(), "invalidArgument");

    assert_ok!(controller.set_torch_mode(true, 0.5).await);
    assert_ok!(controller.set_flash_mode(FlashMode::On).await);
    assert_eq!(rig.torch(), None);
    let state = controller.state();
    assert!(!state.torch_on);
    assert_eq!(state.flash_mode, FlashMode::On);
}

#[tokio::test]
async fn test_flash_on_device_without_flash() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, front()).await;

    let err = assert_err!(controller.set_flash_mode(FlashMode::On).await);
    assert_eq!(err.code(), "hardwareError");
    assert_ok!(controller.set_flash_mode(FlashMode::Off).await);
}

#[tokio::test]
async fn test_dispose_turns_torch_off() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.set_torch_mode(true, 0.8).await);
    assert_ok!(controller.dispose().await);
    assert_eq!(rig.torch(), None);
    assert!(rig.calls().contains(&"set_torch(None)".to_string()));
}

#[tokio::test]
async fn test_concurrent_requests_are_serialized() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, device("back-triple", LensDirection::Back, false)).await;

    let requests = (1..=8).map(|i| {
        let controller = controller.clone();
        async move { controller.set_zoom_level(i as f64).await }
    });
    let applied: Vec<f64> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(applied, (1..=8).map(|i| i as f64).collect::<Vec<_>>());
    assert_eq!(controller.state().zoom.current, 8.0);
    assert_eq!(rig.zoom_factor(), 8.0);
    assert!(!rig.is_config_locked());
}
