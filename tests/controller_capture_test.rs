//! Photo capture and movie recording tests
//!
//! Uses manual callback completion on the mock rig to hold hardware round
//! trips open and check what the controller does in the meantime.

mod common;

use common::{back, drain, next_event, running, wait_until};
use crablens::testing::{sample_photo, MockRig};
use crablens::{CameraError, CameraEvent, FlashMode, LensDirection};
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn file_name(path: &std::path::Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_take_picture_writes_jpeg() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    let mut events = controller.subscribe();

    let path = assert_ok!(controller.take_picture().await);
    assert!(path.starts_with(dir.path()));
    assert!(file_name(&path).starts_with("CAP_"));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    assert_eq!(
        next_event(&mut events).await,
        CameraEvent::PictureTaken { path: path.clone() }
    );
    assert!(!controller.state().capturing);
}

#[tokio::test]
async fn test_consecutive_pictures_get_distinct_paths() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let first = assert_ok!(controller.take_picture().await);
    let second = assert_ok!(controller.take_picture().await);
    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
}

#[tokio::test]
async fn test_concurrent_picture_is_busy() {
    let rig = MockRig::phone();
    rig.set_auto_complete(false);
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.take_picture().await }
    });
    wait_until(|| rig.pending_photos() == 1).await;
    assert!(controller.state().capturing);

    let err = assert_err!(controller.take_picture().await);
    assert!(matches!(err, CameraError::Busy(_)));
    assert_eq!(rig.pending_photos(), 1);

    assert!(rig.complete_photo(Ok(Some(sample_photo()))));
    let path = assert_ok!(first.await.unwrap());
    assert!(path.exists());
    assert!(!controller.state().capturing);
}

#[tokio::test]
async fn test_mutations_wait_for_pending_capture() {
    let rig = MockRig::phone();
    rig.set_auto_complete(false);
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let picture = tokio::spawn({
        let controller = controller.clone();
        async move { controller.take_picture().await }
    });
    wait_until(|| rig.pending_photos() == 1).await;

    let zoom = tokio::spawn({
        let controller = controller.clone();
        async move { controller.set_zoom_level(3.0).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rig.zoom_factor(), 1.0);
    assert!(!zoom.is_finished());

    assert!(rig.complete_photo(Ok(Some(sample_photo()))));
    assert_ok!(picture.await.unwrap());
    assert_eq!(assert_ok!(zoom.await.unwrap()), 3.0);
    assert_eq!(rig.zoom_factor(), 3.0);
    assert_eq!(rig.overlapping_calls(), 0);
}

#[tokio::test]
async fn test_capture_failure_clears_capturing() {
    let rig = MockRig::phone();
    rig.set_photo_result(Err(CameraError::HardwareError("sensor fault".into())));
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    let mut events = controller.subscribe();

    let err = assert_err!(controller.take_picture().await);
    assert_eq!(err.code(), "captureError");
    assert!(err.to_string().contains("sensor fault"));

    match next_event(&mut events).await {
        CameraEvent::Error { code, .. } => assert_eq!(code, "captureError"),
        other => panic!("expected Error, got {:?}", other),
    }
    let state = controller.state();
    assert!(!state.capturing);
    assert_eq!(state.last_error.as_ref().unwrap().code, "captureError");
}

#[tokio::test]
async fn test_capture_without_data_is_an_error() {
    let rig = MockRig::phone();
    rig.set_photo_result(Ok(None));
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let err = assert_err!(controller.take_picture().await);
    assert_eq!(err.code(), "captureError");
    assert!(!controller.state().capturing);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_torch_mode_captures_without_flash() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.set_torch_mode(true, 0.5).await);
    assert_ok!(controller.take_picture().await);
    assert_eq!(rig.last_flash(), Some(FlashMode::Off));

    assert_ok!(controller.set_flash_mode(FlashMode::On).await);
    assert_ok!(controller.take_picture().await);
    assert_eq!(rig.last_flash(), Some(FlashMode::On));
}

#[tokio::test]
async fn test_record_start_stop_events_in_order() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    let mut events = controller.subscribe();

    assert_ok!(controller.start_video_recording().await);
    assert!(controller.state().recording);

    let path = assert_ok!(controller.stop_video_recording().await);
    assert!(file_name(&path).starts_with("REC_"));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
    assert!(!controller.state().recording);

    assert_eq!(
        drain(&mut events),
        vec![
            CameraEvent::RecordingStarted,
            CameraEvent::RecordingStopped { path }
        ]
    );
}

#[tokio::test]
async fn test_stop_without_recording() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let err = assert_err!(controller.stop_video_recording().await);
    assert!(matches!(err, CameraError::NotRecording));
    assert!(!rig.calls().contains(&"stop_recording".to_string()));
}

#[tokio::test]
async fn test_second_start_is_busy() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.start_video_recording().await);
    let err = assert_err!(controller.start_video_recording().await);
    assert_eq!(err.code(), "busy");
    assert!(controller.state().recording);
}

#[tokio::test]
async fn test_start_failure_leaves_recording_off() {
    let rig = MockRig::phone();
    rig.set_record_start_result(Err(CameraError::HardwareError("no space left".into())));
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    let mut events = controller.subscribe();

    let err = assert_err!(controller.start_video_recording().await);
    assert_eq!(err.code(), "hardwareError");
    assert!(!controller.state().recording);
    match next_event(&mut events).await {
        CameraEvent::Error { code, .. } => assert_eq!(code, "hardwareError"),
        other => panic!("expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pending_start_blocks_conflicting_commands() {
    let rig = MockRig::phone();
    rig.set_auto_complete(false);
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    let start = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start_video_recording().await }
    });
    wait_until(|| rig.pending_recording_starts() == 1).await;

    let err = assert_err!(controller.start_video_recording().await);
    assert_eq!(err.code(), "busy");
    let err = assert_err!(controller.switch_camera().await);
    assert_eq!(err.code(), "busy");
    assert_eq!(rig.bound_device().as_deref(), Some("back-wide"));

    assert!(rig.complete_recording_start(Ok(())));
    assert_ok!(start.await.unwrap());
    assert!(controller.state().recording);

    let stop = tokio::spawn({
        let controller = controller.clone();
        async move { controller.stop_video_recording().await }
    });
    wait_until(|| rig.pending_recording_stops() == 1).await;
    assert!(rig.complete_recording_stop(Ok(())));
    assert_ok!(stop.await.unwrap());
    assert!(!controller.state().recording);
    assert_eq!(rig.overlapping_calls(), 0);
}

#[tokio::test]
async fn test_stop_failure_still_clears_recording() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    assert_ok!(controller.start_video_recording().await);

    rig.set_auto_complete(false);
    let stop = tokio::spawn({
        let controller = controller.clone();
        async move { controller.stop_video_recording().await }
    });
    wait_until(|| rig.pending_recording_stops() == 1).await;
    assert!(rig.complete_recording_stop(Err(CameraError::HardwareError(
        "finalize failed".into()
    ))));

    let err = assert_err!(stop.await.unwrap());
    assert_eq!(err.code(), "hardwareError");
    assert!(!controller.state().recording);
}

#[tokio::test]
async fn test_interrupted_recording_reports_and_clears() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    assert_ok!(controller.start_video_recording().await);
    let mut events = controller.subscribe();

    rig.interrupt_recording(CameraError::HardwareError("disk full".into()));
    match next_event(&mut events).await {
        CameraEvent::Error { code, message } => {
            assert_eq!(code, "hardwareError");
            assert!(message.contains("disk full"));
        }
        other => panic!("expected Error, got {:?}", other),
    }
    assert!(!controller.state().recording);

    let err = assert_err!(controller.stop_video_recording().await);
    assert!(matches!(err, CameraError::NotRecording));
    assert_ok!(controller.start_video_recording().await);
}

#[tokio::test]
async fn test_recording_dying_as_it_starts_never_sticks() {
    let rig = MockRig::phone();
    rig.set_auto_complete(false);
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    let mut events = controller.subscribe();

    let start = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start_video_recording().await }
    });
    wait_until(|| rig.pending_recording_starts() == 1).await;

    assert!(rig.complete_recording_start(Ok(())));
    rig.interrupt_recording(CameraError::HardwareError("encoder died".into()));
    let _ = start.await.unwrap();

    loop {
        match next_event(&mut events).await {
            CameraEvent::Error { message, .. } => {
                assert!(message.contains("encoder died"));
                break;
            }
            CameraEvent::RecordingStarted => {}
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(!controller.state().recording);

    rig.set_auto_complete(true);
    assert_eq!(
        assert_ok!(controller.switch_camera().await),
        LensDirection::Front
    );
    let err = assert_err!(controller.stop_video_recording().await);
    assert!(matches!(err, CameraError::NotRecording));
}

#[tokio::test]
async fn test_interruption_before_start_confirmation_fails_the_start() {
    let rig = MockRig::phone();
    rig.set_auto_complete(false);
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;
    let mut events = controller.subscribe();

    let start = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start_video_recording().await }
    });
    wait_until(|| rig.pending_recording_starts() == 1).await;

    rig.interrupt_recording(CameraError::HardwareError("no frames".into()));
    assert!(rig.complete_recording_start(Ok(())));

    let err = assert_err!(start.await.unwrap());
    assert_eq!(err.code(), "hardwareError");
    match next_event(&mut events).await {
        CameraEvent::Error { message, .. } => assert!(message.contains("no frames")),
        other => panic!("expected Error, got {:?}", other),
    }
    assert!(!controller.state().recording);
}

#[tokio::test]
async fn test_picture_allowed_while_recording() {
    let rig = MockRig::phone();
    let dir = TempDir::new().unwrap();
    let controller = running(&rig, &dir, back(true)).await;

    assert_ok!(controller.start_video_recording().await);
    let path = assert_ok!(controller.take_picture().await);
    assert!(path.exists());
    assert!(controller.state().recording);
}
