//! Native backend over nokhwa.
//!
//! Desktop cameras expose no zoom, exposure bias, torch or lens-switching
//! controls through nokhwa, so those report as unsupported. Photos are
//! grabbed from the running stream; movies need the `recording` feature.

use super::{
    resolved, CaptureDriver, DeviceDiscovery, DeviceRecord, NoticeSink, Pending, PhotoData,
    SwitchingBehavior,
};
use crate::errors::CameraError;
use crate::permissions::PermissionStatus;
use crate::types::{DeviceKind, ExposureRange, FlashMode, LensDirection, ResolutionPreset, ZoomRange};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    CallbackCamera,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Formats advertised for every webcam; nokhwa negotiates the real one.
const COMMON_FORMATS: &[(u32, u32)] = &[(1920, 1080), (1280, 720), (640, 480)];

/// Build the discovery/driver pair for the system cameras.
pub fn backend() -> (Arc<dyn DeviceDiscovery>, Box<dyn CaptureDriver>) {
    (Arc::new(NativeDiscovery), Box::new(NativeDriver::new()))
}

pub struct NativeDiscovery;

impl DeviceDiscovery for NativeDiscovery {
    fn discover(&self) -> Result<Vec<DeviceRecord>, CameraError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| CameraError::HardwareUnavailable(format!("Failed to query cameras: {}", e)))?;

        Ok(cameras
            .into_iter()
            .enumerate()
            .map(|(position, info)| {
                let hardware_index = info.index().as_index().unwrap_or(position as u32);
                DeviceRecord {
                    id: info.index().to_string(),
                    name: info.human_name(),
                    hardware_index,
                    // Desktop webcams face the user
                    position: LensDirection::Front,
                    sensor_orientation: 0,
                    has_flash: false,
                    has_torch: false,
                    kind: DeviceKind::WideAngle,
                    formats: COMMON_FORMATS.to_vec(),
                }
            })
            .collect())
    }

    fn authorization(&self) -> PermissionStatus {
        match query(ApiBackend::Auto) {
            Ok(_) => PermissionStatus::Granted,
            Err(e) => {
                log::warn!("Camera query refused: {}", e);
                PermissionStatus::Denied
            }
        }
    }
}

/// Shared handle to the open camera.
#[derive(Clone)]
struct SharedCamera(Arc<Mutex<CallbackCamera>>);

// CallbackCamera wraps platform handles that nokhwa does not mark Send; all
// access goes through the mutex.
unsafe impl Send for SharedCamera {}
unsafe impl Sync for SharedCamera {}

impl SharedCamera {
    fn with<T>(&self, f: impl FnOnce(&mut CallbackCamera) -> Result<T, CameraError>) -> Result<T, CameraError> {
        let mut camera = self
            .0
            .lock()
            .map_err(|_| CameraError::HardwareError("Failed to lock camera".to_string()))?;
        f(&mut camera)
    }

    /// Grab one frame and decode it to packed RGB.
    fn grab_rgb(&self) -> Result<(u32, u32, Vec<u8>), CameraError> {
        self.with(|camera| {
            let frame = camera
                .poll_frame()
                .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;
            let decoded = frame
                .decode_image::<RgbFormat>()
                .map_err(|e| CameraError::CaptureError(format!("Failed to decode frame: {}", e)))?;
            Ok((decoded.width(), decoded.height(), decoded.into_raw()))
        })
    }
}

pub struct NativeDriver {
    camera: Option<SharedCamera>,
    preset: ResolutionPreset,
    running: bool,
    config_locked: bool,
    notices: Option<NoticeSink>,
    #[cfg(feature = "recording")]
    movie: Option<movie::MovieSession>,
}

impl NativeDriver {
    pub fn new() -> Self {
        Self {
            camera: None,
            preset: ResolutionPreset::default(),
            running: false,
            config_locked: false,
            notices: None,
            #[cfg(feature = "recording")]
            movie: None,
        }
    }

    fn camera(&self) -> Result<&SharedCamera, CameraError> {
        self.camera
            .as_ref()
            .ok_or_else(|| CameraError::NotReady("no camera input is bound".to_string()))
    }

    fn requested_format(&self) -> RequestedFormat<'static> {
        let kind = match self.preset.resolution() {
            Some((width, height)) => RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                30,
            )),
            None => RequestedFormatType::AbsoluteHighestResolution,
        };
        RequestedFormat::new::<RgbFormat>(kind)
    }

    #[cfg(feature = "recording")]
    fn abandon_movie(&mut self) {
        if let Some(session) = self.movie.take() {
            if let Err(e) = session.finish() {
                log::warn!("Abandoned movie could not be finalized: {}", e);
            }
        }
    }

    #[cfg(not(feature = "recording"))]
    fn abandon_movie(&mut self) {}

    fn unsupported(control: &str) -> CameraError {
        CameraError::HardwareError(format!("{} is not supported by this camera", control))
    }
}

impl CaptureDriver for NativeDriver {
    fn set_notice_sink(&mut self, sink: NoticeSink) {
        self.notices = Some(sink);
    }

    fn create_session(&mut self, preset: ResolutionPreset) -> Result<(), CameraError> {
        self.preset = preset;
        Ok(())
    }

    fn begin_configuration(&mut self) {
        log::trace!("begin configuration");
    }

    fn commit_configuration(&mut self) {
        log::trace!("commit configuration");
    }

    fn bind_input(&mut self, device_id: &str) -> Result<(), CameraError> {
        let index = match device_id.parse::<u32>() {
            Ok(n) => CameraIndex::Index(n),
            Err(_) => CameraIndex::String(device_id.to_string()),
        };
        let camera = CallbackCamera::new(index, self.requested_format(), |_| {}).map_err(|e| {
            CameraError::HardwareError(format!("Failed to open camera {}: {}", device_id, e))
        })?;
        let camera = SharedCamera(Arc::new(Mutex::new(camera)));
        if self.running {
            camera.with(|c| {
                c.open_stream()
                    .map_err(|e| CameraError::HardwareError(format!("Failed to start stream: {}", e)))
            })?;
        }
        self.camera = Some(camera);
        Ok(())
    }

    fn unbind_input(&mut self) {
        if let Some(camera) = self.camera.take() {
            if let Err(e) = camera.with(|c| {
                c.stop_stream()
                    .map_err(|e| CameraError::HardwareError(e.to_string()))
            }) {
                log::debug!("Stream stop on unbind failed: {}", e);
            }
        }
    }

    fn attach_outputs(&mut self, audio: bool) -> Result<(), CameraError> {
        if audio {
            log::warn!("Audio capture is not available on the native backend");
        }
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        self.camera()?.with(|c| {
            c.open_stream()
                .map_err(|e| CameraError::HardwareError(format!("Failed to start stream: {}", e)))
        })?;
        self.running = true;
        Ok(())
    }

    fn stop_running(&mut self) -> Result<(), CameraError> {
        self.running = false;
        self.camera()?.with(|c| {
            c.stop_stream()
                .map_err(|e| CameraError::HardwareError(format!("Failed to stop stream: {}", e)))
        })
    }

    fn release_session(&mut self) {
        self.abandon_movie();
        self.unbind_input();
        self.running = false;
    }

    fn lock_for_configuration(&mut self) -> Result<(), CameraError> {
        self.camera()?;
        if self.config_locked {
            return Err(CameraError::HardwareError(
                "configuration lock is already held".to_string(),
            ));
        }
        self.config_locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        self.config_locked = false;
    }

    fn zoom_report(&self) -> Option<ZoomRange> {
        None
    }

    fn set_zoom_factor(&mut self, factor: f64) -> Result<(), CameraError> {
        // Only the fixed 1x range is ever published for these cameras
        if factor == 1.0 {
            Ok(())
        } else {
            Err(Self::unsupported("Zoom"))
        }
    }

    fn exposure_bias_report(&self) -> Option<ExposureRange> {
        None
    }

    fn set_exposure_bias(&mut self, ev: f64) -> Result<(), CameraError> {
        if ev == 0.0 {
            Ok(())
        } else {
            Err(Self::unsupported("Exposure bias"))
        }
    }

    fn set_focus_point(&mut self, _x: f64, _y: f64) -> Result<(), CameraError> {
        Err(Self::unsupported("Focus point"))
    }

    fn set_exposure_point(&mut self, _x: f64, _y: f64) -> Result<(), CameraError> {
        Err(Self::unsupported("Exposure point"))
    }

    fn set_torch(&mut self, level: Option<f64>) -> Result<(), CameraError> {
        match level {
            None => Ok(()),
            Some(_) => Err(Self::unsupported("Torch")),
        }
    }

    fn switching_behavior(&self) -> SwitchingBehavior {
        SwitchingBehavior::Unsupported
    }

    fn set_switching_behavior(&mut self, _behavior: SwitchingBehavior) -> Result<(), CameraError> {
        Err(Self::unsupported("Lens switching control"))
    }

    fn watch_switching(&mut self, _enabled: bool) {}

    fn capture_photo(&mut self, flash: FlashMode) -> Pending<Option<PhotoData>> {
        let camera = match self.camera() {
            Ok(camera) => camera.clone(),
            Err(e) => return resolved(Err(e)),
        };
        if flash != FlashMode::Off {
            log::debug!("Flash mode {:?} ignored, camera has no flash", flash);
        }

        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let result = camera
                .grab_rgb()
                .map(|(width, height, data)| Some(PhotoData::Rgb { width, height, data }));
            let _ = tx.send(result);
        });
        rx
    }

    #[cfg(feature = "recording")]
    fn start_recording(&mut self, path: &Path) -> Pending<()> {
        match &self.movie {
            // A pump that failed to start or was interrupted leaves a
            // finished worker behind
            Some(session) if session.is_done() => self.abandon_movie(),
            Some(_) => return resolved(Err(CameraError::AlreadyRecording)),
            None => {}
        }
        let camera = match self.camera() {
            Ok(camera) => camera.clone(),
            Err(e) => return resolved(Err(e)),
        };
        let (session, started) = movie::MovieSession::start(camera, path.to_path_buf(), self.notices.clone());
        self.movie = Some(session);
        started
    }

    #[cfg(not(feature = "recording"))]
    fn start_recording(&mut self, path: &Path) -> Pending<()> {
        log::warn!("Cannot record {}: built without movie support", path.display());
        resolved(Err(CameraError::HardwareError(
            "movie recording requires the `recording` feature".to_string(),
        )))
    }

    #[cfg(feature = "recording")]
    fn stop_recording(&mut self) -> Pending<PathBuf> {
        let Some(session) = self.movie.take() else {
            return resolved(Err(CameraError::NotRecording));
        };
        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(session.finish());
        });
        rx
    }

    #[cfg(not(feature = "recording"))]
    fn stop_recording(&mut self) -> Pending<PathBuf> {
        resolved(Err(CameraError::NotRecording))
    }
}

impl Default for NativeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeDriver {
    fn drop(&mut self) {
        self.release_session();
    }
}

impl std::fmt::Debug for NativeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDriver")
            .field("bound", &self.camera.is_some())
            .field("preset", &self.preset)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(feature = "recording")]
mod movie {
    use super::SharedCamera;
    use crate::errors::CameraError;
    use crate::platform::{DriverNotice, NoticeSink, Pending};
    use crate::recording::MovieWriter;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use tokio::sync::oneshot;

    const MOVIE_FPS: f64 = 30.0;

    /// Frame pump feeding a movie writer from the live stream.
    pub(super) struct MovieSession {
        stop: Arc<AtomicBool>,
        worker: JoinHandle<Result<PathBuf, CameraError>>,
    }

    impl MovieSession {
        pub(super) fn start(
            camera: SharedCamera,
            path: PathBuf,
            notices: Option<NoticeSink>,
        ) -> (Self, Pending<()>) {
            let stop = Arc::new(AtomicBool::new(false));
            let (started_tx, started_rx) = oneshot::channel();
            let flag = stop.clone();

            let worker = std::thread::spawn(move || {
                let mut writer = match open_writer(&camera, &path) {
                    Ok(writer) => {
                        let _ = started_tx.send(Ok(()));
                        writer
                    }
                    Err(e) => {
                        let _ = started_tx.send(Err(e.clone()));
                        return Err(e);
                    }
                };

                while !flag.load(Ordering::Acquire) {
                    let frame = camera.grab_rgb().and_then(|(width, height, data)| {
                        if (width, height) != writer.dimensions() {
                            return Err(CameraError::HardwareError(format!(
                                "Stream changed size to {}x{} mid-recording",
                                width, height
                            )));
                        }
                        writer.write_rgb(&data)
                    });
                    if let Err(error) = frame {
                        log::error!("Recording interrupted: {}", error);
                        if let Some(sink) = &notices {
                            let _ = sink.send(DriverNotice::RecordingInterrupted { error: error.clone() });
                        }
                        let _ = writer.finish();
                        return Err(error);
                    }
                }

                writer.finish().map(|stats| stats.path)
            });

            (Self { stop, worker }, started_rx)
        }

        pub(super) fn is_done(&self) -> bool {
            self.worker.is_finished()
        }

        /// Signal the pump and wait for the file to be closed.
        pub(super) fn finish(self) -> Result<PathBuf, CameraError> {
            self.stop.store(true, Ordering::Release);
            self.worker
                .join()
                .map_err(|_| CameraError::HardwareError("Recording thread panicked".to_string()))?
        }
    }

    fn open_writer(camera: &SharedCamera, path: &Path) -> Result<MovieWriter, CameraError> {
        let (width, height, data) = camera.grab_rgb()?;
        let mut writer = MovieWriter::create(path, width, height, MOVIE_FPS)?;
        writer.write_rgb(&data)?;
        Ok(writer)
    }
}
