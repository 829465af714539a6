//! Scriptable in-memory camera hardware.
//!
//! A [`MockRig`] hands out a discovery view and a capture driver that share
//! one simulated device table. Tests script failures, resolve photo and
//! recording callbacks by hand, inject driver notices, and inspect what the
//! controller did to the hardware.

use crate::config::CrabLensConfig;
use crate::errors::CameraError;
use crate::permissions::PermissionStatus;
use crate::platform::{
    resolved, CaptureDriver, DeviceDiscovery, DeviceRecord, DriverNotice, NoticeSink, Pending,
    PhotoData, SwitchingBehavior,
};
use crate::session::CameraController;
use crate::types::{DeviceKind, ExposureRange, FlashMode, LensDirection, ResolutionPreset, ZoomRange};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// One simulated device.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub record: DeviceRecord,
    pub zoom: Option<ZoomRange>,
    pub exposure: Option<ExposureRange>,
    pub switching: SwitchingBehavior,
}

impl MockDevice {
    pub fn new(id: &str, kind: DeviceKind, position: LensDirection) -> Self {
        Self {
            record: DeviceRecord {
                id: id.to_string(),
                name: id.to_string(),
                hardware_index: 0,
                position,
                sensor_orientation: 90,
                has_flash: false,
                has_torch: false,
                kind,
                formats: vec![(4032, 3024), (1920, 1080)],
            },
            zoom: Some(ZoomRange {
                min: 1.0,
                max: 4.0,
                current: 1.0,
            }),
            exposure: Some(ExposureRange { min: -2.0, max: 2.0 }),
            switching: if kind.is_virtual() {
                SwitchingBehavior::Auto
            } else {
                SwitchingBehavior::Unsupported
            },
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.record.name = name.to_string();
        self
    }

    pub fn index(mut self, hardware_index: u32) -> Self {
        self.record.hardware_index = hardware_index;
        self
    }

    pub fn with_flash(mut self) -> Self {
        self.record.has_flash = true;
        self.record.has_torch = true;
        self
    }

    pub fn with_zoom(mut self, zoom: Option<ZoomRange>) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_exposure(mut self, exposure: Option<ExposureRange>) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_formats(mut self, formats: Vec<(u32, u32)>) -> Self {
        self.record.formats = formats;
        self
    }

    pub fn with_switching(mut self, switching: SwitchingBehavior) -> Self {
        self.switching = switching;
        self
    }
}

struct RigState {
    devices: Vec<MockDevice>,
    permission: PermissionStatus,
    discovery_error: Option<CameraError>,
    failing_binds: HashSet<String>,
    fail_start_running: bool,
    fail_lock: bool,
    fail_switching_config: bool,
    auto_complete: bool,
    photo_result: Result<Option<PhotoData>, CameraError>,
    record_start_result: Result<(), CameraError>,

    sink: Option<NoticeSink>,
    session: bool,
    running: bool,
    bound: Option<String>,
    locked: bool,
    switching: HashMap<String, SwitchingBehavior>,
    watching: bool,
    torch: Option<f64>,
    zoom_factor: f64,
    exposure_bias: f64,
    focus_point: Option<(f64, f64)>,
    exposure_point: Option<(f64, f64)>,
    last_flash: Option<FlashMode>,
    recording_to: Option<PathBuf>,

    photos: VecDeque<oneshot::Sender<Result<Option<PhotoData>, CameraError>>>,
    starts: VecDeque<(PathBuf, oneshot::Sender<Result<(), CameraError>>)>,
    stops: VecDeque<(PathBuf, oneshot::Sender<Result<PathBuf, CameraError>>)>,

    calls: Vec<String>,
    overlapping: usize,
    releases: usize,
}

impl RigState {
    fn pending_callbacks(&self) -> usize {
        self.photos.len() + self.starts.len() + self.stops.len()
    }

    /// Log a hardware-mutating call and note whether a callback was still
    /// outstanding.
    fn record(&mut self, call: impl Into<String>) {
        if self.pending_callbacks() > 0 {
            self.overlapping += 1;
        }
        self.calls.push(call.into());
    }

    fn bound_device(&self) -> Option<&MockDevice> {
        let id = self.bound.as_ref()?;
        self.devices.iter().find(|d| &d.record.id == id)
    }

    fn require_lock(&self, what: &str) -> Result<(), CameraError> {
        if self.locked {
            Ok(())
        } else {
            Err(CameraError::HardwareError(format!(
                "{} without the configuration lock",
                what
            )))
        }
    }
}

/// Shared simulated hardware.
#[derive(Clone)]
pub struct MockRig {
    state: Arc<Mutex<RigState>>,
}

impl MockRig {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RigState {
                devices: Vec::new(),
                permission: PermissionStatus::Granted,
                discovery_error: None,
                failing_binds: HashSet::new(),
                fail_start_running: false,
                fail_lock: false,
                fail_switching_config: false,
                auto_complete: true,
                photo_result: Ok(Some(sample_photo())),
                record_start_result: Ok(()),
                sink: None,
                session: false,
                running: false,
                bound: None,
                locked: false,
                switching: HashMap::new(),
                watching: false,
                torch: None,
                zoom_factor: 1.0,
                exposure_bias: 0.0,
                focus_point: None,
                exposure_point: None,
                last_flash: None,
                recording_to: None,
                photos: VecDeque::new(),
                starts: VecDeque::new(),
                stops: VecDeque::new(),
                calls: Vec::new(),
                overlapping: 0,
                releases: 0,
            })),
        }
    }

    /// A phone-like rig: back triple module, back wide (flash + torch), back
    /// ultra-wide, front true-depth.
    pub fn phone() -> Self {
        Self::new()
            .with_device(
                MockDevice::new("back-triple", DeviceKind::VirtualTriple, LensDirection::Back)
                    .named("Back Triple Camera")
                    .index(0)
                    .with_flash()
                    .with_zoom(Some(ZoomRange {
                        min: 0.5,
                        max: 10.0,
                        current: 1.0,
                    })),
            )
            .with_device(
                MockDevice::new("back-ultra", DeviceKind::UltraWide, LensDirection::Back)
                    .named("Back Ultra Wide Camera")
                    .index(1),
            )
            .with_device(
                MockDevice::new("back-wide", DeviceKind::WideAngle, LensDirection::Back)
                    .named("Back Camera")
                    .index(2)
                    .with_flash(),
            )
            .with_device(
                MockDevice::new("front", DeviceKind::TrueDepth, LensDirection::Front)
                    .named("Front Camera")
                    .index(3)
                    .with_zoom(Some(ZoomRange {
                        min: 1.0,
                        max: 2.0,
                        current: 1.0,
                    })),
            )
    }

    pub fn with_device(self, device: MockDevice) -> Self {
        {
            let mut state = self.lock();
            state
                .switching
                .insert(device.record.id.clone(), device.switching);
            state.devices.push(device);
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, RigState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn discovery(&self) -> Arc<dyn DeviceDiscovery> {
        Arc::new(MockDiscovery { rig: self.clone() })
    }

    pub fn driver(&self) -> Box<dyn CaptureDriver> {
        Box::new(MockDriver { rig: self.clone() })
    }

    /// Controller wired to this rig. Needs a Tokio runtime.
    pub fn controller(&self, config: CrabLensConfig) -> CameraController {
        CameraController::spawn(self.discovery(), self.driver(), config)
    }

    // ---- scripting ----

    pub fn set_permission(&self, status: PermissionStatus) {
        self.lock().permission = status;
    }

    pub fn fail_discovery(&self, error: Option<CameraError>) {
        self.lock().discovery_error = error;
    }

    pub fn fail_bind(&self, device_id: &str) {
        self.lock().failing_binds.insert(device_id.to_string());
    }

    pub fn fail_start_running(&self, fail: bool) {
        self.lock().fail_start_running = fail;
    }

    pub fn fail_lock(&self, fail: bool) {
        self.lock().fail_lock = fail;
    }

    pub fn fail_switching_config(&self, fail: bool) {
        self.lock().fail_switching_config = fail;
    }

    /// When on (the default), photo and recording callbacks resolve
    /// immediately with the scripted results.
    pub fn set_auto_complete(&self, auto: bool) {
        self.lock().auto_complete = auto;
    }

    pub fn set_photo_result(&self, result: Result<Option<PhotoData>, CameraError>) {
        self.lock().photo_result = result;
    }

    pub fn set_record_start_result(&self, result: Result<(), CameraError>) {
        self.lock().record_start_result = result;
    }

    // ---- manual callbacks ----

    pub fn pending_photos(&self) -> usize {
        self.lock().photos.len()
    }

    pub fn pending_recording_starts(&self) -> usize {
        self.lock().starts.len()
    }

    pub fn pending_recording_stops(&self) -> usize {
        self.lock().stops.len()
    }

    /// Resolve the oldest photo callback. Returns false if none was pending.
    pub fn complete_photo(&self, result: Result<Option<PhotoData>, CameraError>) -> bool {
        let tx = self.lock().photos.pop_front();
        match tx {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub fn complete_recording_start(&self, result: Result<(), CameraError>) -> bool {
        let pending = {
            let mut state = self.lock();
            let pending = state.starts.pop_front();
            if let (Some((path, _)), true) = (&pending, result.is_ok()) {
                state.recording_to = Some(path.clone());
            }
            pending
        };
        match pending {
            Some((_, tx)) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Resolve the oldest stop callback; `Ok` reports the recording's path.
    pub fn complete_recording_stop(&self, result: Result<(), CameraError>) -> bool {
        let pending = self.lock().stops.pop_front();
        match pending {
            Some((path, tx)) => tx.send(result.map(|_| path)).is_ok(),
            None => false,
        }
    }

    // ---- notices ----

    pub fn emit_constituent_switch(&self, device_id: &str, from: Option<&str>, to: &str) {
        self.notify(DriverNotice::ConstituentSwitch {
            device_id: device_id.to_string(),
            from: from.map(str::to_string),
            to: to.to_string(),
        });
    }

    /// Simulate the movie output dying on its own.
    pub fn interrupt_recording(&self, error: CameraError) {
        self.lock().recording_to = None;
        self.notify(DriverNotice::RecordingInterrupted { error });
    }

    fn notify(&self, notice: DriverNotice) {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => {
                let _ = sink.send(notice);
            }
            None => log::warn!("Mock notice dropped, no sink attached: {:?}", notice),
        }
    }

    // ---- inspection ----

    pub fn bound_device(&self) -> Option<String> {
        self.lock().bound.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn switching_behavior_of(&self, device_id: &str) -> Option<SwitchingBehavior> {
        self.lock().switching.get(device_id).copied()
    }

    pub fn is_watching_switches(&self) -> bool {
        self.lock().watching
    }

    pub fn torch(&self) -> Option<f64> {
        self.lock().torch
    }

    pub fn zoom_factor(&self) -> f64 {
        self.lock().zoom_factor
    }

    pub fn exposure_bias(&self) -> f64 {
        self.lock().exposure_bias
    }

    pub fn focus_point(&self) -> Option<(f64, f64)> {
        self.lock().focus_point
    }

    pub fn exposure_point(&self) -> Option<(f64, f64)> {
        self.lock().exposure_point
    }

    pub fn last_flash(&self) -> Option<FlashMode> {
        self.lock().last_flash
    }

    pub fn is_config_locked(&self) -> bool {
        self.lock().locked
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    /// Every hardware call in order, e.g. `bind_input(back-wide)`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Hardware-mutating calls made while a photo or recording callback was
    /// still outstanding.
    pub fn overlapping_calls(&self) -> usize {
        self.lock().overlapping
    }
}

impl Default for MockRig {
    fn default() -> Self {
        Self::new()
    }
}

/// A tiny mid-grey RGB frame.
pub fn sample_photo() -> PhotoData {
    PhotoData::Rgb {
        width: 4,
        height: 4,
        data: vec![128u8; 4 * 4 * 3],
    }
}

struct MockDiscovery {
    rig: MockRig,
}

impl DeviceDiscovery for MockDiscovery {
    fn discover(&self) -> Result<Vec<DeviceRecord>, CameraError> {
        let state = self.rig.lock();
        if let Some(error) = &state.discovery_error {
            return Err(error.clone());
        }
        Ok(state.devices.iter().map(|d| d.record.clone()).collect())
    }

    fn authorization(&self) -> PermissionStatus {
        self.rig.lock().permission
    }
}

struct MockDriver {
    rig: MockRig,
}

impl CaptureDriver for MockDriver {
    fn set_notice_sink(&mut self, sink: NoticeSink) {
        self.rig.lock().sink = Some(sink);
    }

    fn create_session(&mut self, preset: ResolutionPreset) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.record(format!("create_session({:?})", preset));
        state.session = true;
        Ok(())
    }

    fn begin_configuration(&mut self) {
        self.rig.lock().record("begin_configuration");
    }

    fn commit_configuration(&mut self) {
        self.rig.lock().record("commit_configuration");
    }

    fn bind_input(&mut self, device_id: &str) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.record(format!("bind_input({})", device_id));
        if !state.session {
            return Err(CameraError::HardwareError("no capture session".into()));
        }
        if state.failing_binds.contains(device_id) {
            return Err(CameraError::HardwareError(format!(
                "cannot add input {}",
                device_id
            )));
        }
        let device = state
            .devices
            .iter()
            .find(|d| d.record.id == device_id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound(device_id.to_string()))?;
        state.bound = Some(device_id.to_string());
        state.zoom_factor = device.zoom.map(|z| z.current).unwrap_or(1.0);
        state.exposure_bias = 0.0;
        Ok(())
    }

    fn unbind_input(&mut self) {
        let mut state = self.rig.lock();
        state.record("unbind_input");
        state.bound = None;
        state.torch = None;
    }

    fn attach_outputs(&mut self, audio: bool) -> Result<(), CameraError> {
        self.rig.lock().record(format!("attach_outputs(audio={})", audio));
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.record("start_running");
        if state.fail_start_running {
            return Err(CameraError::HardwareError("session failed to start".into()));
        }
        state.running = true;
        Ok(())
    }

    fn stop_running(&mut self) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.record("stop_running");
        state.running = false;
        Ok(())
    }

    fn release_session(&mut self) {
        let mut state = self.rig.lock();
        state.record("release_session");
        state.session = false;
        state.running = false;
        state.bound = None;
        state.watching = false;
        state.releases += 1;
    }

    fn lock_for_configuration(&mut self) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        if state.fail_lock {
            return Err(CameraError::HardwareError("device is locked by another client".into()));
        }
        if state.locked {
            return Err(CameraError::HardwareError("configuration lock already held".into()));
        }
        state.locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        self.rig.lock().locked = false;
    }

    fn zoom_report(&self) -> Option<ZoomRange> {
        let state = self.rig.lock();
        state.bound_device().and_then(|d| d.zoom)
    }

    fn set_zoom_factor(&mut self, factor: f64) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.require_lock("set_zoom_factor")?;
        state.record(format!("set_zoom_factor({})", factor));
        state.zoom_factor = factor;
        Ok(())
    }

    fn exposure_bias_report(&self) -> Option<ExposureRange> {
        let state = self.rig.lock();
        state.bound_device().and_then(|d| d.exposure)
    }

    fn set_exposure_bias(&mut self, ev: f64) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.require_lock("set_exposure_bias")?;
        state.record(format!("set_exposure_bias({})", ev));
        state.exposure_bias = ev;
        Ok(())
    }

    fn set_focus_point(&mut self, x: f64, y: f64) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.require_lock("set_focus_point")?;
        state.record(format!("set_focus_point({}, {})", x, y));
        state.focus_point = Some((x, y));
        Ok(())
    }

    fn set_exposure_point(&mut self, x: f64, y: f64) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.require_lock("set_exposure_point")?;
        state.record(format!("set_exposure_point({}, {})", x, y));
        state.exposure_point = Some((x, y));
        Ok(())
    }

    fn set_torch(&mut self, level: Option<f64>) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.require_lock("set_torch")?;
        state.record(format!("set_torch({:?})", level));
        state.torch = level;
        Ok(())
    }

    fn switching_behavior(&self) -> SwitchingBehavior {
        let state = self.rig.lock();
        state
            .bound
            .as_ref()
            .and_then(|id| state.switching.get(id).copied())
            .unwrap_or(SwitchingBehavior::Unsupported)
    }

    fn set_switching_behavior(&mut self, behavior: SwitchingBehavior) -> Result<(), CameraError> {
        let mut state = self.rig.lock();
        state.require_lock("set_switching_behavior")?;
        state.record(format!("set_switching_behavior({:?})", behavior));
        if state.fail_switching_config {
            return Err(CameraError::HardwareError(
                "switching configuration rejected".into(),
            ));
        }
        let id = state
            .bound
            .clone()
            .ok_or_else(|| CameraError::HardwareError("no input bound".into()))?;
        state.switching.insert(id, behavior);
        Ok(())
    }

    fn watch_switching(&mut self, enabled: bool) {
        let mut state = self.rig.lock();
        state.record(format!("watch_switching({})", enabled));
        state.watching = enabled;
    }

    fn capture_photo(&mut self, flash: FlashMode) -> Pending<Option<PhotoData>> {
        let mut state = self.rig.lock();
        state.record(format!("capture_photo({:?})", flash));
        state.last_flash = Some(flash);
        if state.auto_complete {
            return resolved(state.photo_result.clone());
        }
        let (tx, rx) = oneshot::channel();
        state.photos.push_back(tx);
        rx
    }

    fn start_recording(&mut self, path: &Path) -> Pending<()> {
        let mut state = self.rig.lock();
        state.record(format!("start_recording({})", path.display()));
        if state.recording_to.is_some() {
            return resolved(Err(CameraError::AlreadyRecording));
        }
        if state.auto_complete {
            let result = state.record_start_result.clone();
            if result.is_ok() {
                state.recording_to = Some(path.to_path_buf());
            }
            return resolved(result);
        }
        let (tx, rx) = oneshot::channel();
        state.starts.push_back((path.to_path_buf(), tx));
        rx
    }

    fn stop_recording(&mut self) -> Pending<PathBuf> {
        let mut state = self.rig.lock();
        state.record("stop_recording");
        let Some(path) = state.recording_to.take() else {
            return resolved(Err(CameraError::NotRecording));
        };
        if state.auto_complete {
            return resolved(Ok(path));
        }
        let (tx, rx) = oneshot::channel();
        state.stops.push_back((path, tx));
        rx
    }
}
