//! Hardware seam.
//!
//! The controller never touches a camera API directly. It talks to two
//! traits: [`DeviceDiscovery`], a shareable read-only view used for
//! enumeration, and [`CaptureDriver`], the exclusive handle to the capture
//! session that only the session actor owns. Hardware callbacks come back as
//! [`Pending`] futures with exactly one resolution, or as [`DriverNotice`]s on
//! the sink handed to the driver at spawn.

pub mod native;

use crate::errors::CameraError;
use crate::permissions::PermissionStatus;
use crate::types::{DeviceKind, ExposureRange, FlashMode, LensDirection, ResolutionPreset, ZoomRange};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

/// A hardware callback that resolves once.
pub type Pending<T> = oneshot::Receiver<Result<T, CameraError>>;

/// Where drivers push unsolicited notifications.
pub type NoticeSink = mpsc::UnboundedSender<DriverNotice>;

/// Raw device record as reported by the enumeration primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub hardware_index: u32,
    pub position: LensDirection,
    pub sensor_orientation: i32,
    pub has_flash: bool,
    pub has_torch: bool,
    pub kind: DeviceKind,
    /// Capture formats as (width, height).
    pub formats: Vec<(u32, u32)>,
}

/// Conditions under which a restricted multi-lens device may still switch
/// its active constituent lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwitchingConditions {
    pub video_zoom_changed: bool,
    pub focus_mode_changed: bool,
    pub exposure_mode_changed: bool,
}

impl SwitchingConditions {
    pub const NONE: SwitchingConditions = SwitchingConditions {
        video_zoom_changed: false,
        focus_mode_changed: false,
        exposure_mode_changed: false,
    };
}

/// Constituent-device switching control of the bound device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchingBehavior {
    /// Single-lens hardware or a driver without the control.
    Unsupported,
    Auto,
    Restricted(SwitchingConditions),
}

/// Still-image payload handed back by the photo output.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoData {
    Jpeg(Vec<u8>),
    Rgb { width: u32, height: u32, data: Vec<u8> },
}

/// Unsolicited driver callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverNotice {
    /// The driver tried to swap the active constituent lens.
    ConstituentSwitch {
        device_id: String,
        from: Option<String>,
        to: String,
    },
    /// The movie output stopped on its own with an error.
    RecordingInterrupted { error: CameraError },
}

/// Read-only enumeration, safe to call from any thread.
pub trait DeviceDiscovery: Send + Sync {
    fn discover(&self) -> Result<Vec<DeviceRecord>, CameraError>;

    fn authorization(&self) -> PermissionStatus;
}

/// Exclusive handle on the capture session.
///
/// Methods operate on the currently bound input. Configuration setters
/// require the configuration lock to be held by the caller.
pub trait CaptureDriver: Send {
    fn set_notice_sink(&mut self, sink: NoticeSink);

    fn create_session(&mut self, preset: ResolutionPreset) -> Result<(), CameraError>;
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);
    fn bind_input(&mut self, device_id: &str) -> Result<(), CameraError>;
    fn unbind_input(&mut self);
    fn attach_outputs(&mut self, audio: bool) -> Result<(), CameraError>;
    fn start_running(&mut self) -> Result<(), CameraError>;
    fn stop_running(&mut self) -> Result<(), CameraError>;
    fn release_session(&mut self);

    fn lock_for_configuration(&mut self) -> Result<(), CameraError>;
    fn unlock_for_configuration(&mut self);

    fn zoom_report(&self) -> Option<ZoomRange>;
    fn set_zoom_factor(&mut self, factor: f64) -> Result<(), CameraError>;
    fn exposure_bias_report(&self) -> Option<ExposureRange>;
    fn set_exposure_bias(&mut self, ev: f64) -> Result<(), CameraError>;
    fn set_focus_point(&mut self, x: f64, y: f64) -> Result<(), CameraError>;
    fn set_exposure_point(&mut self, x: f64, y: f64) -> Result<(), CameraError>;
    /// `None` turns the torch off.
    fn set_torch(&mut self, level: Option<f64>) -> Result<(), CameraError>;

    fn switching_behavior(&self) -> SwitchingBehavior;
    fn set_switching_behavior(&mut self, behavior: SwitchingBehavior) -> Result<(), CameraError>;
    fn watch_switching(&mut self, enabled: bool);

    /// Resolves with `Ok(None)` when the hardware reports success without a
    /// buffer.
    fn capture_photo(&mut self, flash: FlashMode) -> Pending<Option<PhotoData>>;
    /// Resolves once the movie output confirms it is writing.
    fn start_recording(&mut self, path: &Path) -> Pending<()>;
    /// Resolves with the finished file once the movie output has closed it.
    fn stop_recording(&mut self) -> Pending<PathBuf>;
}

/// A pending callback that has already resolved.
pub fn resolved<T>(result: Result<T, CameraError>) -> Pending<T> {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(result);
    rx
}

/// Run `apply` with the driver's configuration lock held; the lock is
/// released on every path.
pub fn with_configuration_lock<T, F>(driver: &mut dyn CaptureDriver, apply: F) -> Result<T, CameraError>
where
    F: FnOnce(&mut dyn CaptureDriver) -> Result<T, CameraError>,
{
    driver.lock_for_configuration()?;
    let result = apply(&mut *driver);
    driver.unlock_for_configuration();
    result
}
