//! Core value types shared by the controller, the hardware seam and the
//! command surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Which way a lens faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LensDirection {
    Front,
    Back,
}

impl LensDirection {
    pub fn opposite(self) -> Self {
        match self {
            LensDirection::Front => LensDirection::Back,
            LensDirection::Back => LensDirection::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LensDirection::Front => "front",
            LensDirection::Back => "back",
        }
    }
}

impl fmt::Display for LensDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical (or virtual) lens module type as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    WideAngle,
    UltraWide,
    Telephoto,
    TrueDepth,
    VirtualDual,
    VirtualDualWide,
    VirtualTriple,
    Unknown,
}

impl DeviceKind {
    /// Virtual devices are multi-lens modules whose driver may swap the active
    /// constituent lens on its own.
    pub fn is_virtual(&self) -> bool {
        matches!(
            self,
            DeviceKind::VirtualDual | DeviceKind::VirtualDualWide | DeviceKind::VirtualTriple
        )
    }
}

/// Reduced width:height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Immutable descriptor of one camera device, produced per enumeration.
///
/// Identity is the `id`: two descriptors from different enumerations of the
/// same physical device compare equal even if other fields changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub id: String,
    pub display_name: String,
    pub lens_direction: LensDirection,
    pub sensor_orientation_degrees: u16,
    pub has_flash: bool,
    pub has_torch: bool,
    pub device_kind: DeviceKind,
    pub supported_aspect_ratios: Vec<AspectRatio>,
}

impl PartialEq for CameraDevice {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CameraDevice {}

impl Hash for CameraDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Capture resolution preset requested at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPreset {
    Low,
    Medium,
    #[default]
    High,
    VeryHigh,
    UltraHigh,
    Max,
}

impl ResolutionPreset {
    /// Target frame size. `Max` asks for the largest the device offers.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        match self {
            ResolutionPreset::Low => Some((352, 288)),
            ResolutionPreset::Medium => Some((640, 480)),
            ResolutionPreset::High => Some((1280, 720)),
            ResolutionPreset::VeryHigh => Some((1920, 1080)),
            ResolutionPreset::UltraHigh => Some((3840, 2160)),
            ResolutionPreset::Max => None,
        }
    }

    /// Movie bitrate hint in bits per second.
    pub fn bitrate(&self) -> u32 {
        match self {
            ResolutionPreset::Low => 800_000,
            ResolutionPreset::Medium => 1_500_000,
            ResolutionPreset::High => 2_500_000,
            ResolutionPreset::VeryHigh => 5_000_000,
            ResolutionPreset::UltraHigh | ResolutionPreset::Max => 10_000_000,
        }
    }
}

/// Flash behaviour for still capture. `Torch` is entered only through
/// `set_torch_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlashMode {
    #[default]
    Off,
    Auto,
    On,
    Torch,
}

/// Hardware-reported zoom capability, always ordered `min <= current <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

impl ZoomRange {
    pub const FALLBACK: ZoomRange = ZoomRange {
        min: 1.0,
        max: 1.0,
        current: 1.0,
    };

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn is_ordered(&self) -> bool {
        self.min > 0.0 && self.min <= self.current && self.current <= self.max
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Exposure bias range in EV.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExposureRange {
    pub min: f64,
    pub max: f64,
}

/// Last error recorded in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateError {
    pub code: String,
    pub message: String,
}

/// The mirrored, immutable controller snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub version: u64,
    pub initialized: bool,
    pub active_device: Option<CameraDevice>,
    pub lens_direction: Option<LensDirection>,
    pub flash_mode: FlashMode,
    pub torch_on: bool,
    pub torch_level: f64,
    pub zoom: ZoomRange,
    pub exposure_offset: f64,
    pub exposure_offset_range: ExposureRange,
    pub anti_macro_enabled: bool,
    pub macro_detected: bool,
    pub recording: bool,
    pub capturing: bool,
    pub aspect_ratio: Option<AspectRatio>,
    pub last_error: Option<StateError>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            version: 0,
            initialized: false,
            active_device: None,
            lens_direction: None,
            flash_mode: FlashMode::Off,
            torch_on: false,
            torch_level: 0.0,
            zoom: ZoomRange::FALLBACK,
            exposure_offset: 0.0,
            exposure_offset_range: ExposureRange::default(),
            anti_macro_enabled: false,
            macro_detected: false,
            recording: false,
            capturing: false,
            aspect_ratio: None,
            last_error: None,
        }
    }
}

/// Discrete notifications delivered alongside snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CameraEvent {
    Initialized,
    PictureTaken { path: PathBuf },
    RecordingStarted,
    RecordingStopped { path: PathBuf },
    MacroDetected { message: String },
    Error { code: String, message: String },
}

impl CameraEvent {
    pub fn from_error(error: &crate::errors::CameraError) -> Self {
        CameraEvent::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// How `initialize` and `switch_camera` pick a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSelector {
    pub device_id: Option<String>,
    pub lens_direction: LensDirection,
}

impl DeviceSelector {
    pub fn direction(lens_direction: LensDirection) -> Self {
        Self {
            device_id: None,
            lens_direction,
        }
    }

    pub fn id(device_id: impl Into<String>, lens_direction: LensDirection) -> Self {
        Self {
            device_id: Some(device_id.into()),
            lens_direction,
        }
    }
}

/// Parameters of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub selector: DeviceSelector,
    pub resolution_preset: ResolutionPreset,
    pub enable_anti_macro: bool,
    pub enable_audio: bool,
    pub auto_flash: bool,
}

impl InitializeParams {
    pub fn new(selector: DeviceSelector) -> Self {
        Self {
            selector,
            resolution_preset: ResolutionPreset::default(),
            enable_anti_macro: true,
            enable_audio: false,
            auto_flash: false,
        }
    }

    pub fn with_preset(mut self, preset: ResolutionPreset) -> Self {
        self.resolution_preset = preset;
        self
    }

    pub fn with_anti_macro(mut self, enabled: bool) -> Self {
        self.enable_anti_macro = enabled;
        self
    }

    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.enable_audio = enabled;
        self
    }

    pub fn with_auto_flash(mut self, enabled: bool) -> Self {
        self.auto_flash = enabled;
        self
    }
}
