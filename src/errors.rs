use thiserror::Error;

/// Errors surfaced by the camera session controller and its hardware seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera device not found: {0}")]
    DeviceNotFound(String),

    #[error("Camera hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Camera hardware error: {0}")]
    HardwareError(String),

    #[error("Camera busy: {0}")]
    Busy(String),

    #[error("Camera not ready: {0}")]
    NotReady(String),

    #[error("No video recording in progress")]
    NotRecording,

    #[error("A video recording is already in progress")]
    AlreadyRecording,

    #[error("Anti-macro policy could not be applied: {0}")]
    PolicyConfigError(String),

    #[error("Capture error: {0}")]
    CaptureError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl CameraError {
    /// Stable machine-readable code carried by `Error` events and command replies.
    pub fn code(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied(_) => "permissionDenied",
            CameraError::DeviceNotFound(_) => "deviceNotFound",
            CameraError::HardwareUnavailable(_) => "hardwareUnavailable",
            CameraError::HardwareError(_) => "hardwareError",
            CameraError::Busy(_) => "busy",
            CameraError::NotReady(_) => "notReady",
            CameraError::NotRecording => "notRecording",
            CameraError::AlreadyRecording => "alreadyRecording",
            CameraError::PolicyConfigError(_) => "policyConfigError",
            CameraError::CaptureError(_) => "captureError",
            CameraError::InvalidArgument(_) => "invalidArgument",
            CameraError::ConfigError(_) => "configError",
            CameraError::Io(_) => "io",
        }
    }

    /// Construction-time failures keep their own identity only when the caller
    /// can act on them; everything else collapses to `HardwareError`.
    pub(crate) fn into_construction_error(self) -> CameraError {
        match self {
            e @ (CameraError::PermissionDenied(_)
            | CameraError::DeviceNotFound(_)
            | CameraError::HardwareUnavailable(_)
            | CameraError::HardwareError(_)) => e,
            other => CameraError::HardwareError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Io(err.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::CaptureError(format!("Failed to encode photo: {}", err))
    }
}
