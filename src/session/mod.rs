//! Session controller.
//!
//! [`CameraController`] is a cheap, cloneable handle. Every mutating call is
//! queued to a single actor task that owns the capture driver, so hardware
//! mutations never run concurrently. Long hardware round trips (photo,
//! recording start/stop) do not block the actor: conflicting requests are
//! rejected with `Busy` while one is pending, everything else waits its turn.
//!
//! Reads (`state`, `watch_state`, `subscribe`, `enumerate_devices`,
//! `get_zoom_range`) bypass the queue.

mod actor;
mod coordinator;

use crate::catalog::DeviceCatalog;
use crate::config::CrabLensConfig;
use crate::errors::CameraError;
use crate::mirror::{EventStream, StateMirror};
use crate::permissions::PermissionStatus;
use crate::platform::{CaptureDriver, DeviceDiscovery};
use crate::types::{
    CameraDevice, CameraState, ExposureRange, FlashMode, InitializeParams, LensDirection,
    ZoomRange,
};
use actor::SessionActor;
use coordinator::Reply;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Lifecycle of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Running,
    Reconfiguring,
    Disposed,
}

pub(crate) enum Command {
    Initialize {
        params: InitializeParams,
        reply: Reply<()>,
    },
    Dispose {
        reply: Reply<()>,
    },
    SetAntiMacro {
        enabled: bool,
        reply: Reply<()>,
    },
    SetFlashMode {
        mode: FlashMode,
        reply: Reply<()>,
    },
    SetTorchMode {
        enabled: bool,
        level: f64,
        reply: Reply<()>,
    },
    SetZoomLevel {
        value: f64,
        reply: Reply<f64>,
    },
    SetFocusPoint {
        x: f64,
        y: f64,
        reply: Reply<()>,
    },
    SetExposurePoint {
        x: f64,
        y: f64,
        reply: Reply<()>,
    },
    SetExposureCompensation {
        ev: f64,
        reply: Reply<f64>,
    },
    SwitchCamera {
        reply: Reply<LensDirection>,
    },
    SwitchToCamera {
        device_id: String,
        reply: Reply<LensDirection>,
    },
    TakePicture {
        reply: Reply<PathBuf>,
    },
    StartRecording {
        reply: Reply<()>,
    },
    StopRecording {
        reply: Reply<PathBuf>,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Initialize { .. } => "initialize",
            Command::Dispose { .. } => "dispose",
            Command::SetAntiMacro { .. } => "set_anti_macro_enabled",
            Command::SetFlashMode { .. } => "set_flash_mode",
            Command::SetTorchMode { .. } => "set_torch_mode",
            Command::SetZoomLevel { .. } => "set_zoom_level",
            Command::SetFocusPoint { .. } => "set_focus_point",
            Command::SetExposurePoint { .. } => "set_exposure_point",
            Command::SetExposureCompensation { .. } => "set_exposure_compensation",
            Command::SwitchCamera { .. } => "switch_camera",
            Command::SwitchToCamera { .. } => "switch_to_camera",
            Command::TakePicture { .. } => "take_picture",
            Command::StartRecording { .. } => "start_video_recording",
            Command::StopRecording { .. } => "stop_video_recording",
        }
    }

    /// Answer the caller with `error` without running the command.
    pub(crate) fn reject(self, error: CameraError) {
        match self {
            Command::Initialize { reply, .. }
            | Command::Dispose { reply }
            | Command::SetAntiMacro { reply, .. }
            | Command::SetFlashMode { reply, .. }
            | Command::SetTorchMode { reply, .. }
            | Command::SetFocusPoint { reply, .. }
            | Command::SetExposurePoint { reply, .. }
            | Command::StartRecording { reply } => {
                let _ = reply.send(Err(error));
            }
            Command::SetZoomLevel { reply, .. } | Command::SetExposureCompensation { reply, .. } => {
                let _ = reply.send(Err(error));
            }
            Command::SwitchCamera { reply } | Command::SwitchToCamera { reply, .. } => {
                let _ = reply.send(Err(error));
            }
            Command::TakePicture { reply } | Command::StopRecording { reply } => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

/// Handle to one camera session.
#[derive(Clone)]
pub struct CameraController {
    commands: mpsc::UnboundedSender<Command>,
    catalog: DeviceCatalog,
    mirror: Arc<StateMirror>,
    phase: watch::Receiver<SessionPhase>,
}

impl CameraController {
    /// Start the session actor on the current Tokio runtime.
    ///
    /// The actor lives until every handle has been dropped; it then disposes
    /// the session.
    pub fn spawn(
        discovery: Arc<dyn DeviceDiscovery>,
        driver: Box<dyn CaptureDriver>,
        config: CrabLensConfig,
    ) -> Self {
        let config = config.sanitized();
        let catalog = DeviceCatalog::new(discovery);
        let mirror = Arc::new(StateMirror::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Uninitialized);

        let actor = SessionActor::new(
            driver,
            catalog.clone(),
            mirror.clone(),
            config,
            phase_tx,
            command_rx,
        );
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            catalog,
            mirror,
            phase: phase_rx,
        }
    }

    /// Whether both handles drive the same session.
    pub fn same_session(&self, other: &CameraController) -> bool {
        self.commands.same_channel(&other.commands)
    }

    /// Controller over the system cameras.
    pub fn native(config: CrabLensConfig) -> Self {
        let (discovery, driver) = crate::platform::native::backend();
        Self::spawn(discovery, driver, config)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T, CameraError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .map_err(|_| CameraError::NotReady("session controller has shut down".into()))?;
        rx.await
            .map_err(|_| CameraError::NotReady("session controller has shut down".into()))?
    }

    // ---- reads ----

    /// Fresh enumeration; does not wait behind queued commands.
    pub fn enumerate_devices(&self) -> Result<Vec<CameraDevice>, CameraError> {
        self.catalog.enumerate()
    }

    pub fn authorization(&self) -> PermissionStatus {
        self.catalog.authorization()
    }

    pub fn state(&self) -> Arc<CameraState> {
        self.mirror.snapshot()
    }

    pub fn watch_state(&self) -> watch::Receiver<Arc<CameraState>> {
        self.mirror.watch()
    }

    pub fn subscribe(&self) -> EventStream {
        self.mirror.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn get_zoom_range(&self) -> Result<ZoomRange, CameraError> {
        let state = self.require_initialized()?;
        Ok(state.zoom)
    }

    pub fn get_exposure_offset_range(&self) -> Result<ExposureRange, CameraError> {
        let state = self.require_initialized()?;
        Ok(state.exposure_offset_range)
    }

    fn require_initialized(&self) -> Result<Arc<CameraState>, CameraError> {
        let state = self.mirror.snapshot();
        if state.initialized {
            Ok(state)
        } else {
            Err(CameraError::NotReady("camera is not initialized".into()))
        }
    }

    // ---- lifecycle ----

    pub async fn initialize(&self, params: InitializeParams) -> Result<(), CameraError> {
        self.request(|reply| Command::Initialize { params, reply }).await
    }

    /// Idempotent. Waits for any pending hardware round trip first.
    pub async fn dispose(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::Dispose { reply }).await
    }

    // ---- configuration ----

    pub async fn set_anti_macro_enabled(&self, enabled: bool) -> Result<(), CameraError> {
        self.request(|reply| Command::SetAntiMacro { enabled, reply }).await
    }

    pub async fn set_flash_mode(&self, mode: FlashMode) -> Result<(), CameraError> {
        self.request(|reply| Command::SetFlashMode { mode, reply }).await
    }

    pub async fn set_torch_mode(&self, enabled: bool, level: f64) -> Result<(), CameraError> {
        self.request(|reply| Command::SetTorchMode {
            enabled,
            level,
            reply,
        })
        .await
    }

    /// Returns the zoom factor actually applied after clamping.
    pub async fn set_zoom_level(&self, value: f64) -> Result<f64, CameraError> {
        self.request(|reply| Command::SetZoomLevel { value, reply }).await
    }

    pub async fn set_focus_point(&self, x: f64, y: f64) -> Result<(), CameraError> {
        self.request(|reply| Command::SetFocusPoint { x, y, reply }).await
    }

    pub async fn set_exposure_point(&self, x: f64, y: f64) -> Result<(), CameraError> {
        self.request(|reply| Command::SetExposurePoint { x, y, reply }).await
    }

    /// Returns the EV offset actually applied after clamping.
    pub async fn set_exposure_compensation(&self, ev: f64) -> Result<f64, CameraError> {
        self.request(|reply| Command::SetExposureCompensation { ev, reply }).await
    }

    // ---- switching ----

    pub async fn switch_camera(&self) -> Result<LensDirection, CameraError> {
        self.request(|reply| Command::SwitchCamera { reply }).await
    }

    pub async fn switch_to_camera(&self, device_id: &str) -> Result<LensDirection, CameraError> {
        let device_id = device_id.to_string();
        self.request(|reply| Command::SwitchToCamera { device_id, reply })
            .await
    }

    // ---- capture and recording ----

    pub async fn take_picture(&self) -> Result<PathBuf, CameraError> {
        self.request(|reply| Command::TakePicture { reply }).await
    }

    pub async fn start_video_recording(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::StartRecording { reply }).await
    }

    pub async fn stop_video_recording(&self) -> Result<PathBuf, CameraError> {
        self.request(|reply| Command::StopRecording { reply }).await
    }
}
