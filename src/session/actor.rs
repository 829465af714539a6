use super::coordinator::{
    photo_payload, write_photo, BusyFlag, BusyRelease, Completion, InFlight, OutputNamer, Reply,
};
use super::{Command, SessionPhase};
use crate::capability::{self, Capabilities};
use crate::catalog::DeviceCatalog;
use crate::config::CrabLensConfig;
use crate::errors::CameraError;
use crate::mirror::StateMirror;
use crate::permissions::require_granted;
use crate::platform::{with_configuration_lock, CaptureDriver, DriverNotice, Pending};
use crate::policy;
use crate::types::{
    CameraDevice, CameraEvent, CameraState, DeviceSelector, FlashMode, InitializeParams,
    LensDirection, StateError,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Owns the capture driver and every piece of mutable session state. All
/// commands, hardware callbacks and driver notices are handled here, one at
/// a time.
pub(crate) struct SessionActor {
    driver: Box<dyn CaptureDriver>,
    catalog: DeviceCatalog,
    mirror: Arc<StateMirror>,
    config: CrabLensConfig,
    namer: OutputNamer,
    phase: watch::Sender<SessionPhase>,
    device: Option<CameraDevice>,
    capabilities: Option<Capabilities>,
    recording_path: Option<PathBuf>,
    commands: mpsc::UnboundedReceiver<Command>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    notices: mpsc::UnboundedReceiver<DriverNotice>,
    in_flight: Option<InFlight>,
    deferred: VecDeque<Command>,
}

impl SessionActor {
    pub(crate) fn new(
        mut driver: Box<dyn CaptureDriver>,
        catalog: DeviceCatalog,
        mirror: Arc<StateMirror>,
        config: CrabLensConfig,
        phase: watch::Sender<SessionPhase>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (notice_tx, notices) = mpsc::unbounded_channel();
        driver.set_notice_sink(notice_tx);
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let namer = OutputNamer::new(
            config.storage.output_dir(),
            config.storage.photo_prefix.clone(),
            config.storage.video_prefix.clone(),
        );

        Self {
            driver,
            catalog,
            mirror,
            config,
            namer,
            phase,
            device: None,
            capabilities: None,
            recording_path: None,
            commands,
            completion_tx,
            completions,
            notices,
            in_flight: None,
            deferred: VecDeque::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        log::debug!("Session actor started");
        loop {
            if self.in_flight.is_none() {
                if let Some(command) = self.deferred.pop_front() {
                    self.dispatch(command).await;
                    continue;
                }
            }

            tokio::select! {
                biased;
                Some(done) = self.completions.recv() => self.resolve(done).await,
                Some(notice) = self.notices.recv() => self.on_notice(notice),
                command = self.commands.recv() => match command {
                    Some(command) => self.admit(command).await,
                    None => break,
                },
            }
        }

        self.shutdown().await;
        log::debug!("Session actor stopped");
    }

    /// Every controller handle is gone: finish the pending round trip, then
    /// tear the session down.
    async fn shutdown(&mut self) {
        while self.in_flight.is_some() {
            match self.completions.recv().await {
                Some(done) => self.resolve(done).await,
                None => break,
            }
        }
        for command in self.deferred.drain(..) {
            command.reject(CameraError::NotReady("session controller has shut down".into()));
        }
        if let Err(e) = self.dispose().await {
            log::warn!("Dispose during shutdown failed: {}", e);
        }
    }

    /// Reject conflicting commands while a round trip is pending; queue the
    /// rest behind it.
    async fn admit(&mut self, command: Command) {
        if self.in_flight.is_none() {
            self.dispatch(command).await;
            return;
        }
        let (pending, start_pending) = match &self.in_flight {
            Some(in_flight) => (
                in_flight.name(),
                matches!(in_flight, InFlight::StartRecording { .. }),
            ),
            None => return,
        };

        let snapshot = self.mirror.snapshot();
        let conflict = match &command {
            Command::TakePicture { .. } if snapshot.capturing => {
                Some(CameraError::Busy("a picture is already being captured".into()))
            }
            Command::StartRecording { .. } if snapshot.recording || start_pending => {
                Some(CameraError::Busy("recording already in progress".into()))
            }
            Command::SwitchCamera { .. } | Command::SwitchToCamera { .. }
                if snapshot.recording || start_pending =>
            {
                Some(CameraError::Busy("cannot switch cameras while recording".into()))
            }
            _ => None,
        };

        match conflict {
            Some(err) => {
                log::debug!("Rejecting {} while {} is pending", command.name(), pending);
                command.reject(err);
            }
            None => {
                log::debug!("Deferring {} until {} resolves", command.name(), pending);
                self.deferred.push_back(command);
            }
        }
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::Initialize { params, reply } => {
                let _ = reply.send(self.initialize(params));
            }
            Command::Dispose { reply } => {
                let _ = reply.send(self.dispose().await);
            }
            Command::SetAntiMacro { enabled, reply } => {
                let _ = reply.send(self.set_anti_macro(enabled));
            }
            Command::SetFlashMode { mode, reply } => {
                let _ = reply.send(self.set_flash_mode(mode));
            }
            Command::SetTorchMode {
                enabled,
                level,
                reply,
            } => {
                let _ = reply.send(self.set_torch_mode(enabled, level));
            }
            Command::SetZoomLevel { value, reply } => {
                let _ = reply.send(self.set_zoom_level(value));
            }
            Command::SetFocusPoint { x, y, reply } => {
                let _ = reply.send(self.set_point(x, y, PointKind::Focus));
            }
            Command::SetExposurePoint { x, y, reply } => {
                let _ = reply.send(self.set_point(x, y, PointKind::Exposure));
            }
            Command::SetExposureCompensation { ev, reply } => {
                let _ = reply.send(self.set_exposure_compensation(ev));
            }
            Command::SwitchCamera { reply } => {
                let _ = reply.send(self.switch_camera());
            }
            Command::SwitchToCamera { device_id, reply } => {
                let _ = reply.send(self.switch_to_camera(&device_id));
            }
            Command::TakePicture { reply } => self.take_picture(reply),
            Command::StartRecording { reply } => self.start_recording(reply),
            Command::StopRecording { reply } => self.stop_recording(reply),
        }
    }

    fn set_phase(&self, next: SessionPhase) {
        let previous = self.phase.send_replace(next);
        if previous != next {
            log::debug!("Session phase {:?} -> {:?}", previous, next);
        }
    }

    fn current_phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    fn ensure_running(&self) -> Result<&CameraDevice, CameraError> {
        match (self.current_phase(), &self.device) {
            (SessionPhase::Running, Some(device)) => Ok(device),
            (SessionPhase::Disposed, _) => {
                Err(CameraError::NotReady("controller has been disposed".into()))
            }
            (phase, _) => Err(CameraError::NotReady(format!(
                "camera is not running ({:?})",
                phase
            ))),
        }
    }

    /// Record a failure nobody is awaiting synchronously, and tell
    /// subscribers.
    fn report(&self, error: &CameraError) {
        log::error!("Camera error: {}", error);
        self.mirror.update(|s| {
            s.last_error = Some(StateError {
                code: error.code().to_string(),
                message: error.to_string(),
            })
        });
        self.mirror.emit(CameraEvent::from_error(error));
    }

    fn track<T: Send + 'static>(&self, pending: Pending<T>, wrap: fn(Result<T, CameraError>) -> Completion) {
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = pending.await.unwrap_or_else(|_| {
                Err(CameraError::HardwareError("hardware callback was dropped".into()))
            });
            let _ = tx.send(wrap(result));
        });
    }

    // ---- lifecycle ----

    fn initialize(&mut self, params: InitializeParams) -> Result<(), CameraError> {
        match self.current_phase() {
            SessionPhase::Disposed => {
                return Err(CameraError::NotReady("controller has been disposed".into()))
            }
            SessionPhase::Running => {
                if self.mirror.snapshot().recording {
                    return Err(CameraError::Busy("cannot re-initialize while recording".into()));
                }
                log::info!("Re-initializing camera session");
                self.teardown_session();
            }
            _ => {}
        }

        self.set_phase(SessionPhase::Initializing);
        self.mirror.update(|s| s.last_error = None);
        let device = match self.build_session(&params) {
            Ok(device) => device,
            Err(e) => {
                log::error!("Camera initialization failed: {}", e);
                self.driver.release_session();
                self.set_phase(SessionPhase::Uninitialized);
                let error = e.into_construction_error();
                self.mirror.update(|s| {
                    *s = CameraState {
                        version: s.version,
                        last_error: Some(StateError {
                            code: error.code().to_string(),
                            message: error.to_string(),
                        }),
                        ..CameraState::default()
                    }
                });
                return Err(error);
            }
        };

        let caps = capability::resolve(
            &device,
            self.driver.zoom_report(),
            self.driver.exposure_bias_report(),
        );
        let anti_macro = params.enable_anti_macro && self.apply_policy(&device);
        let flash_mode = if params.auto_flash && device.has_flash {
            FlashMode::Auto
        } else {
            FlashMode::Off
        };

        log::info!(
            "Camera initialized: {} ({}, anti-macro {})",
            device.display_name,
            device.lens_direction,
            anti_macro
        );

        let published = device.clone();
        self.device = Some(device);
        self.capabilities = Some(caps.clone());
        self.set_phase(SessionPhase::Running);
        self.mirror.update(|s| {
            *s = CameraState {
                version: s.version,
                initialized: true,
                lens_direction: Some(published.lens_direction),
                active_device: Some(published),
                flash_mode,
                zoom: caps.zoom,
                exposure_offset_range: caps.exposure,
                anti_macro_enabled: anti_macro,
                aspect_ratio: caps.primary_aspect_ratio(),
                last_error: s.last_error.clone(),
                ..CameraState::default()
            }
        });
        self.mirror.emit(CameraEvent::Initialized);
        Ok(())
    }

    fn build_session(&mut self, params: &InitializeParams) -> Result<CameraDevice, CameraError> {
        require_granted(self.catalog.authorization())?;
        let device = self.catalog.select(&params.selector, params.enable_anti_macro)?;
        self.driver.create_session(params.resolution_preset)?;
        self.driver.bind_input(&device.id)?;
        self.driver.attach_outputs(params.enable_audio)?;
        self.driver.start_running()?;
        Ok(device)
    }

    /// Policy failures during construction are not fatal: the session runs
    /// without the restriction and subscribers hear about it.
    fn apply_policy(&mut self, device: &CameraDevice) -> bool {
        match policy::enable(self.driver.as_mut(), device) {
            Ok(_) => true,
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Best-effort release of everything the running session holds.
    fn teardown_session(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        self.capabilities = None;

        let snapshot = self.mirror.snapshot();
        self.driver.watch_switching(false);
        if snapshot.anti_macro_enabled {
            if let Err(e) = policy::disable(self.driver.as_mut(), &device) {
                log::warn!("Failed to release switching restriction: {}", e);
            }
        }
        if snapshot.torch_on {
            if let Err(e) = with_configuration_lock(self.driver.as_mut(), |d| d.set_torch(None)) {
                log::warn!("Failed to turn torch off: {}", e);
            }
        }
        if let Err(e) = self.driver.stop_running() {
            log::warn!("Failed to stop capture session: {}", e);
        }
        self.driver.unbind_input();
        self.driver.release_session();
        log::info!("Released camera {}", device.id);
    }

    async fn dispose(&mut self) -> Result<(), CameraError> {
        if self.current_phase() == SessionPhase::Disposed {
            return Ok(());
        }

        if self.mirror.snapshot().recording {
            let release = BusyRelease::adopt(&self.mirror, BusyFlag::Recording);
            match self.driver.stop_recording().await {
                Ok(Ok(path)) => {
                    drop(release);
                    self.mirror.emit(CameraEvent::RecordingStopped { path });
                }
                Ok(Err(e)) => log::warn!("Stopping recording during dispose failed: {}", e),
                Err(_) => log::warn!("Recording stop callback dropped during dispose"),
            }
            self.recording_path = None;
        }

        self.teardown_session();
        self.set_phase(SessionPhase::Disposed);
        self.mirror.update(|s| {
            *s = CameraState {
                version: s.version,
                ..CameraState::default()
            }
        });
        log::info!("Camera controller disposed");
        Ok(())
    }

    // ---- configuration ----

    fn set_anti_macro(&mut self, enabled: bool) -> Result<(), CameraError> {
        let device = self.ensure_running()?.clone();
        let result = if enabled {
            policy::enable(self.driver.as_mut(), &device)
        } else {
            policy::disable(self.driver.as_mut(), &device)
        };

        match result {
            Ok(_) => {
                self.mirror.update(|s| {
                    s.anti_macro_enabled = enabled;
                    if enabled {
                        s.macro_detected = false;
                    }
                });
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    fn set_flash_mode(&mut self, mode: FlashMode) -> Result<(), CameraError> {
        let device = self.ensure_running()?;
        if mode == FlashMode::Torch {
            return Err(CameraError::InvalidArgument(
                "torch is controlled through set_torch_mode".into(),
            ));
        }
        if mode != FlashMode::Off && !device.has_flash {
            return Err(CameraError::HardwareError(format!(
                "{} has no flash",
                device.display_name
            )));
        }

        if self.mirror.snapshot().torch_on {
            with_configuration_lock(self.driver.as_mut(), |d| d.set_torch(None))?;
        }
        self.mirror.update(|s| {
            s.flash_mode = mode;
            s.torch_on = false;
            s.torch_level = 0.0;
        });
        Ok(())
    }

    fn set_torch_mode(&mut self, enabled: bool, level: f64) -> Result<(), CameraError> {
        let device = self.ensure_running()?;
        if level.is_nan() {
            return Err(CameraError::InvalidArgument("torch level is not a number".into()));
        }
        if !device.has_torch {
            if !enabled {
                return Ok(());
            }
            return Err(CameraError::HardwareError(format!(
                "{} has no torch",
                device.display_name
            )));
        }

        if enabled {
            let level = level.clamp(self.config.torch.min_level, 1.0);
            with_configuration_lock(self.driver.as_mut(), |d| d.set_torch(Some(level)))?;
            self.mirror.update(|s| {
                s.torch_on = true;
                s.torch_level = level;
                s.flash_mode = FlashMode::Torch;
            });
        } else {
            with_configuration_lock(self.driver.as_mut(), |d| d.set_torch(None))?;
            self.mirror.update(|s| {
                s.torch_on = false;
                s.torch_level = 0.0;
                s.flash_mode = FlashMode::Off;
            });
        }
        Ok(())
    }

    fn set_zoom_level(&mut self, value: f64) -> Result<f64, CameraError> {
        self.ensure_running()?;
        if !value.is_finite() {
            return Err(CameraError::InvalidArgument(format!("invalid zoom level {}", value)));
        }
        let range = self.capabilities.as_ref().map(|c| c.zoom).unwrap_or_default();
        let applied = range.clamp(value);
        with_configuration_lock(self.driver.as_mut(), |d| d.set_zoom_factor(applied))?;
        self.mirror.update(|s| s.zoom.current = applied);
        Ok(applied)
    }

    fn set_point(&mut self, x: f64, y: f64, kind: PointKind) -> Result<(), CameraError> {
        self.ensure_running()?;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(x) || !in_unit(y) {
            return Err(CameraError::InvalidArgument(format!(
                "{} point ({}, {}) is outside the unit square",
                kind.as_str(),
                x,
                y
            )));
        }
        with_configuration_lock(self.driver.as_mut(), |d| match kind {
            PointKind::Focus => d.set_focus_point(x, y),
            PointKind::Exposure => d.set_exposure_point(x, y),
        })
    }

    fn set_exposure_compensation(&mut self, ev: f64) -> Result<f64, CameraError> {
        self.ensure_running()?;
        if !ev.is_finite() {
            return Err(CameraError::InvalidArgument(format!("invalid exposure offset {}", ev)));
        }
        let range = self
            .capabilities
            .as_ref()
            .map(|c| c.exposure)
            .unwrap_or_default();
        let applied = ev.clamp(range.min, range.max);
        with_configuration_lock(self.driver.as_mut(), |d| d.set_exposure_bias(applied))?;
        self.mirror.update(|s| s.exposure_offset = applied);
        Ok(applied)
    }

    // ---- switching ----

    fn switch_camera(&mut self) -> Result<LensDirection, CameraError> {
        let current = self.ensure_running()?.lens_direction;
        let prefer_physical = self.mirror.snapshot().anti_macro_enabled;
        let target = self
            .catalog
            .select(&DeviceSelector::direction(current.opposite()), prefer_physical)?;
        self.switch_device(target)
    }

    fn switch_to_camera(&mut self, device_id: &str) -> Result<LensDirection, CameraError> {
        self.ensure_running()?;
        let target = self.catalog.find(device_id)?;
        self.switch_device(target)
    }

    fn switch_device(&mut self, target: CameraDevice) -> Result<LensDirection, CameraError> {
        let current = self.ensure_running()?.clone();
        let snapshot = self.mirror.snapshot();
        if snapshot.recording {
            return Err(CameraError::Busy("cannot switch cameras while recording".into()));
        }
        if current == target {
            return Ok(current.lens_direction);
        }

        self.set_phase(SessionPhase::Reconfiguring);
        let anti_macro = snapshot.anti_macro_enabled;
        if anti_macro {
            if let Err(e) = policy::disable(self.driver.as_mut(), &current) {
                log::warn!("Failed to release switching restriction on {}: {}", current.id, e);
            }
        }
        if snapshot.torch_on {
            if let Err(e) = with_configuration_lock(self.driver.as_mut(), |d| d.set_torch(None)) {
                log::warn!("Failed to turn torch off before switching: {}", e);
            }
        }

        if let Err(e) = self.swap_input(&current, &target) {
            if anti_macro && !self.apply_policy(&current) {
                self.mirror.update(|s| s.anti_macro_enabled = false);
            }
            if snapshot.torch_on {
                self.mirror.update(|s| {
                    s.torch_on = false;
                    s.torch_level = 0.0;
                    s.flash_mode = FlashMode::Off;
                });
            }
            self.set_phase(SessionPhase::Running);
            return Err(e.into_construction_error());
        }

        let caps = capability::resolve(
            &target,
            self.driver.zoom_report(),
            self.driver.exposure_bias_report(),
        );
        let anti_macro = anti_macro && self.apply_policy(&target);
        let direction = target.lens_direction;
        let has_flash = target.has_flash;
        log::info!("Switched camera {} -> {}", current.id, target.id);

        let published = target.clone();
        self.device = Some(target);
        self.capabilities = Some(caps.clone());
        self.set_phase(SessionPhase::Running);
        self.mirror.update(|s| {
            s.active_device = Some(published);
            s.lens_direction = Some(direction);
            s.zoom = caps.zoom;
            s.exposure_offset = 0.0;
            s.exposure_offset_range = caps.exposure;
            s.aspect_ratio = caps.primary_aspect_ratio();
            s.torch_on = false;
            s.torch_level = 0.0;
            if s.flash_mode == FlashMode::Torch || !has_flash {
                s.flash_mode = FlashMode::Off;
            }
            s.anti_macro_enabled = anti_macro;
        });
        Ok(direction)
    }

    /// Replace the bound input inside one configuration transaction. On
    /// failure the previous input is rebound.
    fn swap_input(&mut self, current: &CameraDevice, target: &CameraDevice) -> Result<(), CameraError> {
        self.driver.begin_configuration();
        self.driver.unbind_input();
        let result = match self.driver.bind_input(&target.id) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Failed to bind {}: {}", target.id, e);
                if let Err(restore) = self.driver.bind_input(&current.id) {
                    log::error!("Failed to restore input {}: {}", current.id, restore);
                }
                Err(e)
            }
        };
        self.driver.commit_configuration();
        result
    }

    // ---- capture and recording ----

    fn take_picture(&mut self, reply: Reply<PathBuf>) {
        if let Err(e) = self.ensure_running() {
            let _ = reply.send(Err(e));
            return;
        }
        let snapshot = self.mirror.snapshot();
        if snapshot.capturing {
            let _ = reply.send(Err(CameraError::Busy(
                "a picture is already being captured".into(),
            )));
            return;
        }

        let release = BusyRelease::acquire(&self.mirror, BusyFlag::Capturing);
        let flash = match snapshot.flash_mode {
            FlashMode::Torch => FlashMode::Off,
            mode => mode,
        };
        let pending = self.driver.capture_photo(flash);
        self.track(pending, Completion::Picture);
        self.in_flight = Some(InFlight::Picture { reply, release });
    }

    fn start_recording(&mut self, reply: Reply<()>) {
        if let Err(e) = self.ensure_running() {
            let _ = reply.send(Err(e));
            return;
        }
        if self.mirror.snapshot().recording {
            let _ = reply.send(Err(CameraError::Busy("recording already in progress".into())));
            return;
        }

        let path = self.namer.next_video();
        log::info!("Starting recording to {}", path.display());
        let pending = self.driver.start_recording(&path);
        self.track(pending, Completion::RecordingStarted);
        self.in_flight = Some(InFlight::StartRecording {
            reply,
            path,
            interrupted: None,
        });
    }

    fn stop_recording(&mut self, reply: Reply<PathBuf>) {
        if let Err(e) = self.ensure_running() {
            let _ = reply.send(Err(e));
            return;
        }
        if !self.mirror.snapshot().recording {
            let _ = reply.send(Err(CameraError::NotRecording));
            return;
        }

        let release = BusyRelease::adopt(&self.mirror, BusyFlag::Recording);
        let pending = self.driver.stop_recording();
        self.track(pending, Completion::RecordingStopped);
        self.in_flight = Some(InFlight::StopRecording { reply, release });
    }

    async fn resolve(&mut self, done: Completion) {
        match (self.in_flight.take(), done) {
            (Some(InFlight::Picture { reply, release }), Completion::Picture(result)) => {
                let outcome = self.finish_picture(result).await;
                drop(release);
                match &outcome {
                    Ok(path) => self.mirror.emit(CameraEvent::PictureTaken { path: path.clone() }),
                    Err(e) => self.report(e),
                }
                let _ = reply.send(outcome);
            }
            (
                Some(InFlight::StartRecording {
                    reply,
                    path,
                    interrupted,
                }),
                Completion::RecordingStarted(result),
            ) => {
                let result = match (result, interrupted) {
                    (Ok(()), Some(error)) => {
                        log::warn!("Recording to {} died before it was confirmed", path.display());
                        Err(error)
                    }
                    (result, _) => result,
                };
                match result {
                    Ok(()) => {
                        self.recording_path = Some(path);
                        self.mirror.update(|s| s.recording = true);
                        self.mirror.emit(CameraEvent::RecordingStarted);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        self.report(&e);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            (Some(InFlight::StopRecording { reply, release }), Completion::RecordingStopped(result)) => {
                drop(release);
                self.recording_path = None;
                match result {
                    Ok(path) => {
                        log::info!("Recording finished: {}", path.display());
                        self.mirror.emit(CameraEvent::RecordingStopped { path: path.clone() });
                        let _ = reply.send(Ok(path));
                    }
                    Err(e) => {
                        self.report(&e);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            (pending, _) => {
                log::warn!("Discarding hardware callback that matches no pending request");
                self.in_flight = pending;
            }
        }
    }

    fn finish_picture(
        &self,
        result: Result<Option<crate::platform::PhotoData>, CameraError>,
    ) -> impl std::future::Future<Output = Result<PathBuf, CameraError>> + Send + 'static {
        let prepared = photo_payload(result)
            .map(|data| (data, self.namer.next_photo(), self.config.storage.jpeg_quality));
        async move {
            let (data, path, quality) = prepared?;
            tokio::task::spawn_blocking(move || write_photo(data, &path, quality).map(|_| path))
                .await
                .map_err(|e| CameraError::CaptureError(format!("Photo writer task failed: {}", e)))?
        }
    }

    fn on_notice(&mut self, notice: DriverNotice) {
        let snapshot = self.mirror.snapshot();
        if let Some(message) = policy::detection_message(&snapshot, &notice) {
            log::warn!("{}", message);
            self.mirror.update(|s| s.macro_detected = true);
            self.mirror.emit(CameraEvent::MacroDetected { message });
            return;
        }

        match notice {
            DriverNotice::RecordingInterrupted { error } => {
                if let Some(InFlight::StartRecording { interrupted, .. }) = self.in_flight.as_mut() {
                    log::debug!("Recording interrupted before its start was confirmed: {}", error);
                    *interrupted = Some(error);
                    return;
                }
                let stop_pending = matches!(self.in_flight, Some(InFlight::StopRecording { .. }));
                if !snapshot.recording || stop_pending {
                    log::debug!("Ignoring recording interruption: {}", error);
                    return;
                }
                drop(BusyRelease::adopt(&self.mirror, BusyFlag::Recording));
                if let Some(path) = self.recording_path.take() {
                    log::warn!("Recording to {} was interrupted", path.display());
                }
                self.report(&error);
            }
            DriverNotice::ConstituentSwitch { device_id, to, .. } => {
                log::debug!("Constituent switch on {} to {} ignored", device_id, to);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PointKind {
    Focus,
    Exposure,
}

impl PointKind {
    fn as_str(&self) -> &'static str {
        match self {
            PointKind::Focus => "focus",
            PointKind::Exposure => "exposure",
        }
    }
}
