//! Tauri command surface.
//!
//! One process-wide controller backs every command. It is created on first
//! use over the native backend unless the host installs its own first. The
//! `dispose` command retires it, and the next command starts a fresh one.

pub mod config;
pub mod events;
pub mod session;

pub use config::*;
pub use events::*;
pub use session::*;

use crate::config::CrabLensConfig;
use crate::errors::CameraError;
use crate::session::CameraController;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Builds the shared controller from the current configuration.
pub type ControllerFactory = Arc<dyn Fn(CrabLensConfig) -> CameraController + Send + Sync>;

lazy_static::lazy_static! {
    static ref CONTROLLER: RwLock<Option<CameraController>> = RwLock::new(None);
    static ref FACTORY: RwLock<Option<ControllerFactory>> = RwLock::new(None);
    static ref GENERATION: watch::Sender<u64> = watch::channel(0).0;
}

/// Error shape returned to the webview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
}

impl From<CameraError> for CommandError {
    fn from(error: CameraError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// The shared controller, spawning one if needed.
pub async fn controller() -> CameraController {
    if let Some(existing) = CONTROLLER.read().await.as_ref() {
        return existing.clone();
    }

    let mut slot = CONTROLLER.write().await;
    if let Some(existing) = slot.as_ref() {
        return existing.clone();
    }
    let config = config::current_config().await;
    let created = match FACTORY.read().await.as_ref() {
        Some(factory) => factory(config),
        None => {
            log::info!("Starting native camera controller");
            CameraController::native(config)
        }
    };
    *slot = Some(created.clone());
    GENERATION.send_modify(|g| *g += 1);
    created
}

/// Replace the shared controller, e.g. with one over custom hardware. The
/// previous controller is returned so the caller can dispose it.
pub async fn install_controller(controller: CameraController) -> Option<CameraController> {
    let previous = CONTROLLER.write().await.replace(controller);
    GENERATION.send_modify(|g| *g += 1);
    previous
}

/// Use `factory` instead of the native backend whenever a new shared
/// controller is needed.
pub async fn install_controller_factory(factory: ControllerFactory) {
    *FACTORY.write().await = Some(factory);
}

/// Dispose the shared controller and clear the slot.
pub(crate) async fn retire_controller() -> Result<(), CameraError> {
    let current = CONTROLLER.read().await.clone();
    let Some(current) = current else {
        return Ok(());
    };
    current.dispose().await?;

    let mut slot = CONTROLLER.write().await;
    // A controller installed meanwhile stays.
    if slot.as_ref().is_some_and(|c| c.same_session(&current)) {
        slot.take();
    }
    Ok(())
}

/// Ticks whenever a different shared controller takes over.
pub(crate) fn controller_changes() -> watch::Receiver<u64> {
    GENERATION.subscribe()
}
