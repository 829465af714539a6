//! CrabLens: a camera session controller for Tauri applications
//!
//! One controller owns one capture session. Every hardware mutation is
//! serialized through a single actor, state is published as immutable
//! snapshots, and discrete events fan out to any number of subscribers.
//!
//! # Features
//! - Device enumeration and selection by id or lens direction
//! - Anti-macro policy: keeps multi-lens modules from silently swapping to
//!   the macro-capable lens
//! - Zoom, focus/exposure point, exposure compensation, flash and torch
//! - Photo capture and movie recording with busy-state tracking
//! - Scriptable mock hardware for tests
//!
//! # Usage
//! ```toml
//! [dependencies]
//! crablens = { version = "0.1", features = ["recording"] }
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(crablens::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! Or drive a controller directly:
//! ```rust,ignore
//! use crablens::{CameraController, CrabLensConfig, DeviceSelector, InitializeParams, LensDirection};
//!
//! let controller = CameraController::native(CrabLensConfig::default());
//! controller
//!     .initialize(InitializeParams::new(DeviceSelector::direction(LensDirection::Back)))
//!     .await?;
//! let photo = controller.take_picture().await?;
//! ```
pub mod capability;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod errors;
pub mod invariant_ppt;
pub mod mirror;
pub mod permissions;
pub mod platform;
pub mod policy;
pub mod session;
pub mod types;

#[cfg(feature = "recording")]
pub mod recording;

// Simulated hardware for tests and demos
pub mod testing;

pub use catalog::DeviceCatalog;
pub use config::CrabLensConfig;
pub use errors::CameraError;
pub use mirror::EventStream;
pub use session::{CameraController, SessionPhase};
pub use types::{
    AspectRatio, CameraDevice, CameraEvent, CameraState, DeviceKind, DeviceSelector,
    ExposureRange, FlashMode, InitializeParams, LensDirection, ResolutionPreset, ZoomRange,
};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the CrabLens plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("crablens")
        .invoke_handler(tauri::generate_handler![
            // Devices
            commands::session::enumerate_devices,
            commands::session::check_camera_permission,
            // Lifecycle
            commands::session::initialize,
            commands::session::dispose,
            commands::session::get_camera_state,
            // Configuration
            commands::session::set_anti_macro_enabled,
            commands::session::set_flash_mode,
            commands::session::set_torch_mode,
            commands::session::set_zoom_level,
            commands::session::get_zoom_range,
            commands::session::get_exposure_offset_range,
            commands::session::set_focus_point,
            commands::session::set_exposure_point,
            commands::session::set_exposure_compensation,
            // Switching
            commands::session::switch_camera,
            commands::session::switch_to_camera,
            // Capture
            commands::session::take_picture,
            commands::session::start_video_recording,
            commands::session::stop_video_recording,
            // Settings
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
        ])
        .setup(|app, _api| {
            let handle = app.clone();
            tauri::async_runtime::spawn(commands::bridge_webview(handle));
            Ok(())
        })
        .build()
}

/// Initialize logging for the camera system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crablens=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        recording: cfg!(feature = "recording"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Whether movie recording was compiled in
    pub recording: bool,
}
