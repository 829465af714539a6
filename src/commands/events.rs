//! Forwarding of controller events and snapshots to the webview.

use crate::session::CameraController;
use tauri::{AppHandle, Emitter, Runtime};

pub const EVENT_CHANNEL: &str = "crablens://event";
pub const STATE_CHANNEL: &str = "crablens://state";

/// Keep the webview attached to whichever controller is currently shared,
/// following replacements and restarts after `dispose`.
pub async fn bridge_webview<R: Runtime>(app: AppHandle<R>) {
    let mut changes = super::controller_changes();
    loop {
        changes.borrow_and_update();
        let controller = super::controller().await;
        tokio::select! {
            _ = forward_to_webview(app.clone(), controller) => {
                // Retired; wait until a new controller is created.
                if changes.changed().await.is_err() {
                    break;
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                log::debug!("Shared controller replaced, re-attaching webview");
            }
        }
    }
}

/// Pump events and state snapshots to the webview until the controller goes
/// away.
pub async fn forward_to_webview<R: Runtime>(app: AppHandle<R>, controller: CameraController) {
    let mut events = controller.subscribe();
    let mut states = controller.watch_state();
    drop(controller);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = app.emit(EVENT_CHANNEL, &event) {
                        log::warn!("Failed to forward camera event: {}", e);
                    }
                }
                None => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = states.borrow_and_update().clone();
                if let Err(e) = app.emit(STATE_CHANNEL, &*snapshot) {
                    log::warn!("Failed to forward camera state: {}", e);
                }
            }
        }
    }
    log::debug!("Webview bridge stopped");
}
