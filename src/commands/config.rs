use super::CommandError;
use crate::config::CrabLensConfig;
use tauri::command;
use tokio::sync::RwLock;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<CrabLensConfig> = RwLock::new(CrabLensConfig::load_or_default());
}

pub(crate) async fn current_config() -> CrabLensConfig {
    GLOBAL_CONFIG.read().await.clone()
}

/// Get the current configuration
#[command]
pub async fn get_config() -> Result<CrabLensConfig, CommandError> {
    Ok(current_config().await)
}

/// Validate, persist and adopt a new configuration. Session defaults apply
/// to the next `initialize`; storage settings apply to controllers created
/// afterwards.
#[command]
pub async fn update_config(new_config: CrabLensConfig) -> Result<(), CommandError> {
    new_config.validate().map_err(|message| CommandError {
        code: "configError".to_string(),
        message,
    })?;
    new_config.save_to_file(CrabLensConfig::default_path())?;
    *GLOBAL_CONFIG.write().await = new_config;
    Ok(())
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config() -> Result<CrabLensConfig, CommandError> {
    let defaults = CrabLensConfig::default();
    defaults.save_to_file(CrabLensConfig::default_path())?;
    *GLOBAL_CONFIG.write().await = defaults.clone();
    Ok(defaults)
}
