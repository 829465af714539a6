//! Configuration management for CrabLens
//!
//! Defaults for session initialization, where capture files go and how they
//! are named, and hardware quirk settings. Loaded from TOML.

use crate::errors::CameraError;
use crate::types::ResolutionPreset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrabLensConfig {
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub torch: TorchConfig,
}

/// Defaults applied when a command omits a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Resolution preset used when none is requested
    pub default_preset: ResolutionPreset,
    /// Enable the anti-macro policy by default
    pub anti_macro: bool,
    /// Attach the microphone to the movie output
    pub enable_audio: bool,
    /// Start with auto flash instead of off
    pub auto_flash: bool,
}

/// Capture file placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Scratch directory for photos and videos; the system temp dir when empty
    pub output_directory: String,
    pub photo_prefix: String,
    pub video_prefix: String,
    /// JPEG quality (1-100) used when the hardware hands back raw pixels
    pub jpeg_quality: u8,
}

/// Torch driver quirks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorchConfig {
    /// Lowest level sent to the torch while it is on. Some drivers reject 0.
    pub min_level: f64,
}

impl Default for CrabLensConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                default_preset: ResolutionPreset::High,
                anti_macro: true,
                enable_audio: false,
                auto_flash: false,
            },
            storage: StorageConfig {
                output_directory: String::new(),
                photo_prefix: "CAP".to_string(),
                video_prefix: "REC".to_string(),
                jpeg_quality: 92,
            },
            torch: TorchConfig { min_level: 0.01 },
        }
    }
}

impl StorageConfig {
    pub fn output_dir(&self) -> PathBuf {
        if self.output_directory.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.output_directory)
        }
    }
}

impl CrabLensConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: CrabLensConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CameraError::ConfigError)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("crablens.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage.jpeg_quality == 0 || self.storage.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.storage.photo_prefix.is_empty() || self.storage.video_prefix.is_empty() {
            return Err("File prefixes must not be empty".to_string());
        }
        if self
            .storage
            .photo_prefix
            .chars()
            .chain(self.storage.video_prefix.chars())
            .any(std::path::is_separator)
        {
            return Err("File prefixes must not contain path separators".to_string());
        }
        if !(self.torch.min_level > 0.0 && self.torch.min_level <= 1.0) {
            return Err("Torch minimum level must be in (0.0, 1.0]".to_string());
        }
        Ok(())
    }

    /// Replace out-of-range values with their defaults so a session can run
    /// on a config that never went through `validate`.
    pub fn sanitized(mut self) -> Self {
        if let Err(message) = self.validate() {
            log::warn!("Repairing camera configuration: {}", message);
        }
        let defaults = Self::default();
        self.storage.jpeg_quality = self.storage.jpeg_quality.clamp(1, 100);
        let bad_prefix = |p: &str| p.is_empty() || p.chars().any(std::path::is_separator);
        if bad_prefix(&self.storage.photo_prefix) {
            self.storage.photo_prefix = defaults.storage.photo_prefix;
        }
        if bad_prefix(&self.storage.video_prefix) {
            self.storage.video_prefix = defaults.storage.video_prefix;
        }
        if !(self.torch.min_level > 0.0 && self.torch.min_level <= 1.0) {
            self.torch.min_level = defaults.torch.min_level;
        }
        self
    }
}
