//! Application settings management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::{Codec, Container, VideoSettings};
use crate::library::{AccessLevel, AuthorizationPolicy};
use crate::session::AutostopConfig;
use crate::{ScenecastError, APP_NAME};

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// Recording settings
    #[serde(default)]
    pub recording: RecordingSettings,

    /// Media library settings
    #[serde(default)]
    pub library: LibrarySettings,

    /// Elapsed-time readout settings
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Data directory for the media library
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    /// Stop automatically after this many seconds (0 = run until stopped)
    #[serde(default = "default_autostop_secs")]
    pub autostop_secs: u64,

    /// Target frames per second of the frame clock
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Video container handed to the recorder
    #[serde(default)]
    pub container: Container,

    /// Video codec handed to the recorder
    #[serde(default)]
    pub codec: Codec,

    /// Where in-progress recordings are written before they reach the library
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Access level requested from the library (add-only, read-write)
    #[serde(default)]
    pub access_level: AccessLevel,

    /// How an undetermined permission is resolved (prompt, grant, limit, deny)
    #[serde(default)]
    pub on_request: AuthorizationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Show the live elapsed-time readout while recording
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Render the readout in red
    #[serde(default = "default_true")]
    pub color: bool,
}

// Default value functions

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", APP_NAME, APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.local/share/scenecast"))
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("scenecast")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_autostop_secs() -> u64 {
    60
}

fn default_frame_rate() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            autostop_secs: default_autostop_secs(),
            frame_rate: default_frame_rate(),
            container: Container::default(),
            codec: Codec::default(),
            temp_dir: default_temp_dir(),
        }
    }
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            access_level: AccessLevel::default(),
            on_request: AuthorizationPolicy::default(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            color: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            recording: RecordingSettings::default(),
            library: LibrarySettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file.
    ///
    /// Values are not validated here so that `config` can still repair a
    /// broken file; call [`Settings::validate`] before recording.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::debug!("No config file found, using defaults");
            let mut settings = Self::default();
            settings.apply_env_overrides();
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("SCENECAST_AUTOSTOP_SECS") {
            match value.trim().parse::<u64>() {
                Ok(secs) => self.recording.autostop_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid SCENECAST_AUTOSTOP_SECS={:?}", value),
            }
        }

        if let Ok(value) = std::env::var("SCENECAST_LIBRARY_ON_REQUEST") {
            match value.trim().parse::<AuthorizationPolicy>() {
                Ok(policy) => self.library.on_request = policy,
                Err(e) => tracing::warn!("Ignoring SCENECAST_LIBRARY_ON_REQUEST: {}", e),
            }
        }
    }

    /// Reject settings the recorder cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.recording.frame_rate == 0 {
            return Err(ScenecastError::Config(
                "recording.frame_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", APP_NAME, APP_NAME)
            .context("Could not determine config directory")?;

        let config_dir = dirs.config_dir();
        Ok(config_dir.join("config.toml"))
    }

    /// Write default configuration to a file
    pub fn write_default(path: &PathBuf) -> Result<()> {
        let settings = Self::default();
        let content = toml::to_string_pretty(&settings)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the library database path
    pub fn database_path(&self) -> PathBuf {
        self.general.data_dir.join("library.db")
    }

    /// Get the directory holding persisted library assets
    pub fn library_dir(&self) -> PathBuf {
        self.general.data_dir.join("library")
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.general.data_dir)?;
        std::fs::create_dir_all(self.library_dir())?;
        std::fs::create_dir_all(&self.recording.temp_dir)?;
        Ok(())
    }

    /// Video settings passed opaquely to the recorder
    pub fn video_settings(&self) -> VideoSettings {
        VideoSettings {
            container: self.recording.container,
            codec: self.recording.codec,
            frame_rate: self.recording.frame_rate,
        }
    }

    /// Autostop limit for new sessions
    pub fn autostop(&self) -> AutostopConfig {
        AutostopConfig::new(self.recording.autostop_secs)
    }
}
