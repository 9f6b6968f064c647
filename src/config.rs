//! Configuration management for lenscam
//!
//! Provides loading, saving and layering of camera session defaults and zoom
//! policy settings.

use crate::errors::CameraError;
use crate::types::{CameraPosition, SessionPreset};
use crate::zoom::{ZoomPolicy, CANONICAL_STOPS, STOP_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of environment variables read by [`LensCamConfig::load_layered`].
pub const ENV_PREFIX: &str = "LENSCAM";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LensCamConfig {
    pub camera: CameraConfig,
    pub zoom: ZoomConfig,
}

/// Session defaults applied at setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera the session starts on
    pub default_position: CameraPosition,
    /// Session preset applied during setup
    pub resolution: SessionPreset,
    /// Frames per second
    pub frame_rate: u32,
    /// Logical zoom forced when the session starts
    pub initial_zoom: f64,
    /// Attach a microphone input and require microphone permission
    pub audio_enabled: bool,
    pub mirror_output: bool,
    pub grid_visible: bool,
}

/// Zoom factor computation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Logical stops offered when the device can reach them
    pub canonical_stops: Vec<f64>,
    /// Stops closer than this are merged
    pub tolerance: f64,
    /// Prefer a device-reported active lens over the ultra-wide reading heuristic
    pub prefer_active_lens_signal: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_position: CameraPosition::Back,
            resolution: SessionPreset::Hd1920x1080,
            frame_rate: 30,
            initial_zoom: 1.0,
            audio_enabled: false,
            mirror_output: false,
            grid_visible: true,
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            canonical_stops: CANONICAL_STOPS.to_vec(),
            tolerance: STOP_TOLERANCE,
            prefer_active_lens_signal: true,
        }
    }
}

impl ZoomConfig {
    pub fn policy(&self) -> ZoomPolicy {
        ZoomPolicy {
            canonical_stops: self.canonical_stops.clone(),
            tolerance: self.tolerance,
            prefer_active_lens_signal: self.prefer_active_lens_signal,
        }
    }
}

impl LensCamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;

        let config: LensCamConfig = toml::from_str(&contents).map_err(|e| {
            CameraError::InvalidConfig(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load defaults, then the TOML file if present, then `LENSCAM_*` environment overrides.
    ///
    /// Nested keys use a double underscore: `LENSCAM_CAMERA__FRAME_RATE=60`.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let layered_err =
            |e: config::ConfigError| CameraError::InvalidConfig(format!("Failed to layer config: {}", e));

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(layered_err)?)
            .add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(layered_err)?;

        let config: LensCamConfig = settings.try_deserialize().map_err(layered_err)?;
        log::debug!("Layered configuration: {:?}", config);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::InvalidConfig(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CameraError::InvalidConfig(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CameraError::InvalidConfig(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("lenscam.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.frame_rate == 0 || self.camera.frame_rate > 240 {
            return Err("Invalid frame rate (must be 1-240)".to_string());
        }
        if !(self.camera.initial_zoom.is_finite() && self.camera.initial_zoom > 0.0) {
            return Err("Initial zoom must be a positive number".to_string());
        }

        let stops = &self.zoom.canonical_stops;
        if stops.is_empty() {
            return Err("At least one canonical zoom stop is required".to_string());
        }
        if stops.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err("Canonical zoom stops must be positive numbers".to_string());
        }
        if stops.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("Canonical zoom stops must be strictly ascending".to_string());
        }
        if !stops.iter().any(|s| (s - 1.0).abs() < f64::EPSILON) {
            return Err("Canonical zoom stops must include 1.0".to_string());
        }
        if !(0.0..1.0).contains(&self.zoom.tolerance) {
            return Err("Zoom tolerance must be in [0.0, 1.0)".to_string());
        }

        Ok(())
    }
}
