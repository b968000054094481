//! Configuration module for powerosd-rs
//!
//! Every tunable of the pipeline is a plain serde value with a default, so
//! an empty or partial config file is always valid.
//!
//! # Config Location
//!
//! Without an explicit path the config is read from the platform config
//! directory:
//! - **Linux**: `~/.config/dev.powerosd/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.powerosd/config.toml`
//! - **Windows**: `%APPDATA%\dev.powerosd\config.toml`
//!
//! # Example
//!
//! ```toml
//! [history]
//! capacity = 500
//!
//! [normalizer]
//! min_current = 0.005
//! gap_policy = "suppress_all"
//!
//! [serial]
//! baud_rates = [9600]
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{PowerOsdError, Result};
use crate::protocol::{DetectionSettings, DeviceProfile, ProtocolConstants};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.powerosd";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Serial bring-up settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rates tried in order until a protocol variant is detected
    pub baud_rates: Vec<u32>,
    pub detection: DetectionSettings,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rates: vec![9600, 115_200],
            detection: DetectionSettings::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub history: HistorySettings,
    pub energy: EnergySettings,
    pub normalizer: NormalizerSettings,
    pub serial: SerialConfig,
    /// Scaling quanta for the serial variants
    pub protocol: ProtocolConstants,
    /// Identifiers of supported meters
    pub device: DeviceProfile,
}

impl AppConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PowerOsdError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            PowerOsdError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, or the default location when `path` is `None`.
    ///
    /// A missing default file is not an error. Any failure falls back to
    /// defaults with a warning.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Self::default(),
            },
        };

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PowerOsdError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PowerOsdError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PowerOsdError::Config(format!("Failed to write config: {}", e)))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.history.capacity == 0 {
            return Err(PowerOsdError::Config(
                "history.capacity must be greater than 0".to_string(),
            ));
        }
        if self.energy.max_gap_ms <= 0 {
            return Err(PowerOsdError::Config(
                "energy.max_gap_ms must be positive".to_string(),
            ));
        }
        if self.serial.baud_rates.is_empty() {
            return Err(PowerOsdError::Config(
                "serial.baud_rates must not be empty".to_string(),
            ));
        }
        for quanta in [&self.protocol.range_28v, &self.protocol.range_20v] {
            let fields = [
                quanta.voltage_quantum,
                quanta.current_quantum,
                quanta.bus_divisor,
            ];
            if !fields.iter().all(|q| q.is_finite() && *q > 0.0) {
                return Err(PowerOsdError::Config(
                    "protocol quanta and bus_divisor must be finite and positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Default config file path, if the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}
